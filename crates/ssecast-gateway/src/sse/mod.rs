//! Subscriber side of the relay.
//!
//! ```text
//!        Arc<SubscriberRegistry>
//!   ┌──────────────────────────────┐
//!   │ DashMap<SubscriberId,        │
//!   │   Subscriber { tx, peer }>   │
//!   └──────────────┬───────────────┘
//!                  │ snapshot()
//!   POST /bcast ──►│◄── keepalive tick
//!                  ▼
//!        EventBroadcaster::broadcast()
//!           encode once, try_send(Bytes) per subscriber
//!                  │
//!        ┌─────────┼─────────┐
//!        ▼         ▼         ▼
//!     GET /sse  GET /sse  GET /sse   (body stream drains its queue)
//! ```
//!
//! `Bytes` is reference counted, so every subscriber shares the frame
//! allocation produced by a single encode.

pub mod broadcast;
pub mod connection;
pub mod keepalive;
pub mod registry;

pub use broadcast::{EventBroadcaster, FanoutReport};
pub use registry::{Subscriber, SubscriberRegistry, Target};
