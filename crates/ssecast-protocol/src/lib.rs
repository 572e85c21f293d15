//! Wire model of the relay: broadcast events, their `text/event-stream`
//! framing, and the publish request / acknowledgment bodies.

pub mod frames;
pub mod publish;
pub mod routes;

pub use frames::{BroadcastEvent, Payload};
pub use publish::{PublishAck, PublishRequest};
