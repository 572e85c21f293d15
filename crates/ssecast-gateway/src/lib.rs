//! ssecast gateway: an HTTPS publish/broadcast relay for Server-Sent Events.
//!
//! Subscribers hold `GET /sse` open; loopback publishers `POST /bcast`;
//! every event is fanned out to all open streams. See [`server::start`].

pub mod app;
pub mod http;
pub mod server;
pub mod shutdown;
pub mod sse;
pub mod tls;
