//! Shared configuration, identifiers and error taxonomy for the ssecast relay.

pub mod config;
pub mod error;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use types::SubscriberId;
