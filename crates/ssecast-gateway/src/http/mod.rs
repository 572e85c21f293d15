//! Control surface. Everything here except the subscriber stream sits behind
//! the loopback guard in [`origin`].

pub mod clients;
pub mod exit;
pub mod origin;
pub mod publish;
