//! Loopback-only guard for the control endpoints.
//!
//! Runs as route middleware, so it fires before any body extraction: a
//! remote caller gets 403 whether or not its payload would have parsed.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

/// 127.0.0.0/8, ::1, and IPv4-mapped loopback (dual-stack listeners).
pub fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    }
}

pub async fn require_loopback(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if !is_loopback(peer.ip()) {
        warn!(peer = %peer, path = %req.uri().path(), "refused non-loopback caller");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(req).await
}
