//! Startup reporting.
//!
//! Logs the effective configuration and the public route table once the
//! listener is bound, so operators can see where traffic will go.

use std::net::SocketAddr;

use crate::config::GatewayConfig;

/// Public routes, as `(method, path, upstream)`.
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/health", "-"),
    ("POST", "/api/v1/auth/login", "auth"),
    ("POST", "/api/v1/auth/register", "auth"),
    ("DELETE", "/api/v1/users/{username}", "auth, orchestrator"),
    ("GET", "/api/v1/users/{username}/profile", "auth, profile"),
    ("PATCH", "/api/v1/users/{username}/profile", "auth, profile"),
    ("PUT", "/api/v1/users/{username}/profile", "auth, profile"),
    ("GET", "/api/v1/profiles/me", "profile"),
    ("PUT", "/api/v1/profiles/me", "profile"),
    ("GET", "/api/v1/profiles/search", "profile"),
    ("GET", "/api/v1/profiles/stats/me", "profile"),
    ("GET", "/api/v1/profiles/{username}", "profile"),
];

pub fn log_startup(config: &GatewayConfig, addr: SocketAddr) {
    let scheme = if config.listener.tls.is_some() { "https" } else { "http" };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %addr,
        scheme,
        "user-gateway listening"
    );
    tracing::info!(
        auth = %config.upstreams.auth_url,
        profile = %config.upstreams.profile_url,
        orchestrator = %config.upstreams.orchestrator_url,
        upstream_timeout_secs = config.upstreams.timeout_secs,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Upstreams configured"
    );
    for (method, path, upstream) in ROUTES {
        tracing::debug!(method, path, upstream, "Route registered");
    }
}
