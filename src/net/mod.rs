//! Network layer subsystem.
//!
//! Plain TCP listeners are bound in `main` and handed straight to Axum.
//! TLS is optional; when configured, tls.rs loads the PEM material and
//! axum-server terminates the handshake.

pub mod tls;

pub use tls::load_tls_config;
