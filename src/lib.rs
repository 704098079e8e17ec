//! User gateway library: one public entry point in front of the auth,
//! profile and orchestrator services.

pub mod aggregate;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod upstream;

pub use aggregate::Aggregator;
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
