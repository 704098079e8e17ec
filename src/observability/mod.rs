//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Fields, not formatted strings, in every log event
//! - Request ID flows to upstreams with the other inbound headers
//! - Metric calls are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
