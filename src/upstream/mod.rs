//! Upstream call subsystem.
//!
//! # Data Flow
//! ```text
//! handler / aggregator
//!     → UpstreamCall per target (name, method, url, inbound headers, body)
//!     → fanout.rs (one task per call, join all)
//!         → client.rs (pooled hyper client, per-call deadline, full body read)
//!     → FanOutResults indexed by upstream name
//! ```
//!
//! # Design Decisions
//! - Transport failures are values, never early-exit signals
//! - No batch deadline beyond the slowest call's own timeout
//! - No retries anywhere in this layer

pub mod client;
pub mod fanout;
pub mod headers;

pub use client::{
    TransportError, Upstream, UpstreamCall, UpstreamClient, UpstreamResponse, UpstreamResult,
    DEFAULT_TIMEOUT,
};
pub use fanout::{fan_out, FanOutResults};
