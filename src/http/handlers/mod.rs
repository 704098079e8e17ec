//! Route handlers. Each one extracts what it needs, delegates to the
//! [`Aggregator`](crate::aggregate::Aggregator) snapshot current at request
//! time, and maps the outcome to a response.

pub mod health;
pub mod passthrough;
pub mod unified;
