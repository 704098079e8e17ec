//! Response aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! unified read:
//!     orchestrator.rs → upstream::fan_out(auth, profile)
//!         → merge.rs (profile fields onto auth's user object)
//!
//! unified update:
//!     orchestrator.rs → fields.rs (allow-lists, name translation)
//!         → upstream::fan_out(only non-empty parts)
//!         → failure collection → unified read
//!
//! account deletion:
//!     orchestrator.rs → auth DELETE → events.rs (detached publish)
//! ```
//!
//! # Design Decisions
//! - Auth is mandatory, profile is enrichment only
//! - Identity fields always come from auth; profile data is additive
//! - Update failures are aggregated, never rolled back

pub mod error;
pub mod events;
pub mod fields;
pub mod merge;
pub mod orchestrator;

pub use error::GatewayError;
pub use events::EventPublisher;
pub use fields::{partition, FieldPartition, ProfileField, AUTH_FIELDS, PROFILE_FIELDS};
pub use merge::{merge, ProfileEnrichment};
pub use orchestrator::{require_credential, Aggregator, UpstreamUrls};
