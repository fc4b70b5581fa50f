#![deny(missing_docs)]
//! Observation Envelope — §4.7.
//!
//! Every tool or sandbox result passes through [`observe`] before it enters
//! an [`planner_core::ExecutionStep`]'s history: secrets are redacted, then
//! the value is truncated/clipped/folded into a bounded preview, and if
//! that preview is still too large the full (redacted) value is moved into
//! [`RawOutputStore`] under a generated key for later retrieval.

mod envelope;
mod redact;
mod store;
mod trim;

pub use envelope::{observe, Envelope, ObservationSource, MAX_PREVIEW_BYTES};
pub use redact::redact;
pub use store::RawOutputStore;
pub use trim::{trim_value, MAX_ARRAY_ITEMS, MAX_OBJECT_DEPTH, MAX_STRING_CHARS};
