//! resai-common: Shared types, errors and HTTP plumbing used across all ResearchAssist crates.

pub mod error;
pub mod http;
pub mod records;

pub use error::{ResaiError, Result};
pub use http::PoliteClient;
pub use records::{CanonicalRecord, CanonicalTable, FieldValue, CANONICAL_FIELDS};

/// Placeholder stored wherever a source omitted a value.
pub const UNAVAILABLE: &str = "N/A";
