//! Error handling types and utilities.

use thiserror::Error;

/// A specialized Result type for file-level operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods on path-based helpers.
pub type Result<T> = anyhow::Result<T>;

/// Error returned when a document set cannot be turned into an index.
///
/// The builder is consumed by a failed build, so no partial index survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// A required document field was absent (or the identifier was empty).
    #[error("document #{position} is missing required field '{field}'")]
    MissingField { position: usize, field: &'static str },
    /// Two documents share an identifier.
    #[error("duplicate document identifier '{id}'")]
    DuplicateId { id: String },
}

/// Error returned when a search configuration is structurally invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("result limit must be positive, got {0}")]
    NonPositiveLimit(i64),
    #[error("unknown boolean mode '{0}' (expected AND or OR)")]
    UnknownBoolMode(String),
    #[error("unknown field '{0}' (expected title, body or breadcrumbs)")]
    UnknownField(String),
    #[error("boost for field '{field}' must be a finite non-negative number, got {boost}")]
    InvalidBoost { field: String, boost: f64 },
    #[error("teaser word count must not be negative, got {0}")]
    NegativeTeaserLength(i64),
    #[error("expansion penalty must lie in [0, 1], got {0}")]
    InvalidExpansionPenalty(f64),
    #[error("failed to parse search configuration: {0}")]
    Parse(String),
}

/// Error returned when a persisted index cannot be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not a booksearch index (bad magic bytes)")]
    BadMagic,
    #[error("index checksum mismatch: expected {expected:016x}, found {found:016x}")]
    ChecksumMismatch { expected: u64, found: u64 },
    #[error("failed to decode index payload: {0}")]
    Decode(#[from] postcard::Error),
    #[error("failed to parse elasticlunr index: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed elasticlunr index: {0}")]
    Malformed(String),
    #[error("index invariant violated: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}
