//! Prebuilt full-text search for documentation books.
//!
//! A book's pages are normalized into a prefix tree of per-field term
//! frequencies at build time, persisted next to the rendered site, and queried
//! with field boosts, prefix expansion and AND/OR combination.

pub mod config;
pub mod error;
pub mod persist;
pub mod search;
pub mod tracing;
pub mod types;

pub use config::{BoolMode, ScoringOptions, SearchConfig};
pub use error::{ConfigError, ConstructionError, LoadError, Result};
pub use persist::{Format, IndexBundle};
pub use search::{
    Document, IndexBuilder, Language, Pipeline, RawDocument, SearchHandle, SearchHit, SearchIndex,
    Searcher,
};
pub use types::{DocRef, Field};
