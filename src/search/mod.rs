//! Full-text search over the pages of a book.
//!
//! This module provides the normalization pipeline, the prefix-tree index with
//! per-field term frequencies, scoring primitives and the query engine.

// Module declarations
pub mod index;
pub mod query;
pub mod scoring;
pub mod snapshot;
pub mod teaser;
pub mod tokenize;
pub mod trie;

// Public re-exports (used via lib.rs)
pub use index::{Document, DocumentStore, IndexBuilder, RawDocument, SearchIndex, StoredDocument};
pub use query::{SearchHit, Searcher};
pub use snapshot::SearchHandle;
pub use teaser::make_teaser;
pub use tokenize::{Language, Pipeline, PipelineSpec, PipelineStage, Tokens};
pub use trie::{NodeId, Trie, TrieNode};
