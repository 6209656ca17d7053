//! Shared handle for swapping in rebuilt indexes without disturbing readers.
//!
//! Readers take an `Arc<Searcher>` snapshot and query it lock-free. A writer
//! builds a complete replacement off to the side and installs it in one step,
//! so a reader observes either the previous index or the new one.

use super::query::{SearchHit, Searcher};
use std::sync::{Arc, PoisonError, RwLock};

/// Copy-on-write holder of the current [`Searcher`].
#[derive(Debug)]
pub struct SearchHandle {
    current: RwLock<Arc<Searcher>>,
}

impl SearchHandle {
    pub fn new(searcher: Searcher) -> Self {
        Self {
            current: RwLock::new(Arc::new(searcher)),
        }
    }

    /// The searcher in effect right now.
    pub fn snapshot(&self) -> Arc<Searcher> {
        // A poisoned lock still holds a complete Arc
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install a fully built replacement and return the previous searcher.
    pub fn replace(&self, searcher: Searcher) -> Arc<Searcher> {
        let next = Arc::new(searcher);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, next);
        tracing::info!(
            "Replaced search index: {} -> {} documents",
            previous.index().document_count(),
            guard.index().document_count()
        );
        previous
    }

    /// Search the current snapshot.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.snapshot().search(query)
    }
}
