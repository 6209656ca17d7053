//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `book`: a small multi-page book built with the default pipeline
//! - `prologue_fixture`: the generated `searchindex.js` of a one-page Spanish book
//!
//! [`TempWorkspace`] provides a temp directory for tests that save and load
//! index files.

use booksearch::{Document, IndexBundle, SearchConfig, SearchIndex};
use rstest::fixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    project_root().join("tests").join("fixtures").join(name)
}

/// A temporary directory that is removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `relative` inside the workspace.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Copies a fixture into the workspace and returns its new path.
    pub fn copy_fixture(&self, name: &str) -> PathBuf {
        let dest = self.join(name);
        std::fs::copy(fixture_path(name), &dest)
            .unwrap_or_else(|e| panic!("Failed to copy fixture {name}: {e}"));
        dest
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Pages of a small English book.
#[allow(dead_code)]
pub fn book_pages() -> Vec<Document> {
    vec![
        Document::new(
            "0",
            "Introduction",
            "This book teaches the Rust programming language from first principles.",
            "Introduction",
        )
        .with_url("intro.html"),
        Document::new(
            "1",
            "Ownership",
            "Ownership is Rust's most unique feature. Every value has a single owner, \
             and the value is dropped when the owner goes out of scope.",
            "Understanding Ownership » What is Ownership?",
        )
        .with_url("ch04-01-what-is-ownership.html"),
        Document::new(
            "2",
            "References and Borrowing",
            "A reference lets you borrow a value without taking ownership of it. \
             Borrowing rules are checked by the borrow checker at compile time.",
            "Understanding Ownership » References and Borrowing",
        )
        .with_url("ch04-02-references-and-borrowing.html"),
        Document::new(
            "3",
            "Fearless Concurrency",
            "Threads share memory safely because ownership and type checking prevent data races.",
            "Fearless Concurrency",
        )
        .with_url("ch16-00-concurrency.html"),
    ]
}

#[allow(dead_code)]
#[fixture]
pub fn book() -> IndexBundle {
    booksearch::tracing::init();
    let index = SearchIndex::build(book_pages()).expect("book pages are valid");
    IndexBundle::new(index, SearchConfig::default())
}

#[allow(dead_code)]
#[fixture]
pub fn prologue_fixture() -> IndexBundle {
    booksearch::tracing::init();
    IndexBundle::load(&fixture_path("searchindex.js")).expect("fixture loads")
}
