//! Persisted build output: an index together with the search configuration
//! the book was generated with.
//!
//! Two encodings are supported. The binary format is compact and checksummed;
//! the elasticlunr format is what the book's search page loads, either as
//! plain JSON or as a script. Loading detects the encoding from the content.

pub mod binary;
pub mod elasticlunr;

use crate::config::SearchConfig;
use crate::error::{ConfigError, LoadError, Result};
use crate::search::index::SearchIndex;
use crate::search::query::Searcher;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk encoding of an [`IndexBundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Magic, checksum and postcard payload
    Binary,
    /// elasticlunr JSON
    Json,
    /// elasticlunr JSON assigned to `window.search`
    Js,
}

impl Format {
    /// Pick a format from a file extension, defaulting to binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            Some("js") => Self::Js,
            _ => Self::Binary,
        }
    }

    /// Sniff the format of persisted bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if binary::is_binary(bytes) {
            return Some(Self::Binary);
        }
        let text = std::str::from_utf8(bytes).ok()?;
        if !elasticlunr::is_elasticlunr(text) {
            return None;
        }
        if text.trim_start().starts_with('{') {
            Some(Self::Json)
        } else {
            Some(Self::Js)
        }
    }
}

/// A built index and the configuration it is queried with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBundle {
    pub index: SearchIndex,
    pub config: SearchConfig,
}

impl IndexBundle {
    pub const fn new(index: SearchIndex, config: SearchConfig) -> Self {
        Self { index, config }
    }

    /// Check index invariants and configuration validity.
    pub fn validate(&self) -> std::result::Result<(), LoadError> {
        self.index.validate().map_err(LoadError::Corrupt)?;
        self.config.validate()?;
        Ok(())
    }

    /// Encode in the given format.
    pub fn to_bytes(&self, format: Format) -> Result<Vec<u8>> {
        let bytes = match format {
            Format::Binary => binary::encode(self).context("Failed to encode binary index")?,
            Format::Json => elasticlunr::to_json(self)
                .context("Failed to encode elasticlunr index")?
                .into_bytes(),
            Format::Js => elasticlunr::to_js(self)
                .context("Failed to encode elasticlunr index")?
                .into_bytes(),
        };
        Ok(bytes)
    }

    /// Decode bytes in any supported format, detected from content.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, LoadError> {
        match Format::detect(bytes) {
            Some(Format::Binary) => binary::decode(bytes),
            Some(Format::Json | Format::Js) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| LoadError::Malformed(format!("index is not UTF-8: {e}")))?;
                elasticlunr::from_json(text)
            }
            None => Err(LoadError::BadMagic),
        }
    }

    /// Write to `path` in the given format.
    pub fn save(&self, path: &Path, format: Format) -> Result<()> {
        let bytes = self.to_bytes(format)?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write search index to {}", path.display()))?;

        tracing::info!(
            "Saved search index to {} ({:?}, {} documents, {} bytes)",
            path.display(),
            format,
            self.index.document_count(),
            bytes.len()
        );
        Ok(())
    }

    /// Read and validate a persisted index from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read search index from {}", path.display()))?;
        let bundle = Self::from_bytes(&bytes)
            .with_context(|| format!("Invalid search index at {}", path.display()))?;

        tracing::info!(
            "Loaded search index from {} ({} terms, {} docs)",
            path.display(),
            bundle.index.term_count(),
            bundle.index.document_count()
        );
        Ok(bundle)
    }

    /// Hand the bundle to a query engine.
    pub fn into_searcher(self) -> std::result::Result<Searcher, ConfigError> {
        Searcher::new(self.index, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::index::Document;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn bundle() -> IndexBundle {
        let index = SearchIndex::build(vec![Document::new(
            "0",
            "Prólogo",
            "Rust es un lenguaje de programación",
            "Introducción",
        )])
        .unwrap();
        IndexBundle::new(index, SearchConfig::default())
    }

    #[rstest]
    #[case("searchindex.json", Format::Json)]
    #[case("searchindex.js", Format::Js)]
    #[case("searchindex.bin", Format::Binary)]
    #[case("searchindex", Format::Binary)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: Format) {
        check!(Format::from_path(Path::new(path)) == expected);
    }

    #[rstest]
    #[case(Format::Binary)]
    #[case(Format::Json)]
    #[case(Format::Js)]
    fn test_detect_matches_encoding(#[case] format: Format) {
        let bytes = bundle().to_bytes(format).unwrap();
        check!(Format::detect(&bytes) == Some(format));
    }

    #[test]
    fn test_unrecognized_bytes() {
        check!(Format::detect(b"\x00\x01garbage").is_none());
        let_assert!(Err(LoadError::BadMagic) = IndexBundle::from_bytes(b"plain text"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searchindex.bin");
        let original = bundle();
        original.save(&path, Format::Binary).unwrap();
        check!(IndexBundle::load(&path).unwrap() == original);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = IndexBundle::load(&dir.path().join("absent.bin")).unwrap_err();
        check!(err.to_string().contains("Failed to read search index"));
    }

    #[test]
    fn test_into_searcher() {
        let searcher = bundle().into_searcher().unwrap();
        check!(searcher.search("Rust").len() == 1);
    }
}
