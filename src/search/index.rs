//! Document store, immutable search index, and the batch index builder.

use super::scoring::term_frequency_weight;
use super::tokenize::Pipeline;
use super::trie::{NodeId, Trie, TrieNode};
use crate::error::ConstructionError;
use crate::types::{DocRef, Field, FieldMap, TermFrequencies};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A page of the book as handed over by the site generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Ordinal identifier, unique within one index
    pub id: String,
    pub title: String,
    pub body: String,
    /// Navigation path, e.g. "Introduction » Prologue"
    pub breadcrumbs: String,
    /// Page URL (with anchor), if the generator provides one
    #[serde(default)]
    pub url: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        breadcrumbs: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            breadcrumbs: breadcrumbs.into(),
            url: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Text of an indexed field.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Body => &self.body,
            Field::Breadcrumbs => &self.breadcrumbs,
        }
    }
}

/// A document as found in external JSON, before required fields are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(alias = "breadcrumb", alias = "hierarchy", skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RawDocument {
    /// Parse a JSON array of documents.
    pub fn parse_list(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check required fields; `position` is the document's place in the input.
    pub fn into_document(self, position: usize) -> Result<Document, ConstructionError> {
        let missing = |field| ConstructionError::MissingField { position, field };
        let id = self.id.filter(|id| !id.is_empty()).ok_or_else(|| missing("id"))?;
        Ok(Document {
            id,
            title: self.title.ok_or_else(|| missing("title"))?,
            body: self.body.ok_or_else(|| missing("body"))?,
            breadcrumbs: self.breadcrumbs.ok_or_else(|| missing("breadcrumbs"))?,
            url: self.url,
        })
    }
}

impl From<&Document> for RawDocument {
    fn from(document: &Document) -> Self {
        Self {
            id: Some(document.id.clone()),
            title: Some(document.title.clone()),
            body: Some(document.body.clone()),
            breadcrumbs: Some(document.breadcrumbs.clone()),
            url: document.url.clone(),
        }
    }
}

/// A stored document with its per-field token counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document: Document,
    pub lengths: FieldMap<u32>,
}

/// Documents in insertion order, addressed by [`DocRef`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    docs: Vec<StoredDocument>,
}

impl DocumentStore {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, doc: DocRef) -> Option<&StoredDocument> {
        self.docs.get(doc.index())
    }

    /// Find a document's ordinal by its identifier.
    pub fn position(&self, id: &str) -> Option<DocRef> {
        self.docs
            .iter()
            .position(|stored| stored.document.id == id)
            .map(|index| DocRef(index as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocRef, &StoredDocument)> + '_ {
        self.docs
            .iter()
            .enumerate()
            .map(|(index, stored)| (DocRef(index as u32), stored))
    }

    pub(crate) fn from_vec(docs: Vec<StoredDocument>) -> Self {
        Self { docs }
    }
}

/// An immutable, searchable index over a finite document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pipeline: Pipeline,
    documents: DocumentStore,
    trie: Trie,
}

impl SearchIndex {
    /// Build an index from a complete document set with the default pipeline.
    pub fn build(
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<Self, ConstructionError> {
        Self::build_with(Pipeline::default(), documents)
    }

    /// Build an index with an explicit pipeline. Fails without producing an
    /// index if any document is rejected.
    pub fn build_with(
        pipeline: Pipeline,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<Self, ConstructionError> {
        let mut builder = IndexBuilder::new(pipeline);
        for document in documents {
            builder.add(document)?;
        }
        Ok(builder.finish())
    }

    /// Build from unchecked external documents.
    pub fn build_from_raw(
        pipeline: Pipeline,
        documents: impl IntoIterator<Item = RawDocument>,
    ) -> Result<Self, ConstructionError> {
        let mut builder = IndexBuilder::new(pipeline);
        for (position, raw) in documents.into_iter().enumerate() {
            builder.add(raw.into_document(position)?)?;
        }
        Ok(builder.finish())
    }

    /// Assemble an index from persisted parts, checking its invariants.
    pub(crate) fn from_parts(
        pipeline: Pipeline,
        documents: DocumentStore,
        trie: Trie,
    ) -> Result<Self, String> {
        let index = Self {
            pipeline,
            documents,
            trie,
        };
        index.validate()?;
        Ok(index)
    }

    /// Check identifier uniqueness and trie invariants.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let mut seen = AHashSet::with_capacity(self.documents.len());
        for (_, stored) in self.documents.iter() {
            if !seen.insert(stored.document.id.as_str()) {
                return Err(format!("duplicate document identifier '{}'", stored.document.id));
            }
        }
        self.trie.validate(self.documents.len())
    }

    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub const fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub const fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.trie.term_count()
    }

    /// Token count of `field` in `doc` after normalization.
    pub fn field_length(&self, doc: DocRef, field: Field) -> u32 {
        self.documents
            .get(doc)
            .map_or(0, |stored| stored.lengths.get(field))
    }

    /// Node for an already-normalized token, if indexed.
    pub fn lookup(&self, token: &str) -> Option<&TrieNode> {
        self.trie.get(token)
    }

    /// Indexed tokens starting with `prefix`.
    pub fn expand(&self, prefix: &str) -> Vec<(String, NodeId)> {
        self.trie.expand(prefix)
    }

    /// Number of distinct documents containing the normalized token in any field.
    pub fn document_frequency(&self, token: &str) -> u32 {
        self.lookup(token).map_or(0, TrieNode::df)
    }

    /// Term frequencies of a normalized token in one document.
    pub fn term_frequencies(&self, token: &str, doc: DocRef) -> Option<TermFrequencies> {
        self.lookup(token)
            .and_then(|node| node.postings().get(&doc).copied())
    }
}

/// Builder accumulating documents and term frequencies for one batch build.
pub struct IndexBuilder {
    pipeline: Pipeline,
    documents: Vec<StoredDocument>,
    ids: AHashSet<String>,
    trie: Trie,
    started: Instant,
}

impl IndexBuilder {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            documents: Vec::new(),
            ids: AHashSet::new(),
            trie: Trie::new(),
            started: Instant::now(),
        }
    }

    /// Tokenize and index one document.
    ///
    /// Rejected documents leave the builder unchanged.
    pub fn add(&mut self, document: Document) -> Result<DocRef, ConstructionError> {
        let position = self.documents.len();
        if document.id.is_empty() {
            tracing::warn!("Rejected document #{}: empty identifier", position);
            return Err(ConstructionError::MissingField {
                position,
                field: "id",
            });
        }
        if self.ids.contains(&document.id) {
            tracing::warn!("Rejected document #{}: duplicate identifier '{}'", position, document.id);
            return Err(ConstructionError::DuplicateId { id: document.id });
        }

        let doc = DocRef(position as u32);
        let mut lengths = FieldMap::splat(0);
        for field in Field::ALL {
            lengths.set(field, self.add_field(doc, field, document.field(field)));
        }

        self.ids.insert(document.id.clone());
        self.documents.push(StoredDocument { document, lengths });
        Ok(doc)
    }

    /// Index one field of a document and return its token count.
    fn add_field(&mut self, doc: DocRef, field: Field, text: &str) -> u32 {
        // Count word frequencies using AHashMap for O(1) operations
        let mut word_counts: AHashMap<String, u32> = AHashMap::new();
        for token in self.pipeline.tokens(text) {
            *word_counts.entry(token).or_insert(0) += 1;
        }
        let length = word_counts.values().sum();

        // Insert in sorted order so arena layout is deterministic
        let mut counts: Vec<_> = word_counts.into_iter().collect();
        counts.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

        for (token, count) in counts {
            let node = self.trie.insert(&token);
            self.trie
                .record(node, doc, field, term_frequency_weight(count));
        }
        length
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Freeze the accumulated state into an immutable index.
    pub fn finish(self) -> SearchIndex {
        let index = SearchIndex {
            pipeline: self.pipeline,
            documents: DocumentStore::from_vec(self.documents),
            trie: self.trie,
        };

        tracing::info!(
            "Built search index: {} unique terms, {} documents, {} term-document pairs in {:?}",
            index.term_count(),
            index.document_count(),
            index.trie.posting_count(),
            self.started.elapsed()
        );

        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    fn sample_docs() -> Vec<Document> {
        vec![
            Document::new("0", "Prólogo", "Rust es un lenguaje. Rust, Rust!", "Prólogo"),
            Document::new("1", "Memory safety", "Ownership prevents data races", "Guide » Memory"),
        ]
    }

    #[test]
    fn test_build_records_sqrt_term_frequency() {
        let index = SearchIndex::build(sample_docs()).unwrap();
        let doc = index.documents().position("0").unwrap();
        let tf = index.term_frequencies("rust", doc).unwrap();
        check!((tf.get(Field::Body).unwrap() - 3.0_f64.sqrt()).abs() < 1e-12);
        check!(tf.get(Field::Title).is_none());
    }

    #[test]
    fn test_document_frequency_counts_distinct_documents() {
        let index = SearchIndex::build(sample_docs()).unwrap();
        // "memori" appears in the title and breadcrumbs of one document only
        check!(index.document_frequency("memori") == 1);
        check!(index.document_frequency("rust") == 1);
        check!(index.document_frequency("xyzzy") == 0);
    }

    #[test]
    fn test_field_lengths() {
        let index = SearchIndex::build(sample_docs()).unwrap();
        let doc = index.documents().position("1").unwrap();
        check!(index.field_length(doc, Field::Title) == 2);
        check!(index.field_length(doc, Field::Body) == 4);
        // "»" trims away entirely
        check!(index.field_length(doc, Field::Breadcrumbs) == 2);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut docs = sample_docs();
        docs.push(Document::new("1", "Again", "", ""));
        let result = SearchIndex::build(docs);
        let_assert!(Err(ConstructionError::DuplicateId { id }) = result);
        check!(id == "1");
    }

    #[test]
    fn test_builder_unchanged_after_rejection() {
        let mut builder = IndexBuilder::new(Pipeline::default());
        builder.add(Document::new("0", "a", "b", "c")).unwrap();
        check!(builder.add(Document::new("0", "x", "y", "z")).is_err());
        check!(builder.add(Document::new("", "x", "y", "z")).is_err());
        check!(builder.len() == 1);
    }

    #[test]
    fn test_raw_document_missing_field() {
        let raw = RawDocument::parse_list(
            r#"[{"id": "0", "title": "Intro", "body": "text", "breadcrumbs": "Intro"},
                {"id": "1", "title": "No body", "breadcrumbs": "x"}]"#,
        )
        .unwrap();
        let result = SearchIndex::build_from_raw(Pipeline::default(), raw);
        check!(
            result
                == Err(ConstructionError::MissingField {
                    position: 1,
                    field: "body"
                })
        );
    }

    #[test]
    fn test_empty_document_set() {
        let index = SearchIndex::build(Vec::new()).unwrap();
        check!(index.document_count() == 0);
        check!(index.term_count() == 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = SearchIndex::build(sample_docs()).unwrap();
        let b = SearchIndex::build(sample_docs()).unwrap();
        check!(a == b);
        check!(a.validate().is_ok());
    }
}
