//! The elasticlunr 0.9.5 JSON layout read by the book's search page.
//!
//! Each field gets its own nested trie of single-character keys:
//!
//! ```json
//! {"root": {"df": 0, "docs": {}, "r": {"df": 0, "docs": {}, "u": {...}}}}
//! ```
//!
//! Terminal nodes carry `"docs": {"<id>": {"tf": 1.7320508075688772}}` and a
//! per-field `df`. Importing merges the field tries back into one trie whose
//! `df` counts distinct documents. The page may be wrapped as a script
//! (`window.search = {...};`).

use super::IndexBundle;
use crate::config::{RawFieldOptions, RawScoring, RawSearchConfig, ScoringOptions, SearchConfig};
use crate::error::LoadError;
use crate::search::index::{DocumentStore, RawDocument, SearchIndex, StoredDocument};
use crate::search::tokenize::{Language, MAX_TOKEN_CHARS, Pipeline, PipelineStage};
use crate::search::trie::{NodeId, Trie};
use crate::types::{DocRef, Field, FieldMap};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

const VERSION: &str = "0.9.5";
const JS_PREFIX: &str = "window.search = ";

/// Deepest JSON nesting accepted on import: the longest trie path plus the envelope.
const MAX_NESTING: usize = MAX_TOKEN_CHARS + 8;

#[derive(Debug, Serialize, Deserialize)]
struct ElasticlunrExport {
    #[serde(default)]
    doc_urls: Vec<String>,
    index: LunrIndex,
    #[serde(default)]
    results_options: ResultsOptions,
    #[serde(default)]
    search_options: SearchOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct LunrIndex {
    #[serde(rename = "documentStore")]
    document_store: LunrDocumentStore,
    fields: Vec<String>,
    index: BTreeMap<String, LunrFieldIndex>,
    pipeline: Vec<String>,
    #[serde(rename = "ref", default = "default_ref")]
    reference: String,
    #[serde(default)]
    version: String,
    /// Stemming language; absent in files from other generators, which stem English
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<Language>,
}

fn default_ref() -> String {
    "id".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LunrDocumentStore {
    #[serde(rename = "docInfo", default)]
    doc_info: BTreeMap<String, BTreeMap<String, u32>>,
    #[serde(default)]
    docs: BTreeMap<String, RawDocument>,
    #[serde(default)]
    length: usize,
    #[serde(default)]
    save: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct LunrFieldIndex {
    root: Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ResultsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit_results: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    teaser_word_count: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expand: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, RawFieldOptions>>,
    /// Scoring extensions the search page ignores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scoring: Option<RawScoring>,
}

/// Whether `text` looks like an elasticlunr export, bare or script-wrapped.
pub fn is_elasticlunr(text: &str) -> bool {
    let text = text.trim_start();
    text.starts_with('{') || text.starts_with("window.") || text.starts_with("Object.assign")
}

/// Serialize to elasticlunr JSON.
pub fn to_json(bundle: &IndexBundle) -> Result<String, serde_json::Error> {
    serde_json::to_string(&export(bundle))
}

/// Serialize to a script assigning the index to `window.search`.
pub fn to_js(bundle: &IndexBundle) -> Result<String, serde_json::Error> {
    Ok(format!("{JS_PREFIX}{};", to_json(bundle)?))
}

/// Parse elasticlunr JSON, optionally wrapped in a script, and validate it.
pub fn from_json(text: &str) -> Result<IndexBundle, LoadError> {
    let json = strip_script(text)?;
    check_nesting(json)?;
    let export: ElasticlunrExport = serde_json::from_str(json)?;

    let bundle = import(export)?;
    bundle.validate()?;
    Ok(bundle)
}

/// The JSON object inside an optional script wrapper.
fn strip_script(text: &str) -> Result<&str, LoadError> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(LoadError::Malformed(
            "no JSON object found in script".to_string(),
        )),
    }
}

/// Reject documents nested deeper than [`MAX_NESTING`] before parsing them.
fn check_nesting(json: &str) -> Result<(), LoadError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in json.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(LoadError::Malformed(format!(
                        "JSON nests deeper than {MAX_NESTING} levels"
                    )));
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn export(bundle: &IndexBundle) -> ElasticlunrExport {
    let index = &bundle.index;
    let config = &bundle.config;
    let ids: Vec<&str> = index
        .documents()
        .iter()
        .map(|(_, stored)| stored.document.id.as_str())
        .collect();

    let mut document_store = LunrDocumentStore {
        length: ids.len(),
        save: true,
        ..LunrDocumentStore::default()
    };
    let mut doc_urls = Vec::with_capacity(ids.len());
    for (_, stored) in index.documents().iter() {
        let document = &stored.document;
        doc_urls.push(document.url.clone().unwrap_or_default());

        let info = stored
            .lengths
            .iter()
            .map(|(field, length)| (field.to_string(), length))
            .collect();
        document_store.doc_info.insert(document.id.clone(), info);

        // URLs travel in `doc_urls`
        let raw = RawDocument {
            url: None,
            ..RawDocument::from(document)
        };
        document_store.docs.insert(document.id.clone(), raw);
    }

    let fields = Field::ALL
        .iter()
        .map(|&field| {
            let root = export_field(index.trie(), field, &ids);
            (field.to_string(), LunrFieldIndex { root })
        })
        .collect();

    let raw = config.to_raw();
    ElasticlunrExport {
        doc_urls,
        index: LunrIndex {
            document_store,
            fields: Field::ALL.iter().map(ToString::to_string).collect(),
            index: fields,
            pipeline: index
                .pipeline()
                .stages()
                .into_iter()
                .map(|stage| stage.name().to_string())
                .collect(),
            reference: default_ref(),
            version: VERSION.to_string(),
            language: Some(index.pipeline().language()),
        },
        results_options: ResultsOptions {
            limit_results: raw.limit_results,
            teaser_word_count: raw.teaser_word_count,
        },
        search_options: SearchOptions {
            bool: raw.bool,
            expand: raw.expand,
            fields: raw.fields,
            scoring: (config.scoring != ScoringOptions::default())
                .then_some(raw.scoring)
                .flatten(),
        },
    }
}

/// A node being exported: its key under the parent and the children finished so far.
struct ExportFrame {
    id: NodeId,
    key: char,
    next_child: usize,
    object: Map<String, Value>,
}

impl ExportFrame {
    fn new(id: NodeId, key: char) -> Self {
        Self {
            id,
            key,
            next_child: 0,
            object: Map::new(),
        }
    }
}

/// One field's nested trie. Walks depth-first with an explicit stack.
fn export_field(trie: &Trie, field: Field, ids: &[&str]) -> Value {
    let mut stack = vec![ExportFrame::new(NodeId::ROOT, '\0')];
    while let Some(frame) = stack.last_mut() {
        if let Some(&(key, child)) = trie.node(frame.id).children().get(frame.next_child) {
            frame.next_child += 1;
            stack.push(ExportFrame::new(child, key));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let value = finish_node(trie, done.id, field, ids, done.object);
        match stack.last_mut() {
            Some(parent) => {
                if let Some(value) = value {
                    parent.object.insert(done.key.to_string(), value);
                }
            }
            None => return value.unwrap_or_else(empty_node),
        }
    }
    empty_node()
}

fn empty_node() -> Value {
    json!({"df": 0, "docs": {}})
}

/// Attach `field` postings to a node's exported children, or `None` if the
/// subtree holds nothing for `field`.
fn finish_node(
    trie: &Trie,
    id: NodeId,
    field: Field,
    ids: &[&str],
    mut object: Map<String, Value>,
) -> Option<Value> {
    let docs: Map<String, Value> = trie
        .node(id)
        .postings()
        .iter()
        .filter_map(|(doc, frequencies)| {
            let tf = frequencies.get(field)?;
            let id = ids.get(doc.index())?;
            Some(((*id).to_string(), json!({ "tf": tf })))
        })
        .collect();

    if docs.is_empty() && object.is_empty() {
        return None;
    }
    object.insert("df".to_string(), json!(docs.len()));
    object.insert("docs".to_string(), Value::Object(docs));
    Some(Value::Object(object))
}

fn import(export: ElasticlunrExport) -> Result<IndexBundle, LoadError> {
    let pipeline = import_pipeline(&export.index)?;
    let ElasticlunrExport {
        doc_urls,
        index,
        results_options,
        search_options,
    } = export;

    let store = index.document_store;
    if store.docs.is_empty() && !store.doc_info.is_empty() {
        return Err(LoadError::Malformed(
            "document store was saved without document contents".to_string(),
        ));
    }

    // Numeric identifiers are ordinals into `doc_urls`; keep them in numeric order
    let mut entries: Vec<(String, RawDocument)> = store.docs.into_iter().collect();
    entries.sort_by_key(|(id, _)| (id.parse::<u64>().map_or((1, 0), |n| (0, n)), id.clone()));

    let mut documents = Vec::with_capacity(entries.len());
    let mut refs: AHashMap<String, DocRef> = AHashMap::with_capacity(entries.len());
    for (position, (key, mut raw)) in entries.into_iter().enumerate() {
        if raw.id.as_deref().is_none_or(str::is_empty) {
            raw.id = Some(key.clone());
        }
        if raw.url.is_none() {
            raw.url = key
                .parse::<usize>()
                .ok()
                .and_then(|n| doc_urls.get(n))
                .filter(|url| !url.is_empty())
                .cloned();
        }
        let document = raw.into_document(position)?;

        let mut lengths = FieldMap::splat(0);
        if let Some(info) = store.doc_info.get(&key) {
            for (name, &length) in info {
                lengths.set(import_field(name)?, length);
            }
        }

        refs.insert(key, DocRef(position as u32));
        documents.push(StoredDocument { document, lengths });
    }

    let mut trie = Trie::new();
    for (name, field_index) in &index.index {
        import_field_trie(&mut trie, import_field(name)?, &field_index.root, &refs)?;
    }

    let index = SearchIndex::from_parts(pipeline, DocumentStore::from_vec(documents), trie)
        .map_err(LoadError::Corrupt)?;

    let config = SearchConfig::try_from(RawSearchConfig {
        bool: search_options.bool,
        expand: search_options.expand,
        fields: search_options.fields,
        limit_results: results_options.limit_results,
        teaser_word_count: results_options.teaser_word_count,
        scoring: search_options.scoring,
    })?;

    Ok(IndexBundle::new(index, config))
}

fn import_pipeline(index: &LunrIndex) -> Result<Pipeline, LoadError> {
    let stages = index
        .pipeline
        .iter()
        .map(|name| {
            PipelineStage::from_name(name)
                .ok_or_else(|| LoadError::Malformed(format!("unknown pipeline stage '{name}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pipeline::with_stages(
        index.language.unwrap_or(Language::English),
        &stages,
    ))
}

fn import_field(name: &str) -> Result<Field, LoadError> {
    name.parse()
        .map_err(|_| LoadError::Malformed(format!("unknown field '{name}'")))
}

/// Merge one field's nested trie into the unified trie.
fn import_field_trie(
    trie: &mut Trie,
    field: Field,
    root: &Value,
    refs: &AHashMap<String, DocRef>,
) -> Result<(), LoadError> {
    let mut stack = vec![(String::new(), root)];
    while let Some((token, value)) = stack.pop() {
        let Value::Object(node) = value else {
            return Err(LoadError::Malformed(format!(
                "{field} trie node '{token}' is not an object"
            )));
        };

        for (key, child) in node {
            match key.as_str() {
                "df" => {}
                "docs" => import_postings(trie, field, &token, child, refs)?,
                _ => stack.push((format!("{token}{key}"), child)),
            }
        }
    }
    Ok(())
}

fn import_postings(
    trie: &mut Trie,
    field: Field,
    token: &str,
    docs: &Value,
    refs: &AHashMap<String, DocRef>,
) -> Result<(), LoadError> {
    let Value::Object(docs) = docs else {
        return Err(LoadError::Malformed(format!(
            "{field} postings for '{token}' are not an object"
        )));
    };
    if docs.is_empty() {
        return Ok(());
    }
    if token.is_empty() {
        return Err(LoadError::Malformed(format!(
            "{field} trie root carries postings"
        )));
    }

    let node = trie.insert(token);
    for (id, posting) in docs {
        let doc = *refs.get(id).ok_or_else(|| {
            LoadError::Malformed(format!("'{token}' references unknown document '{id}'"))
        })?;
        let tf = posting
            .get("tf")
            .and_then(Value::as_f64)
            .filter(|tf| tf.is_finite() && *tf > 0.0)
            .ok_or_else(|| {
                LoadError::Malformed(format!("'{token}' has an invalid tf for document '{id}'"))
            })?;
        trie.record(node, doc, field, tf);
    }
    Ok(())
}
