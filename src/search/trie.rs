//! Arena-backed prefix tree mapping tokens to per-document term frequencies.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]; children are a
//! small vector of `(char, NodeId)` pairs kept sorted by character so lookups
//! binary-search and serialization is compact and deterministic.

use crate::search::tokenize::MAX_TOKEN_CHARS;
use crate::types::{DocRef, Field, TermFrequencies};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: Self = Self(0);

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One trie node. A node ends a token iff its posting map is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrieNode {
    children: Vec<(char, NodeId)>,
    /// Number of distinct documents containing the token ending here
    df: u32,
    postings: BTreeMap<DocRef, TermFrequencies>,
}

impl TrieNode {
    pub const fn df(&self) -> u32 {
        self.df
    }

    pub const fn postings(&self) -> &BTreeMap<DocRef, TermFrequencies> {
        &self.postings
    }

    pub fn children(&self) -> &[(char, NodeId)] {
        &self.children
    }

    /// Whether a token ends at this node.
    pub fn is_terminal(&self) -> bool {
        !self.postings.is_empty()
    }

    fn child(&self, c: char) -> Option<NodeId> {
        self.children
            .binary_search_by_key(&c, |(ch, _)| *ch)
            .ok()
            .map(|i| self.children[i].1)
    }
}

/// Prefix tree over normalized tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<TrieNode>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    /// Create a trie holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.index()]
    }

    /// Insert the path for `token`, creating missing nodes, and return its terminal node.
    pub(crate) fn insert(&mut self, token: &str) -> NodeId {
        let mut current = NodeId::ROOT;
        for c in token.chars() {
            let children = &self.nodes[current.index()].children;
            current = match children.binary_search_by_key(&c, |(ch, _)| *ch) {
                Ok(i) => children[i].1,
                Err(i) => {
                    let id = NodeId(self.nodes.len() as u32);
                    self.nodes.push(TrieNode::default());
                    self.nodes[current.index()].children.insert(i, (c, id));
                    id
                }
            };
        }
        current
    }

    /// Record the term frequency of the token ending at `node` for `doc` in `field`.
    pub(crate) fn record(&mut self, node: NodeId, doc: DocRef, field: Field, tf: f64) {
        let node = &mut self.nodes[node.index()];
        node.postings.entry(doc).or_default().set(field, tf);
        node.df = node.postings.len() as u32;
    }

    /// Locate the node reached by `token`, whether or not a token ends there.
    pub fn find(&self, token: &str) -> Option<NodeId> {
        token
            .chars()
            .try_fold(NodeId::ROOT, |id, c| self.node(id).child(c))
    }

    /// Exact lookup: the node for `token` if a token ends there.
    pub fn get(&self, token: &str) -> Option<&TrieNode> {
        self.find(token)
            .map(|id| self.node(id))
            .filter(|node| node.is_terminal())
    }

    /// All tokens starting with `prefix` (including `prefix` itself), in character order.
    pub fn expand(&self, prefix: &str) -> Vec<(String, NodeId)> {
        let Some(start) = self.find(prefix) else {
            return vec![];
        };

        let mut found = vec![];
        let mut stack = vec![(prefix.to_string(), start)];
        while let Some((token, id)) = stack.pop() {
            let node = self.node(id);
            // Push in reverse so children pop in ascending character order
            for &(c, child) in node.children.iter().rev() {
                let mut next = token.clone();
                next.push(c);
                stack.push((next, child));
            }
            if node.is_terminal() {
                found.push((token, id));
            }
        }
        found
    }

    /// Every indexed token with its node, in character order.
    pub fn terms(&self) -> Vec<(String, NodeId)> {
        self.expand("")
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct tokens in the trie.
    pub fn term_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_terminal()).count()
    }

    /// Total number of (token, document) pairs.
    pub fn posting_count(&self) -> usize {
        self.nodes.iter().map(|node| node.postings.len()).sum()
    }

    /// Check structural invariants against a document store of `doc_count` documents.
    ///
    /// Every non-root node must have exactly one parent, children must be sorted
    /// and unique, `df` must equal the posting count, and every posting must refer
    /// to a stored document with at least one positive, finite frequency. Every
    /// node must be reachable from the root within [`MAX_TOKEN_CHARS`] steps.
    pub(crate) fn validate(&self, doc_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("trie has no root node".to_string());
        }

        let mut parents = vec![0u32; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if node
                .children
                .windows(2)
                .any(|pair| pair[0].0 >= pair[1].0)
            {
                return Err(format!("children of node {index} are not sorted"));
            }
            for &(_, child) in &node.children {
                let slot = parents
                    .get_mut(child.index())
                    .ok_or_else(|| format!("node {index} points past the arena"))?;
                *slot += 1;
            }

            if node.df as usize != node.postings.len() {
                return Err(format!(
                    "node {index} has df {} but {} postings",
                    node.df,
                    node.postings.len()
                ));
            }
            for (doc, tf) in &node.postings {
                if doc.index() >= doc_count {
                    return Err(format!("node {index} references missing document #{}", doc.0));
                }
                if tf.is_empty() || !tf.is_well_formed() {
                    return Err(format!("node {index} has a non-positive tf for #{}", doc.0));
                }
            }
        }

        if parents[0] != 0 || parents[1..].iter().any(|&count| count != 1) {
            return Err("trie nodes do not form a tree".to_string());
        }

        let mut reached = 0;
        let mut stack = vec![(NodeId::ROOT, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_TOKEN_CHARS {
                return Err(format!(
                    "trie holds a token longer than {MAX_TOKEN_CHARS} characters"
                ));
            }
            reached += 1;
            let children = &self.nodes[id.index()].children;
            stack.extend(children.iter().map(|&(_, child)| (child, depth + 1)));
        }
        if reached != self.nodes.len() {
            return Err("trie has nodes unreachable from the root".to_string());
        }
        Ok(())
    }
}
