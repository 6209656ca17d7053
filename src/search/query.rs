//! Query engine: tokenizes a query, looks tokens up in the trie, combines the
//! per-token candidate sets and ranks the survivors.

use super::index::SearchIndex;
use super::scoring::{
    coordination, expansion_weight, field_length_norm, inverse_document_frequency,
};
use super::teaser::make_teaser;
use super::trie::NodeId;
use crate::config::{BoolMode, SearchConfig};
use crate::error::ConfigError;
use crate::types::DocRef;
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub title: String,
    pub url: Option<String>,
    pub teaser: Option<String>,
}

/// A document's score with the number of query tokens it matched.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    score: f64,
    matched: usize,
}

/// Read-only query engine over one immutable index and configuration.
#[derive(Debug, Clone)]
pub struct Searcher {
    index: Arc<SearchIndex>,
    config: SearchConfig,
}

impl Searcher {
    /// Create a searcher, rejecting an invalid configuration up front.
    pub fn new(
        index: impl Into<Arc<SearchIndex>>,
        config: SearchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            index: index.into(),
            config,
        })
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Normalized, de-duplicated query tokens in query order.
    pub fn query_tokens(&self, query: &str) -> Vec<String> {
        let mut seen = AHashSet::new();
        self.index
            .pipeline()
            .tokens(query)
            .filter(|token| seen.insert(token.clone()))
            .collect()
    }

    /// Search and return up to `limit` hits, best first.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let tokens = self.query_tokens(query);
        let ranked = self.rank_tokens(&tokens);

        tracing::debug!(
            "Query {:?}: {} tokens, {} matching documents",
            query,
            tokens.len(),
            ranked.len()
        );

        ranked
            .into_iter()
            .take(self.config.limit)
            .filter_map(|(doc, score)| {
                let stored = self.index.documents().get(doc)?;
                let teaser = make_teaser(
                    self.index.pipeline(),
                    &stored.document.body,
                    &tokens,
                    self.config.teaser_word_count,
                    self.config.expand,
                );
                Some(SearchHit {
                    id: stored.document.id.clone(),
                    score,
                    title: stored.document.title.clone(),
                    url: stored.document.url.clone(),
                    teaser,
                })
            })
            .collect()
    }

    /// Every matching document with its score, best first, without the limit.
    ///
    /// Ties keep document store order.
    pub fn rank(&self, query: &str) -> Vec<(DocRef, f64)> {
        self.rank_tokens(&self.query_tokens(query))
    }

    fn rank_tokens(&self, tokens: &[String]) -> Vec<(DocRef, f64)> {
        if tokens.is_empty() {
            return vec![];
        }

        let mut combined: Option<AHashMap<DocRef, Candidate>> = None;
        for token in tokens {
            let scores = self.score_token(token);
            combined = Some(match combined {
                None => scores
                    .into_iter()
                    .map(|(doc, score)| (doc, Candidate { score, matched: 1 }))
                    .collect(),
                Some(acc) => merge(acc, scores, self.config.bool_mode),
            });

            if self.config.bool_mode == BoolMode::And
                && combined.as_ref().is_some_and(|acc| acc.is_empty())
            {
                break;
            }
        }

        let mut ranked: Vec<(DocRef, f64)> = combined
            .unwrap_or_default()
            .into_iter()
            .map(|(doc, candidate)| {
                let score = if self.config.scoring.coordination {
                    candidate.score * coordination(candidate.matched, tokens.len())
                } else {
                    candidate.score
                };
                (doc, score)
            })
            .collect();

        ranked.sort_by(|(doc_a, a), (doc_b, b)| b.total_cmp(a).then(doc_a.cmp(doc_b)));
        ranked
    }

    /// Trie keys a query token matches: itself, or every completion when expanding.
    fn keys_for(&self, token: &str) -> Vec<(String, NodeId)> {
        if self.config.expand {
            return self.index.expand(token);
        }
        let trie = self.index.trie();
        trie.find(token)
            .filter(|&id| trie.node(id).is_terminal())
            .map(|id| vec![(token.to_string(), id)])
            .unwrap_or_default()
    }

    /// Score every document matching one query token.
    fn score_token(&self, token: &str) -> AHashMap<DocRef, f64> {
        let scoring = &self.config.scoring;
        let total_docs = self.index.document_count();
        let mut scores = AHashMap::new();

        for (key, id) in self.keys_for(token) {
            let node = self.index.trie().node(id);
            let weight = expansion_weight(token, &key, scoring.expansion_penalty);
            // A zero-weight key neither matches nor scores, like a zero-boost field
            if weight <= 0.0 {
                continue;
            }
            let idf = if scoring.idf {
                inverse_document_frequency(node.df(), total_docs)
            } else {
                1.0
            };

            for (&doc, frequencies) in node.postings() {
                let mut contribution = None;
                for (field, tf) in frequencies.present() {
                    let boost = self.config.boost(field);
                    if boost == 0.0 {
                        continue;
                    }
                    let norm = if scoring.field_length_norm {
                        field_length_norm(self.index.field_length(doc, field))
                    } else {
                        1.0
                    };
                    *contribution.get_or_insert(0.0) += boost * tf * idf * norm * weight;
                }
                if let Some(contribution) = contribution {
                    *scores.entry(doc).or_insert(0.0) += contribution;
                }
            }
        }
        scores
    }
}

/// Combine accumulated candidates with one token's scores.
fn merge(
    mut acc: AHashMap<DocRef, Candidate>,
    scores: AHashMap<DocRef, f64>,
    mode: BoolMode,
) -> AHashMap<DocRef, Candidate> {
    match mode {
        BoolMode::And => {
            acc.retain(|doc, _| scores.contains_key(doc));
            for (doc, candidate) in acc.iter_mut() {
                candidate.score += scores[doc];
                candidate.matched += 1;
            }
        }
        BoolMode::Or => {
            for (doc, score) in scores {
                let candidate = acc.entry(doc).or_insert(Candidate {
                    score: 0.0,
                    matched: 0,
                });
                candidate.score += score;
                candidate.matched += 1;
            }
        }
    }
    acc
}
