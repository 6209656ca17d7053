//! Search relevance and ranking functions.
//!
//! Every numeric ingredient of a document's score is a named function here so
//! the built index and the query engine agree on them exactly.

/// Term frequency weight for a token occurring `count` times in one field.
///
/// Grows sub-linearly: 1 → 1.0, 2 → 1.414…, 3 → 1.732…, 4 → 2.0.
pub fn term_frequency_weight(count: u32) -> f64 {
    f64::from(count).sqrt()
}

/// Inverse document frequency: `1 + ln(total_docs / (df + 1))`.
///
/// Always positive for `df <= total_docs`, since the ratio is at least one half.
pub fn inverse_document_frequency(df: u32, total_docs: usize) -> f64 {
    1.0 + (total_docs as f64 / (f64::from(df) + 1.0)).ln()
}

/// Field-length normalization: `1 / sqrt(length)`, or 1 for an empty field.
pub fn field_length_norm(length: u32) -> f64 {
    if length == 0 {
        1.0
    } else {
        1.0 / f64::from(length).sqrt()
    }
}

/// Weight for a trie key reached by prefix expansion of a query token.
///
/// Exact keys weigh 1. Expanded keys weigh `penalty × query_len / key_len`, so
/// longer completions of a short prefix count for less.
pub fn expansion_weight(query_token: &str, key: &str, penalty: f64) -> f64 {
    if key == query_token {
        return 1.0;
    }
    let query_len = query_token.chars().count() as f64;
    let key_len = key.chars().count() as f64;
    penalty * query_len / key_len
}

/// Coordination factor: share of query tokens a document matched.
pub fn coordination(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}
