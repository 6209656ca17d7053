//! Teaser extraction: the body window that best shows why a page matched.

use super::tokenize::Pipeline;

const ELLIPSIS: &str = "…";

/// Pick the `word_count`-word window of `body` containing the most query hits.
///
/// A body word is a hit when its normalized form equals a query token (or, with
/// `prefix`, starts with one). Ties go to the earliest window, and a body with
/// no hits yields its opening words. Returns `None` for an empty body or a zero
/// word count.
pub fn make_teaser(
    pipeline: &Pipeline,
    body: &str,
    query_tokens: &[String],
    word_count: usize,
    prefix: bool,
) -> Option<String> {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.is_empty() || word_count == 0 {
        return None;
    }
    if words.len() <= word_count {
        return Some(words.join(" "));
    }

    let is_hit = |word: &str| {
        word.split('-')
            .filter_map(|unit| pipeline.normalize(unit))
            .any(|token| {
                query_tokens.iter().any(|query| {
                    if prefix {
                        token.starts_with(query.as_str())
                    } else {
                        token == *query
                    }
                })
            })
    };
    let hits: Vec<u32> = words.iter().map(|word| u32::from(is_hit(word))).collect();

    // Sliding window sum over hit flags
    let mut window: u32 = hits[..word_count].iter().sum();
    let (mut best_start, mut best) = (0, window);
    for start in 1..=words.len() - word_count {
        window = window - hits[start - 1] + hits[start + word_count - 1];
        if window > best {
            best = window;
            best_start = start;
        }
    }

    let end = best_start + word_count;
    let mut teaser = String::new();
    if best_start > 0 {
        teaser.push_str(ELLIPSIS);
        teaser.push(' ');
    }
    teaser.push_str(&words[best_start..end].join(" "));
    if end < words.len() {
        teaser.push(' ');
        teaser.push_str(ELLIPSIS);
    }
    Some(teaser)
}
