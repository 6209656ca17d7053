mod common;

use assert2::check;
use booksearch::{
    BoolMode, Document, Field, IndexBundle, Pipeline, SearchConfig, SearchIndex, Searcher,
};
use common::{book, book_pages};
use proptest::prelude::*;
use rstest::rstest;
use std::collections::BTreeSet;

fn searcher_with(bundle: &IndexBundle, config: SearchConfig) -> Searcher {
    Searcher::new(bundle.index.clone(), config).expect("valid configuration")
}

fn ids(searcher: &Searcher, query: &str) -> BTreeSet<String> {
    searcher
        .search(query)
        .into_iter()
        .map(|hit| hit.id)
        .collect()
}

fn prologue() -> SearchIndex {
    SearchIndex::build(vec![Document::new(
        "0",
        "Prólogo",
        "Rust es un lenguaje de programación. Rust cuida la memoria; \
         el lenguaje protege la memoria y Rust compila rápido.",
        "Introducción » Prólogo",
    )])
    .expect("valid document")
}

// --- Concrete scenario ---

#[test]
fn prologue_query_for_rust_returns_the_page() {
    let searcher = Searcher::new(prologue(), SearchConfig::default()).unwrap();
    let hits = searcher.search("Rust");
    check!(hits.len() == 1);
    check!(hits[0].id == "0");
    check!(hits[0].title == "Prólogo");
    check!(hits[0].score > 0.0);
}

#[test]
fn prologue_query_for_unknown_token_is_empty() {
    let searcher = Searcher::new(prologue(), SearchConfig::default()).unwrap();
    check!(searcher.search("xyzzy").is_empty());
}

#[test]
fn prologue_tf_follows_square_root_of_count() {
    let index = prologue();
    let doc = index.documents().position("0").unwrap();
    let tf = index.term_frequencies("rust", doc).unwrap();
    check!((tf.get(Field::Body).unwrap() - 3.0_f64.sqrt()).abs() < 1e-12);
    check!(tf.get(Field::Title).is_none());
}

#[rstest]
#[case("PRÓLOGO")]
#[case("prólogo")]
// Decomposed accent: o + combining acute
#[case("Pro\u{301}logo")]
fn query_is_case_and_accent_normalized(#[case] query: &str) {
    let searcher = Searcher::new(prologue(), SearchConfig::default()).unwrap();
    check!(searcher.search(query).len() == 1, "query {query:?} should match");
}

// --- Ranking and limits ---

#[rstest]
fn title_match_outranks_body_match(book: IndexBundle) {
    let searcher = searcher_with(&book, SearchConfig::default());
    let hits = searcher.search("ownership");
    check!(hits[0].id == "1");
    check!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(30)]
fn result_count_never_exceeds_limit(book: IndexBundle, #[case] limit: usize) {
    let searcher = searcher_with(
        &book,
        SearchConfig {
            bool_mode: BoolMode::Or,
            limit,
            ..SearchConfig::default()
        },
    );
    let hits = searcher.search("rust ownership borrow memory");
    check!(hits.len() <= limit);
    check!(hits.len() == limit.min(4));
}

#[rstest]
fn hits_carry_urls_and_teasers(book: IndexBundle) {
    let searcher = searcher_with(
        &book,
        SearchConfig {
            teaser_word_count: 5,
            ..SearchConfig::default()
        },
    );
    let hits = searcher.search("checker");
    check!(hits.len() == 1);
    check!(hits[0].url.as_deref() == Some("ch04-02-references-and-borrowing.html"));
    let teaser = hits[0].teaser.as_deref().unwrap();
    check!(teaser.contains("checker"));
    check!(teaser.starts_with("… "));
}

#[rstest]
fn empty_queries_return_nothing(book: IndexBundle) {
    let searcher = searcher_with(&book, SearchConfig::default());
    check!(searcher.search("").is_empty());
    check!(searcher.search(" \t\n").is_empty());
    check!(searcher.search("-- ! ?").is_empty());
}

#[rstest]
fn missing_token_empties_and_but_not_or(book: IndexBundle) {
    let and = searcher_with(&book, SearchConfig::default());
    check!(and.search("ownership xyzzy").is_empty());

    let or = searcher_with(
        &book,
        SearchConfig {
            bool_mode: BoolMode::Or,
            ..SearchConfig::default()
        },
    );
    check!(ids(&or, "ownership xyzzy") == ids(&or, "ownership"));
}

// --- Index invariants ---

#[rstest]
fn df_matches_brute_force_scan(book: IndexBundle) {
    let index = &book.index;
    let pipeline = index.pipeline();
    for (token, _) in index.trie().terms() {
        let expected = book_pages()
            .iter()
            .filter(|doc| {
                Field::ALL
                    .iter()
                    .any(|&field| pipeline.tokens(doc.field(field)).any(|t| t == token))
            })
            .count();
        check!(index.document_frequency(&token) as usize == expected, "df of {token:?}");
    }
}

#[rstest]
fn field_lengths_count_pipeline_tokens(book: IndexBundle) {
    let index = &book.index;
    for (doc, stored) in index.documents().iter() {
        for field in Field::ALL {
            let expected = index.pipeline().tokens(stored.document.field(field)).count();
            check!(index.field_length(doc, field) as usize == expected);
        }
    }
}

// --- Algebraic properties ---

const VOCABULARY: &[&str] = &[
    "rust", "memory", "ownership", "borrowing", "threads", "having", "lenguajes", "más", "así",
    "multi-line", "the", "C++,", "(closures)", "Prólogo", "generalization",
];

/// A shared vocabulary word, or arbitrary letters with accents and hyphens.
fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(VOCABULARY).prop_map(str::to_string),
        "[a-zA-Záéíóúñ-]{1,12}",
    ]
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word(), 1..6)
}

type Page = (Vec<String>, Vec<String>, Vec<String>);

fn page() -> impl Strategy<Value = Page> {
    (words(), words(), words())
}

fn build(pages: &[Page]) -> SearchIndex {
    SearchIndex::build(pages.iter().enumerate().map(|(i, (title, body, crumbs))| {
        Document::new(i.to_string(), title.join(" "), body.join(" "), crumbs.join(" » "))
    }))
    .expect("generated pages are valid")
}

fn mode(index: &SearchIndex, bool_mode: BoolMode) -> Searcher {
    Searcher::new(
        index.clone(),
        SearchConfig {
            bool_mode,
            limit: 1000,
            ..SearchConfig::default()
        },
    )
    .expect("valid configuration")
}

proptest! {
    #[test]
    fn tokenizing_is_deterministic(text in "\\PC{0,80}") {
        let pipeline = Pipeline::default();
        prop_assert_eq!(pipeline.tokenize(&text), pipeline.tokenize(&text));
    }

    #[test]
    fn kept_title_words_find_their_page(pages in prop::collection::vec(page(), 1..8)) {
        let index = build(&pages);
        let searcher = mode(&index, BoolMode::And);
        for (i, (title, _, _)) in pages.iter().enumerate() {
            for word in title {
                // Stop words and pure punctuation never reach the index
                if index.pipeline().tokens(word).next().is_none() {
                    continue;
                }
                prop_assert!(
                    ids(&searcher, word).contains(&i.to_string()),
                    "title word {:?} of page {}", word, i
                );
            }
        }
    }

    #[test]
    fn and_narrows_as_tokens_are_added(
        pages in prop::collection::vec(page(), 1..8),
        a in word(),
        b in word(),
    ) {
        // A query of only stop words matches nothing, so it cannot narrow
        prop_assume!(Pipeline::default().tokens(&a).next().is_some());
        let searcher = mode(&build(&pages), BoolMode::And);
        let both = ids(&searcher, &format!("{a} {b}"));
        prop_assert!(both.is_subset(&ids(&searcher, &a)));
    }

    #[test]
    fn or_widens_as_tokens_are_added(
        pages in prop::collection::vec(page(), 1..8),
        a in word(),
        b in word(),
    ) {
        let searcher = mode(&build(&pages), BoolMode::Or);
        let either = ids(&searcher, &format!("{a} {b}"));
        prop_assert!(either.is_superset(&ids(&searcher, &a)));
    }

    #[test]
    fn ranking_is_stable(pages in prop::collection::vec(page(), 1..8), a in word()) {
        let searcher = mode(&build(&pages), BoolMode::Or);
        let ranked = searcher.rank(&a);
        prop_assert_eq!(&ranked, &searcher.rank(&a));
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].1 > pair[1].1 || (pair[0].1 == pair[1].1 && pair[0].0 < pair[1].0));
        }
    }
}
