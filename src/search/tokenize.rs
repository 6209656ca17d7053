//! Text tokenization and stemming utilities for search indexing.
//!
//! Text is split into units on whitespace and `-`, each unit is NFC-normalized
//! and lowercased, then run through the enabled stages in fixed order:
//! trimmer, stop-word filter, stemmer.
//!
//! English follows the elasticlunr generator exactly: an ASCII word-class
//! trimmer and lunr's Porter stemmer. Spanish trims on Unicode word
//! characters and stems with Snowball.

use elasticlunr::lang::{English, Language as _};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Common English stop words (the lunr list) filtered out before stemming.
pub(crate) const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "able", "about", "across", "after", "all", "almost", "also", "am", "among", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "but", "by", "can", "cannot", "could",
    "dear", "did", "do", "does", "either", "else", "ever", "every", "for", "from", "get", "got",
    "had", "has", "have", "he", "her", "hers", "him", "his", "how", "however", "i", "if", "in",
    "into", "is", "it", "its", "just", "least", "let", "like", "likely", "may", "me", "might",
    "most", "must", "my", "neither", "no", "nor", "not", "of", "off", "often", "on", "only", "or",
    "other", "our", "own", "rather", "said", "say", "says", "she", "should", "since", "so", "some",
    "than", "that", "the", "their", "them", "then", "there", "these", "they", "this", "tis", "to",
    "too", "twas", "us", "wants", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "whom", "why", "will", "with", "would", "yet", "you", "your",
];

/// Units longer than this many characters are dropped rather than indexed.
///
/// Data URIs and hashes would otherwise become trie paths thousands of nodes deep.
pub const MAX_TOKEN_CHARS: usize = 100;

/// Common Spanish stop words.
pub(crate) const SPANISH_STOP_WORDS: &[&str] = &[
    "a", "al", "algo", "algunas", "algunos", "ante", "antes", "como", "con", "contra", "cual",
    "cuando", "de", "del", "desde", "donde", "durante", "e", "el", "ella", "ellos", "en", "entre",
    "era", "es", "esa", "ese", "eso", "esta", "estas", "este", "esto", "estos", "fue", "ha", "hay",
    "hasta", "la", "las", "le", "les", "lo", "los", "me", "mi", "mucho", "muchos", "muy", "más",
    "mí", "nada", "ni", "no", "nos", "nosotros", "o", "otra", "otras", "otro", "otros", "para",
    "pero", "poco", "por", "porque", "que", "quien", "quienes", "qué", "se", "sin", "sobre", "su",
    "sus", "sí", "también", "tanto", "te", "todo", "todos", "tu", "un", "una", "uno", "unos", "y",
    "ya", "yo", "él",
];

/// Content language, selecting the stop-word set and stemming algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// Language code used in serialized indexes.
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "es" | "spanish" => Some(Self::Spanish),
            _ => None,
        }
    }

    fn stop_words(self) -> &'static [&'static str] {
        match self {
            Self::English => ENGLISH_STOP_WORDS,
            Self::Spanish => SPANISH_STOP_WORDS,
        }
    }

    fn word_stemmer(self) -> WordStemmer {
        match self {
            Self::English => WordStemmer::Porter,
            Self::Spanish => WordStemmer::Snowball(Stemmer::create(Algorithm::Spanish)),
        }
    }

    /// Whether `c` survives trimming at a token edge.
    fn is_word_char(self, c: char) -> bool {
        match self {
            Self::English => c.is_ascii_alphanumeric() || c == '_',
            Self::Spanish => c.is_alphanumeric() || c == '_',
        }
    }
}

enum WordStemmer {
    /// lunr's Porter stemmer, as shipped in elasticlunr's English pipeline
    Porter,
    Snowball(Stemmer),
}

thread_local! {
    static LUNR_ENGLISH: elasticlunr::Pipeline = English::new().make_pipeline();
}

impl WordStemmer {
    fn stem(&self, token: &str) -> String {
        match self {
            Self::Porter => LUNR_ENGLISH.with(|pipeline| {
                pipeline
                    .queue
                    .iter()
                    .find(|stage| stage.name() == PipelineStage::Stemmer.name())
                    .and_then(|stage| stage.filter(token.to_owned()))
                    .unwrap_or_else(|| token.to_owned())
            }),
            Self::Snowball(stemmer) => stemmer.stem(token).into_owned(),
        }
    }
}

/// A normalization stage, named as it appears in serialized indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    #[serde(rename = "trimmer")]
    Trimmer,
    #[serde(rename = "stopWordFilter")]
    StopWordFilter,
    #[serde(rename = "stemmer")]
    Stemmer,
}

impl PipelineStage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trimmer => "trimmer",
            Self::StopWordFilter => "stopWordFilter",
            Self::Stemmer => "stemmer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "trimmer" => Some(Self::Trimmer),
            "stopWordFilter" => Some(Self::StopWordFilter),
            "stemmer" => Some(Self::Stemmer),
            _ => None,
        }
    }
}

/// Serialized form of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub language: Language,
    pub stages: Vec<PipelineStage>,
}

/// Deterministic tokenizer/normalizer shared by indexing and querying.
#[derive(Serialize, Deserialize)]
#[serde(from = "PipelineSpec", into = "PipelineSpec")]
pub struct Pipeline {
    language: Language,
    trim: bool,
    filter_stop_words: bool,
    stem: bool,
    /// Reusable stemmer instance for the configured language
    stemmer: WordStemmer,
}

impl Pipeline {
    /// Full pipeline (trimmer, stop-word filter, stemmer) for `language`.
    pub fn new(language: Language) -> Self {
        Self::with_stages(
            language,
            &[
                PipelineStage::Trimmer,
                PipelineStage::StopWordFilter,
                PipelineStage::Stemmer,
            ],
        )
    }

    /// Pipeline running only `stages`. Stage order is always trimmer, filter, stemmer.
    pub fn with_stages(language: Language, stages: &[PipelineStage]) -> Self {
        Self {
            language,
            trim: stages.contains(&PipelineStage::Trimmer),
            filter_stop_words: stages.contains(&PipelineStage::StopWordFilter),
            stem: stages.contains(&PipelineStage::Stemmer),
            stemmer: language.word_stemmer(),
        }
    }

    pub const fn language(&self) -> Language {
        self.language
    }

    /// Enabled stages in execution order.
    pub fn stages(&self) -> Vec<PipelineStage> {
        [
            (self.trim, PipelineStage::Trimmer),
            (self.filter_stop_words, PipelineStage::StopWordFilter),
            (self.stem, PipelineStage::Stemmer),
        ]
        .into_iter()
        .filter_map(|(enabled, stage)| enabled.then_some(stage))
        .collect()
    }

    /// Lazily tokenize `text`. The returned iterator can be cloned to restart.
    pub fn tokens<'a>(&'a self, text: &'a str) -> Tokens<'a> {
        Tokens {
            pipeline: self,
            rest: text,
        }
    }

    /// Eagerly tokenize `text`.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokens(text).collect()
    }

    /// Run a single whitespace-delimited unit through the pipeline.
    ///
    /// Returns `None` when the unit trims to nothing, is longer than
    /// [`MAX_TOKEN_CHARS`], or is a stop word.
    ///
    /// Stop words are filtered before stemming, so a stem that is itself a
    /// stop word is indexed but never queryable by that spelling: "having"
    /// indexes as `have`, while the query "have" is dropped. Query "having".
    pub fn normalize(&self, unit: &str) -> Option<String> {
        let lowercase: String = unit.nfc().flat_map(char::to_lowercase).collect();
        let token = if self.trim {
            trim_token(&lowercase, self.language)
        } else {
            lowercase.as_str()
        };

        if token.is_empty() || token.chars().count() > MAX_TOKEN_CHARS {
            return None;
        }

        // Skip stop words
        if self.filter_stop_words && self.language.stop_words().contains(&token) {
            return None;
        }

        if self.stem {
            Some(self.stemmer.stem(token))
        } else {
            Some(token.to_owned())
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Self::from(PipelineSpec::from(self))
    }
}

impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        PipelineSpec::from(self) == PipelineSpec::from(other)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("language", &self.language)
            .field("stages", &self.stages())
            .finish()
    }
}

impl From<&Pipeline> for PipelineSpec {
    fn from(pipeline: &Pipeline) -> Self {
        Self {
            language: pipeline.language,
            stages: pipeline.stages(),
        }
    }
}

impl From<Pipeline> for PipelineSpec {
    fn from(pipeline: Pipeline) -> Self {
        Self::from(&pipeline)
    }
}

impl From<PipelineSpec> for Pipeline {
    fn from(spec: PipelineSpec) -> Self {
        Self::with_stages(spec.language, &spec.stages)
    }
}

/// Lazy token sequence produced by [`Pipeline::tokens`].
#[derive(Clone)]
pub struct Tokens<'a> {
    pipeline: &'a Pipeline,
    rest: &'a str,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let start = self.rest.find(|c: char| !is_separator(c))?;
            let rest = &self.rest[start..];
            let end = rest.find(is_separator).unwrap_or(rest.len());
            let (unit, tail) = rest.split_at(end);
            self.rest = tail;

            if let Some(token) = self.pipeline.normalize(unit) {
                return Some(token);
            }
        }
    }
}

/// Unit boundaries: whitespace and hyphens.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '-'
}

/// Strip leading and trailing characters outside the language's word class.
pub(crate) fn trim_token(token: &str, language: Language) -> &str {
    token.trim_matches(|c: char| !language.is_word_char(c))
}
