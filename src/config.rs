//! Search configuration: boolean mode, field boosts, limits and scoring options.
//!
//! A [`SearchConfig`] is an explicit, immutable value handed to the query engine
//! when it is constructed. Configuration files are read into a permissive
//! [`RawSearchConfig`] first and converted with full validation, so every
//! structural problem surfaces as a [`ConfigError`] before any query runs.

use crate::error::ConfigError;
use crate::types::{Field, FieldMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default number of results returned per query.
pub const DEFAULT_LIMIT: usize = 30;

/// Default teaser length in words.
pub const DEFAULT_TEASER_WORDS: usize = 30;

/// Default weight factor for prefix-expanded keys.
pub const DEFAULT_EXPANSION_PENALTY: f64 = 0.15;

/// How per-token candidate sets combine for multi-token queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoolMode {
    /// A document must match every query token.
    #[default]
    #[serde(rename = "AND")]
    And,
    /// A document must match at least one query token.
    #[serde(rename = "OR")]
    Or,
}

impl fmt::Display for BoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

impl FromStr for BoolMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(ConfigError::UnknownBoolMode(s.to_string())),
        }
    }
}

/// Optional scoring ingredients layered on top of the boosted `tf` sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringOptions {
    /// Multiply by `1 + ln(N / (df + 1))`.
    pub idf: bool,
    /// Multiply by `1 / sqrt(field length)`.
    pub field_length_norm: bool,
    /// Weight factor in `[0, 1]` for prefix-expanded keys. Zero keeps only exact keys.
    pub expansion_penalty: f64,
    /// Multiply by the share of query tokens the document matched.
    pub coordination: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            idf: false,
            field_length_norm: false,
            expansion_penalty: DEFAULT_EXPANSION_PENALTY,
            coordination: false,
        }
    }
}

/// Validated search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub bool_mode: BoolMode,
    /// Match every indexed token that starts with a query token
    pub expand: bool,
    pub boosts: FieldMap<f64>,
    pub limit: usize,
    /// Words of body text per teaser; 0 disables teasers
    pub teaser_word_count: usize,
    pub scoring: ScoringOptions,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut boosts = FieldMap::splat(1.0);
        boosts.set(Field::Title, 2.0);
        Self {
            bool_mode: BoolMode::And,
            expand: true,
            boosts,
            limit: DEFAULT_LIMIT,
            teaser_word_count: DEFAULT_TEASER_WORDS,
            scoring: ScoringOptions::default(),
        }
    }
}

impl SearchConfig {
    /// Check structural validity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::NonPositiveLimit(0));
        }
        for (field, boost) in self.boosts.iter() {
            if !boost.is_finite() || boost < 0.0 {
                return Err(ConfigError::InvalidBoost {
                    field: field.to_string(),
                    boost,
                });
            }
        }
        let penalty = self.scoring.expansion_penalty;
        if !(0.0..=1.0).contains(&penalty) {
            return Err(ConfigError::InvalidExpansionPenalty(penalty));
        }
        Ok(())
    }

    /// Parse and validate a TOML configuration document.
    ///
    /// ```toml
    /// bool = "OR"
    /// expand = false
    /// limit-results = 10
    /// teaser-word-count = 20
    ///
    /// [fields.title]
    /// boost = 3
    ///
    /// [scoring]
    /// idf = true
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawSearchConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn boost(&self, field: Field) -> f64 {
        self.boosts.get(field)
    }

    /// Convert back into the raw form, for writing configuration blocks.
    pub fn to_raw(&self) -> RawSearchConfig {
        RawSearchConfig {
            bool: Some(self.bool_mode.to_string()),
            expand: Some(self.expand),
            fields: Some(
                self.boosts
                    .iter()
                    .map(|(field, boost)| {
                        (
                            field.to_string(),
                            RawFieldOptions { boost: Some(boost) },
                        )
                    })
                    .collect(),
            ),
            limit_results: Some(self.limit as i64),
            teaser_word_count: Some(self.teaser_word_count as i64),
            scoring: Some(RawScoring {
                idf: Some(self.scoring.idf),
                field_length_norm: Some(self.scoring.field_length_norm),
                expansion_penalty: Some(self.scoring.expansion_penalty),
                coordination: Some(self.scoring.coordination),
            }),
        }
    }
}

/// Unvalidated configuration as written in files. Missing keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, RawFieldOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_results: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teaser_word_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<RawScoring>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFieldOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawScoring {
    pub idf: Option<bool>,
    pub field_length_norm: Option<bool>,
    pub expansion_penalty: Option<f64>,
    pub coordination: Option<bool>,
}

impl TryFrom<RawSearchConfig> for SearchConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSearchConfig) -> Result<Self, Self::Error> {
        let mut config = Self::default();

        if let Some(mode) = raw.bool {
            config.bool_mode = mode.parse()?;
        }
        if let Some(expand) = raw.expand {
            config.expand = expand;
        }
        for (name, options) in raw.fields.into_iter().flatten() {
            let field: Field = name.parse()?;
            if let Some(boost) = options.boost {
                config.boosts.set(field, boost);
            }
        }
        if let Some(limit) = raw.limit_results {
            config.limit = usize::try_from(limit)
                .ok()
                .filter(|&limit| limit > 0)
                .ok_or(ConfigError::NonPositiveLimit(limit))?;
        }
        if let Some(words) = raw.teaser_word_count {
            config.teaser_word_count =
                usize::try_from(words).map_err(|_| ConfigError::NegativeTeaserLength(words))?;
        }
        if let Some(scoring) = raw.scoring {
            let options = &mut config.scoring;
            options.idf = scoring.idf.unwrap_or(options.idf);
            options.field_length_norm = scoring
                .field_length_norm
                .unwrap_or(options.field_length_norm);
            options.expansion_penalty = scoring
                .expansion_penalty
                .unwrap_or(options.expansion_penalty);
            options.coordination = scoring.coordination.unwrap_or(options.coordination);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[test]
    fn test_defaults_match_generated_configuration() {
        let config = SearchConfig::default();
        check!(config.bool_mode == BoolMode::And);
        check!(config.expand);
        check!(config.boost(Field::Title) == 2.0);
        check!(config.boost(Field::Body) == 1.0);
        check!(config.boost(Field::Breadcrumbs) == 1.0);
        check!(config.limit == 30);
        check!(config.teaser_word_count == 30);
        check!(config.validate().is_ok());
    }

    #[rstest]
    #[case("AND", BoolMode::And)]
    #[case("or", BoolMode::Or)]
    #[case(" Or ", BoolMode::Or)]
    fn test_bool_mode_parsing(#[case] input: &str, #[case] expected: BoolMode) {
        check!(input.parse::<BoolMode>() == Ok(expected));
    }

    #[test]
    fn test_from_toml() {
        let config = SearchConfig::from_toml_str(
            r#"
            bool = "OR"
            expand = false
            limit-results = 5
            teaser-word-count = 0

            [fields.title]
            boost = 4

            [fields.hierarchy]
            boost = 0.5

            [scoring]
            idf = true
            expansion-penalty = 0.5
            "#,
        )
        .unwrap();

        check!(config.bool_mode == BoolMode::Or);
        check!(!config.expand);
        check!(config.limit == 5);
        check!(config.teaser_word_count == 0);
        check!(config.boost(Field::Title) == 4.0);
        check!(config.boost(Field::Breadcrumbs) == 0.5);
        check!(config.boost(Field::Body) == 1.0);
        check!(config.scoring.idf);
        check!(!config.scoring.field_length_norm);
        check!(config.scoring.expansion_penalty == 0.5);
    }

    #[rstest]
    #[case("limit-results = 0", ConfigError::NonPositiveLimit(0))]
    #[case("limit-results = -3", ConfigError::NonPositiveLimit(-3))]
    #[case(r#"bool = "XOR""#, ConfigError::UnknownBoolMode("XOR".into()))]
    #[case("[fields.summary]\nboost = 1", ConfigError::UnknownField("summary".into()))]
    #[case("teaser-word-count = -1", ConfigError::NegativeTeaserLength(-1))]
    #[case("[scoring]\nexpansion-penalty = 2.0", ConfigError::InvalidExpansionPenalty(2.0))]
    fn test_invalid_configuration(#[case] source: &str, #[case] expected: ConfigError) {
        check!(SearchConfig::from_toml_str(source) == Err(expected));
    }

    #[test]
    fn test_negative_boost_rejected() {
        let result = SearchConfig::from_toml_str("[fields.body]\nboost = -1");
        let_assert!(Err(ConfigError::InvalidBoost { field, .. }) = result);
        check!(field == "body");
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let result = SearchConfig::from_toml_str("limit = 3");
        check!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_raw_round_trip() {
        let mut config = SearchConfig::default();
        config.bool_mode = BoolMode::Or;
        config.scoring.coordination = true;
        let restored = SearchConfig::try_from(config.to_raw()).unwrap();
        check!(restored == config);
    }
}
