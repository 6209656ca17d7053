//! Shared vocabulary types: indexed fields and per-field value maps.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An indexed document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Body,
    Breadcrumbs,
}

impl Field {
    /// Number of indexed fields.
    pub const COUNT: usize = 3;

    /// All fields in serialization order.
    pub const ALL: [Self; Self::COUNT] = [Self::Title, Self::Body, Self::Breadcrumbs];

    /// External name used in configuration and serialized indexes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Breadcrumbs => "breadcrumbs",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Title => 0,
            Self::Body => 1,
            Self::Breadcrumbs => 2,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title" => Ok(Self::Title),
            "body" => Ok(Self::Body),
            // "hierarchy" is what book configs call the breadcrumb trail
            "breadcrumbs" | "hierarchy" => Ok(Self::Breadcrumbs),
            other => Err(ConfigError::UnknownField(other.to_string())),
        }
    }
}

/// Ordinal of a document within an index's document store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DocRef(pub(crate) u32);

impl DocRef {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A fixed-size map from [`Field`] to a value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldMap<T>([T; Field::COUNT]);

impl<T: Copy> FieldMap<T> {
    pub fn splat(value: T) -> Self {
        Self([value; Field::COUNT])
    }

    pub fn get(&self, field: Field) -> T {
        self.0[field.slot()]
    }

    pub fn set(&mut self, field: Field, value: T) {
        self.0[field.slot()] = value;
    }

    /// Iterate `(field, value)` pairs in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, T)> + '_ {
        Field::ALL.into_iter().map(|field| (field, self.get(field)))
    }
}

/// Term frequencies of one token in one document, per field.
///
/// An absent field is stored as `0.0`; every present value is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TermFrequencies(FieldMap<f64>);

impl TermFrequencies {
    /// Frequency weight in `field`, or `None` when the token does not occur there.
    pub fn get(&self, field: Field) -> Option<f64> {
        let tf = self.0.get(field);
        (tf > 0.0).then_some(tf)
    }

    pub(crate) fn set(&mut self, field: Field, tf: f64) {
        self.0.set(field, tf);
    }

    /// Whether the token occurs in at least one field.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|(_, tf)| tf <= 0.0)
    }

    /// Iterate the fields the token occurs in.
    pub fn present(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        self.0.iter().filter(|(_, tf)| *tf > 0.0)
    }

    /// Every stored value is either zero (absent) or finite and positive.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.0.iter().all(|(_, tf)| tf == 0.0 || (tf.is_finite() && tf > 0.0))
    }
}
