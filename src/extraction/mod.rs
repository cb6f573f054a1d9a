//! Field extraction from recognized text
//!
//! Each field has an ordered list of rules: label-anchored patterns first,
//! then shape and proximity fallbacks. The first rule that yields a non-empty
//! value wins; if none does, the field is left out. Nothing is ever filled in
//! with a placeholder.

pub mod colors;
pub mod normalize;
pub mod registration;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use normalize::{clean_alphanumeric, collapse_whitespace, fold_diacritics};
pub use rules::{Document, Haystack, Matcher, Rule, RuleSet};

/// Structured fields read from a registration certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Vin,
    EngineNumber,
    LicensePlate,
    Brand,
    Color,
    OwnerName,
    Address,
    RegistrationDate,
}

impl Field {
    /// All fields in form order
    pub const ALL: [Field; 8] = [
        Field::Vin,
        Field::EngineNumber,
        Field::LicensePlate,
        Field::Brand,
        Field::Color,
        Field::OwnerName,
        Field::Address,
        Field::RegistrationDate,
    ];

    /// Serialized (camelCase) name
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Vin => "vin",
            Field::EngineNumber => "engineNumber",
            Field::LicensePlate => "licensePlate",
            Field::Brand => "brand",
            Field::Color => "color",
            Field::OwnerName => "ownerName",
            Field::Address => "address",
            Field::RegistrationDate => "registrationDate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a value was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Read right after its printed label
    Labeled,
    /// Guessed from shape, dictionary or proximity; the user should double-check
    Heuristic,
}

/// A single extracted value with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedValue {
    pub value: String,
    pub source: FieldSource,
    /// Name of the rule that produced the value
    pub rule: String,
}

/// Partial field set produced by the extractor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    values: BTreeMap<Field, ExtractedValue>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: ExtractedValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&ExtractedValue> {
        self.values.get(&field)
    }

    /// Value text for a field, if extracted
    pub fn value(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(|v| v.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &ExtractedValue)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

impl IntoIterator for ExtractedFields {
    type Item = (Field, ExtractedValue);
    type IntoIter = std::collections::btree_map::IntoIter<Field, ExtractedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
