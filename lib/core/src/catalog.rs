//! Attribute catalog data model
//!
//! A catalog is an ordered, immutable set of attribute candidates built once
//! per source. It carries a content-derived identity used as a cache key by
//! the similarity layer, and a normalized exact-match index over every
//! candidate's key, label and aliases.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::normalize::normalize;
use crate::{Error, Result};

/// Expected value type of an attribute, as declared by its definitions source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    Character,
}

impl DataType {
    /// Parse a definitions-file type column (`INTEGER`, `FLOAT`, `CHARACTER`).
    /// Unknown type names fall back to `Character`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => DataType::Integer,
            "FLOAT" => DataType::Float,
            _ => DataType::Character,
        }
    }

    /// Coerce a JSON value to this type
    ///
    /// Integers truncate through f64 (so `"10.0"` coerces to `10`); values
    /// that cannot be converted are rendered as strings rather than rejected.
    pub fn coerce(self, value: &Value) -> Value {
        match self {
            DataType::Integer => match as_f64(value) {
                Some(f) => Value::from(f as i64),
                None => Value::String(render(value)),
            },
            DataType::Float => match as_f64(value).and_then(serde_json::Number::from_f64) {
                Some(n) => Value::Number(n),
                None => Value::String(render(value)),
            },
            DataType::Character => Value::String(render(value)),
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One named, described attribute that a query can be mapped onto
///
/// Immutable once loaded. `aliases` are literal synonyms that match exactly
/// (after normalization); `data_type` and `unit` carry the definitions-file
/// metadata used when converting matched values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeCandidate {
    /// Stable identifier, unique within a catalog
    pub key: String,
    /// Short display name
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AttributeCandidate {
    /// Create a candidate whose label defaults to its key
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            description: None,
            aliases: Vec::new(),
            data_type: None,
            unit: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// The text embedded to represent this candidate: the description when
    /// present, else the label, else the key
    pub fn embedding_text(&self) -> &str {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d,
            _ if !self.label.is_empty() => &self.label,
            _ => &self.key,
        }
    }

    fn hash_content(&self, hasher: &mut impl Hasher) {
        self.key.hash(hasher);
        self.label.hash(hasher);
        self.description.hash(hasher);
        self.aliases.hash(hasher);
        self.data_type.hash(hasher);
        self.unit.hash(hasher);
    }
}

/// Content-derived identity of a catalog, used as a cache key
///
/// Stable within a process run for identical candidate content; two catalogs
/// built from the same source hash to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogId(u64);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Ordered, immutable set of attribute candidates considered for one
/// resolution call
#[derive(Debug, Clone)]
pub struct AttributeCatalog {
    id: CatalogId,
    candidates: Vec<AttributeCandidate>,
    exact_index: AHashMap<String, usize>,
}

impl AttributeCatalog {
    /// Build a catalog from candidates
    ///
    /// Duplicate keys are dropped, first occurrence wins. Fails with
    /// [`Error::EmptyCatalog`] when no candidates remain; an empty catalog
    /// signals a configuration problem upstream.
    pub fn new(candidates: Vec<AttributeCandidate>) -> Result<Self> {
        let mut kept: Vec<AttributeCandidate> = Vec::with_capacity(candidates.len());
        let mut seen: AHashSet<String> = AHashSet::with_capacity(candidates.len());
        for candidate in candidates {
            if seen.insert(candidate.key.clone()) {
                kept.push(candidate);
            }
        }

        if kept.is_empty() {
            return Err(Error::EmptyCatalog("no candidates supplied".to_string()));
        }

        let mut hasher = DefaultHasher::new();
        let mut exact_index = AHashMap::new();
        for (idx, candidate) in kept.iter().enumerate() {
            candidate.hash_content(&mut hasher);

            // key, label and every alias match exactly; first candidate wins
            // on collisions, matching catalog order
            let mut terms = vec![candidate.key.as_str(), candidate.label.as_str()];
            terms.extend(candidate.aliases.iter().map(String::as_str));
            for term in terms {
                let normalized = normalize(term);
                if !normalized.is_empty() {
                    exact_index.entry(normalized).or_insert(idx);
                }
            }
        }

        Ok(Self {
            id: CatalogId(hasher.finish()),
            candidates: kept,
            exact_index,
        })
    }

    pub fn id(&self) -> CatalogId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[AttributeCandidate] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&AttributeCandidate> {
        self.candidates.get(index)
    }

    /// Look up an already-normalized query against the exact-match index
    /// (keys, labels and aliases, all compared in normalized form)
    pub fn exact_match(&self, normalized_query: &str) -> Option<&AttributeCandidate> {
        self.exact_index
            .get(normalized_query)
            .map(|&idx| &self.candidates[idx])
    }

    /// Look up a candidate by its exact key
    pub fn by_key(&self, key: &str) -> Option<&AttributeCandidate> {
        self.candidates.iter().find(|c| c.key == key)
    }
}
