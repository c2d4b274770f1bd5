//! Attribute mapper
//!
//! The end-to-end resolution algorithm: normalize, try the exact/alias fast
//! path, fall back to embedding similarity, apply the confidence threshold.
//! Every query yields a [`MappingResult`]; no failure mode escapes this
//! boundary as an error.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use attrmap_core::{normalize, AttributeCatalog, Vector};

use crate::index::SimilarityIndex;
use crate::provider::EmbeddingProvider;

/// Why a resolution ended the way it did
///
/// Callers should distinguish "no match found" (`BelowThreshold`) from
/// "matching unavailable" (`NoModelAvailable`) so operators can tell
/// configuration problems apart from legitimately novel property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchReason {
    ExactAlias,
    EmbeddingAboveThreshold,
    BelowThreshold,
    NoModelAvailable,
}

/// Outcome of resolving one query against a catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingResult {
    pub query: String,
    pub normalized_query: String,
    pub matched: bool,
    pub reason: MatchReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_key: Option<String>,
    /// Similarity of the best-scoring candidate: 1.0 for exact matches,
    /// 0.0 when nothing was scored
    pub score: f32,
    /// Best-scoring candidate even when unmatched, so callers can surface
    /// "closest but not confident" feedback instead of silently dropping it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest_key: Option<String>,
}

impl MappingResult {
    fn unmatched(query: &str, normalized_query: String, reason: MatchReason) -> Self {
        Self {
            query: query.to_string(),
            normalized_query,
            matched: false,
            reason,
            matched_key: None,
            score: 0.0,
            closest_key: None,
        }
    }
}

/// Result of mapping a whole property object in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedProperties {
    /// Resolved keys with values coerced to each candidate's declared type
    pub mapped: Map<String, Value>,
    /// Input keys that resolved to nothing, in input order
    pub unmapped_keys: Vec<String>,
    /// Per-key resolution outcomes, in input order
    pub results: Vec<MappingResult>,
}

/// Resolves human-written property phrases to stable attribute keys
///
/// Holds the process-wide caches: candidate embeddings per catalog identity
/// (via [`SimilarityIndex`]) and query embeddings per normalized query text.
/// Both grow without bound, which is acceptable at expected call volume;
/// entries are immutable once written.
pub struct AttributeMapper {
    provider: Arc<EmbeddingProvider>,
    index: SimilarityIndex,
    query_cache: RwLock<AHashMap<String, Vector>>,
}

impl AttributeMapper {
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self {
            index: SimilarityIndex::new(provider.clone()),
            provider,
            query_cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Resolve a query against a catalog
    ///
    /// Priority order: empty query, then normalized exact match on key/label/
    /// alias (score 1.0, works in degraded mode), then embedding similarity
    /// against the threshold. The threshold is inclusive: a score equal to it
    /// matches. Deterministic for a fixed model, catalog and threshold.
    pub fn resolve(&self, query: &str, catalog: &AttributeCatalog, threshold: f32) -> MappingResult {
        let normalized = normalize(query);
        if normalized.is_empty() {
            debug!(query, "query normalized to nothing");
            return MappingResult::unmatched(query, normalized, MatchReason::BelowThreshold);
        }

        if let Some(candidate) = catalog.exact_match(&normalized) {
            debug!(query, key = %candidate.key, "normalized exact match");
            return MappingResult {
                query: query.to_string(),
                normalized_query: normalized,
                matched: true,
                reason: MatchReason::ExactAlias,
                matched_key: Some(candidate.key.clone()),
                score: 1.0,
                closest_key: Some(candidate.key.clone()),
            };
        }

        if !self.index.prepare(catalog) {
            return MappingResult::unmatched(query, normalized, MatchReason::NoModelAvailable);
        }
        let Some(query_vector) = self.embed_query(&normalized) else {
            return MappingResult::unmatched(query, normalized, MatchReason::NoModelAvailable);
        };

        let ranked = self.index.rank(catalog, &query_vector);
        if !ranked.is_empty() {
            let top = ranked
                .iter()
                .take(5)
                .map(|s| format!("{} ({:.2})", catalog.candidates()[s.index].key, s.score))
                .collect::<Vec<_>>()
                .join(", ");
            debug!(query, "top matches: [{top}]");
        }

        let Some(best) = ranked.first() else {
            return MappingResult::unmatched(query, normalized, MatchReason::BelowThreshold);
        };
        let best_key = catalog.candidates()[best.index].key.clone();

        if best.score >= threshold {
            debug!(query, key = %best_key, score = best.score, "embedding match");
            MappingResult {
                query: query.to_string(),
                normalized_query: normalized,
                matched: true,
                reason: MatchReason::EmbeddingAboveThreshold,
                matched_key: Some(best_key.clone()),
                score: best.score,
                closest_key: Some(best_key),
            }
        } else {
            debug!(
                query,
                key = %best_key,
                score = best.score,
                threshold,
                "best candidate below threshold"
            );
            MappingResult {
                query: query.to_string(),
                normalized_query: normalized,
                matched: false,
                reason: MatchReason::BelowThreshold,
                matched_key: None,
                score: best.score,
                closest_key: Some(best_key),
            }
        }
    }

    /// Map a user-supplied property object to catalog keys
    ///
    /// Resolves every key, coerces each value to the matched candidate's
    /// declared data type, and reports unmapped keys rather than dropping
    /// them.
    pub fn map_properties(
        &self,
        properties: &Map<String, Value>,
        catalog: &AttributeCatalog,
        threshold: f32,
    ) -> MappedProperties {
        let mut mapped = Map::new();
        let mut unmapped_keys = Vec::new();
        let mut results = Vec::with_capacity(properties.len());

        for (user_key, value) in properties {
            let result = self.resolve(user_key, catalog, threshold);
            match &result.matched_key {
                Some(key) => {
                    let converted = catalog
                        .by_key(key)
                        .and_then(|c| c.data_type)
                        .map(|dt| dt.coerce(value))
                        .unwrap_or_else(|| value.clone());
                    debug!(user_key = %user_key, key = %key, score = result.score, "mapped property");
                    mapped.insert(key.clone(), converted);
                }
                None => {
                    warn!(user_key = %user_key, "no match found for property key");
                    unmapped_keys.push(user_key.clone());
                }
            }
            results.push(result);
        }

        info!(
            mapped = mapped.len(),
            unmapped = unmapped_keys.len(),
            "mapped properties"
        );
        MappedProperties {
            mapped,
            unmapped_keys,
            results,
        }
    }

    fn embed_query(&self, normalized: &str) -> Option<Vector> {
        if let Some(vector) = self.query_cache.read().get(normalized) {
            return Some(vector.clone());
        }
        let vector = self.provider.embed(normalized)?;
        self.query_cache
            .write()
            .insert(normalized.to_string(), vector.clone());
        Some(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelLoader, TextEncoder};
    use attrmap_core::{AttributeCandidate, DataType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TableEncoder {
        table: Vec<(&'static str, Vec<f32>)>,
        encodes: Arc<AtomicUsize>,
    }

    impl TextEncoder for TableEncoder {
        fn encode(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vector>> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let data = self
                        .table
                        .iter()
                        .find(|(k, _)| k == t)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| vec![0.0, 0.0]);
                    Vector::new(data)
                })
                .collect())
        }
    }

    struct TableLoader {
        table: Vec<(&'static str, Vec<f32>)>,
        encodes: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
    }

    impl ModelLoader for TableLoader {
        fn describe(&self) -> String {
            "table-stub".to_string()
        }

        fn load(&self) -> anyhow::Result<Box<dyn TextEncoder>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TableEncoder {
                table: self.table.clone(),
                encodes: self.encodes.clone(),
            }))
        }
    }

    struct Counters {
        encodes: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
    }

    fn mapper_with(table: Vec<(&'static str, Vec<f32>)>) -> (AttributeMapper, Counters) {
        let encodes = Arc::new(AtomicUsize::new(0));
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(EmbeddingProvider::new(Box::new(TableLoader {
            table,
            encodes: encodes.clone(),
            loads: loads.clone(),
        })));
        (AttributeMapper::new(provider), Counters { encodes, loads })
    }

    fn rebar_catalog() -> AttributeCatalog {
        AttributeCatalog::new(vec![
            AttributeCandidate::new("SBSize_list")
                .with_description("Size of the reinforcement bar")
                .with_aliases(["rebar size", "bar size"])
                .with_data_type(DataType::Integer),
            AttributeCandidate::new("SBGrade_list")
                .with_description("Steel grade of the reinforcement bar")
                .with_aliases(["rebar grade"])
                .with_data_type(DataType::Character),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_alias_after_normalization() {
        let (mapper, counters) = mapper_with(vec![]);
        let result = mapper.resolve("Rebar Size", &rebar_catalog(), 0.6);

        assert!(result.matched);
        assert_eq!(result.reason, MatchReason::ExactAlias);
        assert_eq!(result.matched_key.as_deref(), Some("SBSize_list"));
        assert_eq!(result.score, 1.0);
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0, "fast path skips the model");
    }

    #[test]
    fn test_exact_alias_beats_any_embedding_score() {
        // embeddings would point the alias text at the wrong candidate
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![0.0, 1.0]),
            ("steel grade of the reinforcement bar", vec![1.0, 0.0]),
            ("bar size", vec![1.0, 0.0]),
        ]);
        let result = mapper.resolve("bar size", &rebar_catalog(), 0.1);

        assert_eq!(result.reason, MatchReason::ExactAlias);
        assert_eq!(result.matched_key.as_deref(), Some("SBSize_list"));
    }

    #[test]
    fn test_embedding_match_above_threshold() {
        let s = (1.0f32 - 0.72 * 0.72).sqrt();
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 0.0]),
            ("steel grade of the reinforcement bar", vec![0.0, 1.0]),
            ("reinforcement bar diameter", vec![0.72, s]),
        ]);
        let result = mapper.resolve("reinforcement bar diameter", &rebar_catalog(), 0.6);

        assert!(result.matched);
        assert_eq!(result.reason, MatchReason::EmbeddingAboveThreshold);
        assert_eq!(result.matched_key.as_deref(), Some("SBSize_list"));
        assert!((result.score - 0.72).abs() < 1e-4);
    }

    #[test]
    fn test_below_threshold_reports_closest() {
        let s = (1.0f32 - 0.31 * 0.31).sqrt();
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 0.0]),
            ("steel grade of the reinforcement bar", vec![-1.0, 0.0]),
            ("concrete strength class", vec![0.31, s]),
        ]);
        let result = mapper.resolve("concrete strength class", &rebar_catalog(), 0.6);

        assert!(!result.matched);
        assert_eq!(result.reason, MatchReason::BelowThreshold);
        assert_eq!(result.matched_key, None);
        assert_eq!(result.closest_key.as_deref(), Some("SBSize_list"));
        assert!((result.score - 0.31).abs() < 1e-4);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // score and threshold are both exactly 1/sqrt(2)
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 1.0]),
            ("steel grade of the reinforcement bar", vec![-1.0, 0.0]),
            ("bar gauge", vec![1.0, 0.0]),
        ]);
        let threshold = 1.0 / 2.0f32.sqrt();
        let result = mapper.resolve("bar gauge", &rebar_catalog(), threshold);

        assert!(result.matched, "score equal to threshold must match");
        assert_eq!(result.reason, MatchReason::EmbeddingAboveThreshold);
    }

    #[test]
    fn test_empty_query_short_circuits() {
        let (mapper, counters) = mapper_with(vec![]);
        for query in ["", "   ", "__--", "!?."] {
            let result = mapper.resolve(query, &rebar_catalog(), 0.6);
            assert!(!result.matched);
            assert_eq!(result.reason, MatchReason::BelowThreshold);
            assert_eq!(result.score, 0.0);
        }
        assert_eq!(counters.loads.load(Ordering::SeqCst), 0, "no model work for empty queries");
    }

    #[test]
    fn test_degraded_mode_only_exact_matches() {
        let provider = Arc::new(EmbeddingProvider::disabled());
        let mapper = AttributeMapper::new(provider);
        let catalog = rebar_catalog();

        let exact = mapper.resolve("rebar size", &catalog, 0.6);
        assert!(exact.matched);
        assert_eq!(exact.reason, MatchReason::ExactAlias);

        let semantic = mapper.resolve("reinforcement bar diameter", &catalog, 0.6);
        assert!(!semantic.matched);
        assert_eq!(semantic.reason, MatchReason::NoModelAvailable);
        assert_eq!(semantic.closest_key, None);
    }

    #[test]
    fn test_deterministic_for_fixed_inputs() {
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 0.2]),
            ("steel grade of the reinforcement bar", vec![0.3, 1.0]),
            ("bar thickness", vec![0.9, 0.1]),
        ]);
        let catalog = rebar_catalog();
        let first = mapper.resolve("bar thickness", &catalog, 0.6);
        let second = mapper.resolve("bar thickness", &catalog, 0.6);
        assert_eq!(first, second);
    }

    #[test]
    fn test_query_cache_avoids_reencoding() {
        let (mapper, counters) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 0.0]),
            ("steel grade of the reinforcement bar", vec![0.0, 1.0]),
            ("bar thickness", vec![0.9, 0.1]),
        ]);
        let catalog = rebar_catalog();

        mapper.resolve("bar thickness", &catalog, 0.6);
        // one batch for the catalog, one for the query
        assert_eq!(counters.encodes.load(Ordering::SeqCst), 2);

        mapper.resolve("Bar  Thickness", &catalog, 0.6);
        assert_eq!(
            counters.encodes.load(Ordering::SeqCst),
            2,
            "normalized repeat must hit the query cache"
        );
    }

    #[test]
    fn test_map_properties_converts_and_reports() {
        let (mapper, _) = mapper_with(vec![
            ("size of the reinforcement bar", vec![1.0, 0.0]),
            ("steel grade of the reinforcement bar", vec![0.0, 1.0]),
            ("how thick is the bar", vec![0.95, 0.1]),
            ("favourite colour", vec![0.1, -0.99]),
        ]);
        let catalog = rebar_catalog();

        let mut properties = Map::new();
        properties.insert("how thick is the bar".to_string(), json!("10.0"));
        properties.insert("rebar grade".to_string(), json!(500));
        properties.insert("favourite colour".to_string(), json!("green"));

        let outcome = mapper.map_properties(&properties, &catalog, 0.6);

        assert_eq!(outcome.mapped.get("SBSize_list"), Some(&json!(10)));
        assert_eq!(outcome.mapped.get("SBGrade_list"), Some(&json!("500")));
        assert_eq!(outcome.unmapped_keys, vec!["favourite colour".to_string()]);
        assert_eq!(outcome.results.len(), 3);
    }
}
