//! Similarity index
//!
//! Builds and caches embedding vectors for a candidate catalog and ranks
//! candidates against a query vector. Scoring is a brute-force cosine scan;
//! candidate sets are tens to low hundreds of entries, so a linear pass
//! beats any index structure worth maintaining.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::info;

use attrmap_core::{normalize, AttributeCatalog, CatalogId, Vector};

use crate::provider::EmbeddingProvider;

/// One candidate's cached embedding with its precomputed magnitude
#[derive(Debug, Clone)]
struct CandidateEmbedding {
    vector: Vector,
    norm: f32,
}

/// A candidate position in the catalog with its similarity score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub score: f32,
}

/// Ranks catalog candidates against query vectors
///
/// Embeddings are cached per catalog identity for the process lifetime;
/// cache entries are immutable once written, so a race that computes the
/// same entry twice writes identical content and is benign.
pub struct SimilarityIndex {
    provider: Arc<EmbeddingProvider>,
    cache: RwLock<AHashMap<CatalogId, Arc<Vec<CandidateEmbedding>>>>,
}

impl SimilarityIndex {
    pub fn new(provider: Arc<EmbeddingProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Ensure the catalog's embeddings are computed and cached
    ///
    /// Idempotent and re-entrant for the same catalog identity; recomputes
    /// only when the identity is not already cached. Returns `false` only
    /// when the embedding model is unavailable.
    pub fn prepare(&self, catalog: &AttributeCatalog) -> bool {
        if self.cache.read().contains_key(&catalog.id()) {
            return true;
        }

        // Candidates whose text normalizes to nothing keep a zero-magnitude
        // placeholder and are excluded from ranking.
        let mut texts = Vec::new();
        let mut slots = Vec::new();
        for (idx, candidate) in catalog.candidates().iter().enumerate() {
            let text = normalize(candidate.embedding_text());
            if !text.is_empty() {
                slots.push(idx);
                texts.push(text);
            }
        }

        let mut entries: Vec<CandidateEmbedding> = (0..catalog.len())
            .map(|_| CandidateEmbedding {
                vector: Vector::new(Vec::new()),
                norm: 0.0,
            })
            .collect();

        if texts.is_empty() {
            if !self.provider.is_available() {
                return false;
            }
        } else {
            let Some(vectors) = self.provider.embed_batch(&texts) else {
                return false;
            };
            for (slot, vector) in slots.into_iter().zip(vectors) {
                let norm = vector.norm();
                entries[slot] = CandidateEmbedding { vector, norm };
            }
        }

        info!(
            catalog = %catalog.id(),
            candidates = catalog.len(),
            "generated embeddings for catalog"
        );
        self.cache.write().insert(catalog.id(), Arc::new(entries));
        true
    }

    /// Score every cached candidate against the query vector, highest first
    ///
    /// Zero-magnitude candidate vectors are excluded rather than producing an
    /// undefined score. The sort is stable, so equal scores keep catalog
    /// order: first candidate wins ties. Scores are raw cosine values,
    /// never clamped or rescaled. Returns nothing for an unprepared catalog
    /// or a zero-magnitude query.
    pub fn rank(&self, catalog: &AttributeCatalog, query: &Vector) -> Vec<Scored> {
        let entries = self.cache.read().get(&catalog.id()).cloned();
        let Some(entries) = entries else {
            return Vec::new();
        };

        let query_norm = query.norm();
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<Scored> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.norm > 0.0)
            .map(|(index, entry)| Scored {
                index,
                score: query.dot(&entry.vector) / (query_norm * entry.norm),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// The single highest-scoring candidate, if any candidate is rankable
    pub fn best_match(&self, catalog: &AttributeCatalog, query: &Vector) -> Option<Scored> {
        self.rank(catalog, query).first().copied()
    }
}
