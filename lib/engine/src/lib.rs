//! # attrmap Engine
//!
//! The resolution engine for attrmap: maps human-written property phrases
//! ("rebar size", "area netto") to stable machine attribute keys
//! ("SBSize_list", "AREA_NET").
//!
//! Resolution runs in priority order: normalized exact matching against
//! candidate keys, labels and aliases, then embedding similarity against a
//! configurable threshold. When no embedding model can be loaded the engine
//! degrades to exact matching only instead of failing.
//!
//! - [`EmbeddingProvider`] - process-wide lazily-initialized embedding model
//!   with a once-recorded degraded mode
//! - [`SimilarityIndex`] - per-catalog embedding cache and brute-force
//!   cosine ranking
//! - [`AttributeMapper`] - the end-to-end `resolve` pipeline; every query
//!   yields a [`MappingResult`], never an error
//! - [`MapperConfig`] - model id and threshold, loaded from JSON settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attrmap_core::{AttributeCandidate, AttributeCatalog};
//! use attrmap_engine::{AttributeMapper, EmbeddingProvider};
//!
//! let catalog = AttributeCatalog::new(vec![
//!     AttributeCandidate::new("SBSize_list")
//!         .with_description("Size of the reinforcement bar")
//!         .with_aliases(["rebar size", "bar size"]),
//! ]).unwrap();
//!
//! let provider = Arc::new(EmbeddingProvider::fastembed("all-minilm-l6-v2"));
//! let mapper = AttributeMapper::new(provider);
//!
//! let result = mapper.resolve("Rebar Size", &catalog, 0.6);
//! assert_eq!(result.matched_key.as_deref(), Some("SBSize_list"));
//! ```

pub mod config;
pub mod index;
pub mod mapper;
pub mod provider;

pub use config::MapperConfig;
pub use index::{Scored, SimilarityIndex};
pub use mapper::{AttributeMapper, MappedProperties, MappingResult, MatchReason};
pub use provider::{
    DisabledLoader, EmbeddingProvider, FastembedLoader, ModelLoader, TextEncoder,
};
