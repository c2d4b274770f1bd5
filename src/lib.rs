//! # attrmap
//!
//! Resolves human-written property phrases to stable machine attribute keys.
//!
//! A query like "rebar size" or "area netto" is matched against a catalog of
//! attribute candidates (key, label, description, aliases) in two stages:
//! normalized exact matching first, then embedding similarity with a
//! configurable confidence threshold. When no embedding model is available
//! the engine degrades to exact matching instead of failing.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! attrmap --definitions contentattributes.lis "area netto" "rebar size"
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attrmap::prelude::*;
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
//! assert!(result.matched);
//! ```
//!
//! ## Crate Structure
//!
//! attrmap is composed of two crates:
//!
//! - [`attrmap-core`](https://docs.rs/attrmap-core) - catalogs, text
//!   normalization, vector math, definitions-file loading
//! - [`attrmap-engine`](https://docs.rs/attrmap-engine) - embedding provider,
//!   similarity index, the resolution pipeline
//!
//! ## Features
//!
//! - **Exact/alias fast path**: normalized comparison against keys, labels
//!   and aliases, no model required
//! - **Embedding similarity**: pretrained sentence embeddings via fastembed,
//!   brute-force cosine ranking with an inclusive threshold
//! - **Degraded mode**: exact matching keeps working when the model cannot
//!   be loaded; outcomes say so explicitly
//! - **Partial catalog loading**: malformed definition records are skipped
//!   with diagnostics, not fatal

// Re-export core types
pub use attrmap_core::{
    normalize, AttributeCandidate, AttributeCatalog, CatalogId, CatalogLoader, ColumnarParser,
    DataType, Diagnostic, Error, LoadReport, Parsed, RecordParser, Result, Vector,
};

// Re-export engine
pub use attrmap_engine::{
    AttributeMapper, DisabledLoader, EmbeddingProvider, FastembedLoader, MappedProperties,
    MapperConfig, MappingResult, MatchReason, ModelLoader, Scored, SimilarityIndex, TextEncoder,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        normalize, AttributeCandidate, AttributeCatalog, AttributeMapper, CatalogId,
        CatalogLoader, DataType, EmbeddingProvider, Error, MappedProperties, MapperConfig,
        MappingResult, MatchReason, Result, SimilarityIndex, Vector,
    };
}
