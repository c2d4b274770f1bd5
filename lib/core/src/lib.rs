//! # attrmap Core
//!
//! Core library for the attrmap attribute-resolution engine.
//!
//! This crate provides the dependency-light building blocks:
//!
//! - [`Vector`] - Dense embedding vector with cosine similarity
//! - [`normalize`] - Canonicalization applied to queries and candidate terms
//! - [`AttributeCandidate`] / [`AttributeCatalog`] - Immutable candidate catalogs
//!   with content-derived identity and a normalized exact-match index
//! - [`CatalogLoader`] - Line-oriented definitions-file parsing with
//!   per-record diagnostics
//!
//! ## Example
//!
//! ```rust
//! use attrmap_core::{AttributeCandidate, AttributeCatalog, normalize};
//!
//! let catalog = AttributeCatalog::new(vec![
//!     AttributeCandidate::new("SBSize_list")
//!         .with_description("Size of the reinforcement bar")
//!         .with_aliases(["rebar size", "bar size"]),
//! ]).unwrap();
//!
//! let candidate = catalog.exact_match(&normalize("Rebar Size")).unwrap();
//! assert_eq!(candidate.key, "SBSize_list");
//! ```

pub mod catalog;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod vector;

pub use catalog::{AttributeCandidate, AttributeCatalog, CatalogId, DataType};
pub use error::{Error, Result};
pub use loader::{CatalogLoader, ColumnarParser, Diagnostic, LoadReport, Parsed, RecordParser};
pub use normalize::normalize;
pub use vector::Vector;
