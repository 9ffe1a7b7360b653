//! Core types and traits for Stash
//!
//! This crate defines the foundational types used throughout the system:
//! - Document: capability contract for storable records, plus `TextDocument`
//! - Similarity: cosine scoring over precomputed magnitudes
//! - SearchResult: a ranked hit pointing at a shared document
//! - Error: error type hierarchy shared by storage and engine

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod search_types;
pub mod similarity;

pub use document::{Document, TextDocument};
pub use error::{Error, LoadError, Result};
pub use search_types::{SearchResult, DEFAULT_NUM_RESULTS};
pub use similarity::{cosine_similarity, dot_product, magnitude, try_cosine_similarity};

/// Document identifiers are random (v4) UUIDs.
pub use uuid::Uuid;
