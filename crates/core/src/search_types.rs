//! Search result types
//!
//! Results are built fresh for every search call and never persisted.

use std::sync::Arc;

use uuid::Uuid;

use crate::document::Document;

/// Number of results returned when the caller does not ask for a specific count.
pub const DEFAULT_NUM_RESULTS: usize = 10;

/// A ranked search hit.
///
/// `document` is shared with the collection; holding a result keeps the
/// document alive even if it is later removed from the collection.
#[derive(Debug)]
pub struct SearchResult<D: Document> {
    /// Id of the matched document
    pub id: Uuid,
    /// The matched document (read-only view)
    pub document: Arc<D>,
    /// Cosine similarity to the query (higher = more similar)
    pub score: f32,
}

impl<D: Document> Clone for SearchResult<D> {
    fn clone(&self) -> Self {
        SearchResult {
            id: self.id,
            document: Arc::clone(&self.document),
            score: self.score,
        }
    }
}

impl<D: Document> SearchResult<D> {
    /// Build a result from a stored document and its score.
    pub fn new(document: Arc<D>, score: f32) -> Self {
        SearchResult {
            id: document.id(),
            document,
            score,
        }
    }
}
