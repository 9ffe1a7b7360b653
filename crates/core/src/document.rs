//! Document model
//!
//! A collection stores values implementing [`Document`]: something with a
//! stable id, an embedding, and the embedding's precomputed magnitude. The
//! engine never looks at anything else, so payload fields are free-form.
//!
//! [`TextDocument`] is the default record type: a text payload plus an
//! optional metadata map.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::similarity::magnitude;

/// Capability contract for records stored in a collection.
///
/// Implementations must keep `magnitude()` equal to the Euclidean norm of
/// `embedding()`; search relies on it instead of recomputing per query.
/// No constraint is placed on embedding length.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable unique identifier
    fn id(&self) -> Uuid;

    /// Embedding vector
    fn embedding(&self) -> &[f32];

    /// Euclidean norm of `embedding()`
    fn magnitude(&self) -> f32;
}

/// Default document: text payload, embedding, metadata.
///
/// The magnitude is not serialized; it is recomputed from the embedding on
/// construction, on `set_embedding`, and on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TextDocumentRepr")]
pub struct TextDocument {
    id: Uuid,
    text: String,
    embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(skip)]
    magnitude: f32,
}

#[derive(Deserialize)]
struct TextDocumentRepr {
    id: Uuid,
    #[serde(default)]
    text: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

impl From<TextDocumentRepr> for TextDocument {
    fn from(repr: TextDocumentRepr) -> Self {
        let mut doc = TextDocument::with_id(repr.id, repr.text, repr.embedding);
        doc.metadata = repr.metadata;
        doc
    }
}

impl TextDocument {
    /// Create a document with a freshly generated id.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self::with_id(Uuid::new_v4(), text, embedding)
    }

    /// Create a document with a caller-supplied id.
    pub fn with_id(id: Uuid, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        let magnitude = magnitude(&embedding);
        TextDocument {
            id,
            text: text.into(),
            embedding,
            metadata: BTreeMap::new(),
            magnitude,
        }
    }

    /// Builder-style metadata insertion.
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text payload
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text payload.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Metadata map
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Look up a single metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Replace the embedding and recompute the magnitude.
    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.magnitude = magnitude(&embedding);
        self.embedding = embedding;
    }
}

impl Document for TextDocument {
    fn id(&self) -> Uuid {
        self.id
    }

    fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    fn magnitude(&self) -> f32 {
        self.magnitude
    }
}
