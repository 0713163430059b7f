use crate::error::Result;
use async_trait::async_trait;
use codectx_units::{Unit, UnitType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Nearest-neighbour hit from a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Optional constraints on a vector search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorFilter {
    /// Only return vectors whose `metadata.type` equals this type
    pub unit_type: Option<UnitType>,
}

impl VectorFilter {
    pub fn unit_type(unit_type: UnitType) -> Self {
        Self {
            unit_type: Some(unit_type),
        }
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match &self.unit_type {
            None => true,
            Some(wanted) => metadata
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| UnitType::from(t) == *wanted),
        }
    }
}

/// Similarity search over unit embeddings
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store(&self, id: &str, vector: Vec<f32>, metadata: Map<String, Value>) -> Result<()>;

    /// Top `limit` hits by similarity, best first
    async fn search(&self, vector: &[f32], limit: usize, filter: &VectorFilter) -> Result<Vec<VectorHit>>;

    async fn len(&self) -> Result<usize>;

    /// Drop every stored vector
    async fn clear(&self) -> Result<()>;
}

/// Unit lookup and text search
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn store(&self, unit: Unit) -> Result<()>;

    /// Exact identifier lookup; `None` when absent
    async fn find(&self, id: &str) -> Result<Option<Unit>>;

    /// Batched lookup; missing identifiers are omitted from the map
    async fn find_batch(&self, ids: &[String]) -> Result<HashMap<String, Unit>>;

    /// Free-text search, best matches first
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Unit>>;

    async fn count(&self) -> Result<usize>;

    async fn find_by_type(&self, unit_type: &UnitType) -> Result<Vec<Unit>>;

    /// Drop every stored unit
    async fn clear(&self) -> Result<()>;
}

/// Dependency adjacency lookups
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn dependencies_of(&self, id: &str) -> Result<Vec<String>>;

    async fn dependents_of(&self, id: &str) -> Result<Vec<String>>;
}

/// Text to vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize;
}
