use crate::embeddings::{embedding_text, HashEmbedder, DEFAULT_DIMENSION};
use crate::error::{Result, StoreError};
use crate::graph_store::SharedGraphStore;
use crate::metadata::InMemoryMetadataStore;
use crate::traits::{EmbeddingProvider, GraphStore, MetadataStore, VectorStore};
use crate::vector::InMemoryVectorStore;
use codectx_graph::DependencyGraph;
use codectx_units::Unit;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const VECTOR_ADAPTERS: &[&str] = &["memory"];
const METADATA_ADAPTERS: &[&str] = &["memory"];
const GRAPH_ADAPTERS: &[&str] = &["memory"];
const EMBEDDING_ADAPTERS: &[&str] = &["hash"];

/// Adapter selection per store role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub vector: String,
    pub metadata: String,
    pub graph: String,
    pub embedding: String,

    /// Embedding dimension shared by the embedder and the vector store
    pub dimension: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            vector: "memory".to_string(),
            metadata: "memory".to_string(),
            graph: "memory".to_string(),
            embedding: "hash".to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.dimension == 0 {
            return Err("dimension must be > 0".to_string());
        }
        Ok(())
    }
}

fn check_adapter(role: &'static str, value: &str, valid: &[&str]) -> Result<()> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(StoreError::UnknownAdapter {
            role,
            value: value.to_string(),
            valid: valid.join(", "),
        })
    }
}

/// Wires concrete adapters from a [`StoreConfig`]
pub struct StoreBuilder {
    config: StoreConfig,
}

impl StoreBuilder {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Build every store, failing on the first unknown adapter name
    pub fn build(self) -> Result<StoreSet> {
        let config = self.config;
        config.validate().map_err(StoreError::InvalidConfig)?;

        check_adapter("vector", &config.vector, VECTOR_ADAPTERS)?;
        check_adapter("metadata", &config.metadata, METADATA_ADAPTERS)?;
        check_adapter("graph", &config.graph, GRAPH_ADAPTERS)?;
        check_adapter("embedding", &config.embedding, EMBEDDING_ADAPTERS)?;

        log::info!(
            "Building stores: vector={}, metadata={}, graph={}, embedding={} (dim {})",
            config.vector,
            config.metadata,
            config.graph,
            config.embedding,
            config.dimension
        );

        Ok(StoreSet {
            vector: Arc::new(InMemoryVectorStore::new(config.dimension)),
            metadata: Arc::new(InMemoryMetadataStore::new()),
            graph: Arc::new(SharedGraphStore::default()),
            embedder: Arc::new(HashEmbedder::new(config.dimension)),
        })
    }
}

/// One adapter per store role
#[derive(Clone)]
pub struct StoreSet {
    pub vector: Arc<dyn VectorStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub graph: Arc<SharedGraphStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl StoreSet {
    pub fn graph_store(&self) -> Arc<dyn GraphStore> {
        self.graph.clone()
    }

    /// Load a full unit set: rebuild the graph, annotate importance, store
    /// metadata and embeddings, then publish the graph.
    ///
    /// Replaces whatever a previous call indexed.
    pub async fn index_units(&self, mut units: Vec<Unit>) -> Result<Arc<DependencyGraph>> {
        let graph = DependencyGraph::from_units(&units);
        graph.annotate_importance(&mut units);

        let texts: Vec<String> = units.iter().map(embedding_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.embedder.embed_batch(&text_refs).await?;

        self.vector.clear().await?;
        self.metadata.clear().await?;
        for (unit, vector) in units.into_iter().zip(vectors) {
            self.vector
                .store(&unit.identifier, vector, vector_metadata(&unit))
                .await?;
            self.metadata.store(unit).await?;
        }

        let graph = Arc::new(graph);
        self.graph.replace(Arc::clone(&graph)).await;
        log::info!(
            "Indexed {} units ({} dependencies)",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

fn vector_metadata(unit: &Unit) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("type".to_string(), unit.unit_type.as_str().into());
    if let Some(path) = &unit.file_path {
        metadata.insert("file_path".to_string(), path.as_str().into());
    }
    metadata
}
