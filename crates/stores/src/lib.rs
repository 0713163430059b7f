//! # codectx stores
//!
//! Storage roles consumed by the retrieval pipeline, plus in-memory
//! reference adapters.
//!
//! ## Architecture
//!
//! ```text
//! StoreConfig { vector, metadata, graph, embedding }
//!     │
//!     └──> StoreBuilder ──> StoreSet
//!            ├─ VectorStore       (InMemoryVectorStore, brute-force cosine)
//!            ├─ MetadataStore     (InMemoryMetadataStore)
//!            ├─ GraphStore        (SharedGraphStore over Arc<DependencyGraph>)
//!            └─ EmbeddingProvider (HashEmbedder)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codectx_stores::{StoreBuilder, StoreConfig};
//! use codectx_units::{Unit, UnitType};
//!
//! #[tokio::main]
//! async fn main() -> codectx_stores::Result<()> {
//!     let stores = StoreBuilder::new(StoreConfig::default()).build()?;
//!     let graph = stores
//!         .index_units(vec![Unit::new("User", UnitType::Model)])
//!         .await?;
//!     println!("{} units indexed", graph.node_count());
//!     Ok(())
//! }
//! ```

mod builder;
mod embeddings;
mod error;
mod graph_store;
mod metadata;
mod traits;
mod vector;

pub use builder::{StoreBuilder, StoreConfig, StoreSet};
pub use embeddings::{cosine_similarity, embedding_text, HashEmbedder, DEFAULT_DIMENSION};
pub use error::{Result, StoreError};
pub use graph_store::SharedGraphStore;
pub use metadata::InMemoryMetadataStore;
pub use traits::{EmbeddingProvider, GraphStore, MetadataStore, VectorFilter, VectorHit, VectorStore};
pub use vector::InMemoryVectorStore;
