use crate::error::Result;
use crate::traits::GraphStore;
use async_trait::async_trait;
use codectx_graph::DependencyGraph;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
impl GraphStore for DependencyGraph {
    async fn dependencies_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(DependencyGraph::dependencies_of(self, id).to_vec())
    }

    async fn dependents_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(DependencyGraph::dependents_of(self, id).to_vec())
    }
}

/// Graph store over a published, read-only graph.
///
/// Reindexing swaps in a freshly built graph; readers holding the previous
/// `Arc` keep a consistent view until they drop it.
pub struct SharedGraphStore {
    graph: RwLock<Arc<DependencyGraph>>,
}

impl SharedGraphStore {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }

    /// Currently published graph
    pub async fn current(&self) -> Arc<DependencyGraph> {
        Arc::clone(&*self.graph.read().await)
    }

    /// Publish a rebuilt graph
    pub async fn replace(&self, graph: Arc<DependencyGraph>) {
        log::debug!("Publishing graph with {} nodes", graph.node_count());
        *self.graph.write().await = graph;
    }
}

impl Default for SharedGraphStore {
    fn default() -> Self {
        Self::new(Arc::new(DependencyGraph::new()))
    }
}

#[async_trait]
impl GraphStore for SharedGraphStore {
    async fn dependencies_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.graph.read().await.dependencies_of(id).to_vec())
    }

    async fn dependents_of(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.graph.read().await.dependents_of(id).to_vec())
    }
}
