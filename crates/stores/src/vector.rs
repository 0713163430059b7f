use crate::embeddings::cosine_similarity;
use crate::error::{Result, StoreError};
use crate::traits::{VectorFilter, VectorHit, VectorStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

struct StoredVector {
    vector: Vec<f32>,
    metadata: Map<String, Value>,
}

/// Brute-force cosine index held in memory
pub struct InMemoryVectorStore {
    dimension: usize,
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(StoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn store(&self, id: &str, vector: Vec<f32>, metadata: Map<String, Value>) -> Result<()> {
        self.check_dimension(&vector)?;
        self.vectors
            .write()
            .await
            .insert(id.to_string(), StoredVector { vector, metadata });
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize, filter: &VectorFilter) -> Result<Vec<VectorHit>> {
        self.check_dimension(vector)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vectors = self.vectors.read().await;
        let mut scored: Vec<(&String, &StoredVector, f32)> = vectors
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.metadata))
            .map(|(id, stored)| (id, stored, cosine_similarity(vector, &stored.vector)))
            .filter(|(_, _, score)| *score > 0.0)
            .collect();

        // Ties by id keep results stable across HashMap orderings
        scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));
        scored.truncate(limit);

        log::debug!("Vector search: {} hits (limit {limit})", scored.len());
        Ok(scored
            .into_iter()
            .map(|(id, stored, score)| VectorHit {
                id: id.clone(),
                score: f64::from(score),
                metadata: stored.metadata.clone(),
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.vectors.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.vectors.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codectx_units::UnitType;
    use serde_json::json;

    fn meta(unit_type: &str) -> Map<String, Value> {
        json!({ "type": unit_type }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_store_and_search() {
        let store = InMemoryVectorStore::new(3);
        store.store("A", vec![1.0, 0.0, 0.0], meta("model")).await.unwrap();
        store.store("B", vec![0.9, 0.1, 0.0], meta("service")).await.unwrap();
        store.store("C", vec![0.0, 1.0, 0.0], meta("model")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 3);

        let hits = store
            .search(&[1.0, 0.0, 0.0], 2, &VectorFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "A");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, "B");
    }

    #[tokio::test]
    async fn test_type_filter() {
        let store = InMemoryVectorStore::new(2);
        store.store("A", vec![1.0, 0.0], meta("model")).await.unwrap();
        store.store("B", vec![1.0, 0.0], meta("service")).await.unwrap();

        let hits = store
            .search(&[1.0, 0.0], 10, &VectorFilter::unit_type(UnitType::Service))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "B");
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = InMemoryVectorStore::new(3);
        let result = store.store("A", vec![1.0, 0.0], Map::new()).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidDimension { expected: 3, actual: 2 })
        ));

        let result = store.search(&[1.0], 1, &VectorFilter::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_hits() {
        let store = InMemoryVectorStore::new(2);
        let hits = store
            .search(&[1.0, 0.0], 5, &VectorFilter::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_and_zero_queries_have_no_hits() {
        let store = InMemoryVectorStore::new(2);
        store.store("A", vec![1.0, 0.0], meta("model")).await.unwrap();
        store.store("B", vec![-1.0, 0.0], meta("model")).await.unwrap();

        let hits = store
            .search(&[0.0, 0.0], 5, &VectorFilter::default())
            .await
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .search(&[0.0, 1.0], 5, &VectorFilter::default())
            .await
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .search(&[1.0, 0.0], 5, &VectorFilter::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "A");
    }
}
