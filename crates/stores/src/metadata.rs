use crate::error::Result;
use crate::traits::MetadataStore;
use async_trait::async_trait;
use codectx_units::{Unit, UnitType};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Identifiers in first-insertion order
    order: Vec<String>,
    units: HashMap<String, Unit>,
}

/// Unit store held in memory.
///
/// Text search is a case-insensitive substring match; units whose
/// identifier matches come first, then those matching only by namespace,
/// file path or source, each group in insertion order.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_other_fields(unit: &Unit, needle: &str) -> bool {
    let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));
    contains(unit.effective_namespace())
        || contains(unit.file_path.as_deref())
        || contains(unit.source_code.as_deref())
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn store(&self, unit: Unit) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.units.contains_key(&unit.identifier) {
            inner.order.push(unit.identifier.clone());
        }
        inner.units.insert(unit.identifier.clone(), unit);
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Unit>> {
        Ok(self.inner.read().await.units.get(id).cloned())
    }

    async fn find_batch(&self, ids: &[String]) -> Result<HashMap<String, Unit>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.units.get(id).map(|u| (id.clone(), u.clone())))
            .collect())
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Unit>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().await;
        let mut by_identifier = Vec::new();
        let mut by_other = Vec::new();
        for id in &inner.order {
            let Some(unit) = inner.units.get(id) else {
                continue;
            };
            if unit.identifier.to_lowercase().contains(&needle) {
                by_identifier.push(unit);
            } else if matches_other_fields(unit, &needle) {
                by_other.push(unit);
            }
        }

        let hits: Vec<Unit> = by_identifier
            .into_iter()
            .chain(by_other)
            .take(limit)
            .cloned()
            .collect();
        log::debug!("Metadata search '{needle}': {} hits", hits.len());
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.units.len())
    }

    async fn find_by_type(&self, unit_type: &UnitType) -> Result<Vec<Unit>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.units.get(id))
            .filter(|unit| unit.unit_type == *unit_type)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = Inner::default();
        Ok(())
    }
}
