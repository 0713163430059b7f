//! JSON snapshot of a dependency graph.
//!
//! Every key is optional on read; a missing key restores as empty. The
//! reverse map is re-derived from `edges` so a hand-edited or truncated
//! snapshot cannot break the forward/reverse invariant.

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::types::{GraphNode, GraphStats};
use codectx_units::UnitType;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialized form of a [`DependencyGraph`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: IndexMap<String, SnapshotNode>,

    #[serde(default)]
    pub edges: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub reverse: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub file_map: IndexMap<String, String>,

    #[serde(default)]
    pub type_index: IndexMap<String, Vec<String>>,

    #[serde(default)]
    pub stats: GraphStats,
}

/// Node entry inside a snapshot (identifier is the map key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(rename = "type", default = "unknown_type")]
    pub unit_type: UnitType,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,
}

fn unknown_type() -> UnitType {
    UnitType::Other("unknown".to_string())
}

impl DependencyGraph {
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| {
                    (
                        id.clone(),
                        SnapshotNode {
                            unit_type: node.unit_type.clone(),
                            file_path: node.file_path.clone(),
                            namespace: node.namespace.clone(),
                        },
                    )
                })
                .collect(),
            edges: self.edges.clone(),
            reverse: self.reverse.clone(),
            file_map: self.file_map.clone(),
            type_index: self
                .type_index
                .iter()
                .filter(|(_, ids)| !ids.is_empty())
                .map(|(t, ids)| (t.to_string(), ids.iter().cloned().collect()))
                .collect(),
            stats: self.stats(),
        }
    }

    /// Restore a graph from a snapshot.
    ///
    /// Type strings are parsed back into [`UnitType`]. The type index is
    /// rebuilt from the nodes, and the reverse map from `edges`, keeping the
    /// snapshot's dependent ordering where it agrees with the edges.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let GraphSnapshot {
            nodes,
            edges,
            reverse: stored_reverse,
            file_map,
            ..
        } = snapshot;

        let mut graph = Self::new();

        for (id, node) in nodes {
            graph
                .type_index
                .entry(node.unit_type.clone())
                .or_default()
                .insert(id.clone());
            graph.nodes.insert(
                id.clone(),
                GraphNode {
                    identifier: id,
                    unit_type: node.unit_type,
                    file_path: node.file_path,
                    namespace: node.namespace,
                },
            );
        }

        let mut derived: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for (source, targets) in &edges {
            for target in targets {
                derived
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }

        for (target, stored) in stored_reverse {
            if let Some(expected) = derived.get(&target) {
                let mut ordered: Vec<String> = stored
                    .into_iter()
                    .filter(|source| expected.contains(source))
                    .collect();
                for source in expected {
                    if !ordered.contains(source) {
                        ordered.push(source.clone());
                    }
                }
                graph.reverse.insert(target, ordered);
            }
        }
        for (target, sources) in derived {
            if !graph.reverse.contains_key(&target) {
                graph.reverse.insert(target, sources.into_iter().collect());
            }
        }

        graph.edges = edges;

        graph.file_map = file_map;
        for (id, node) in &graph.nodes {
            if let Some(path) = &node.file_path {
                if !graph.file_map.contains_key(path) {
                    graph.file_map.insert(path.clone(), id.clone());
                }
            }
        }

        log::debug!(
            "Restored graph snapshot: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the snapshot to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved graph snapshot to {}", path.display());
        Ok(())
    }

    /// Load a snapshot written by [`DependencyGraph::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codectx_units::Unit;
    use pretty_assertions::assert_eq;

    fn sample() -> DependencyGraph {
        DependencyGraph::from_units(&[
            Unit::new("User", UnitType::Model).file_path("app/models/user.rb"),
            Unit::new("Order", UnitType::Model)
                .file_path("app/models/order.rb")
                .depends_on("User"),
            Unit::new("Admin::OrdersController", UnitType::Controller)
                .namespace("Admin")
                .depends_on("Order")
                .depends_on("User"),
        ])
    }

    #[test]
    fn json_restores_typed_graph() {
        let graph = sample();
        let restored = DependencyGraph::from_json(&graph.to_json().unwrap()).unwrap();

        assert_eq!(restored.node("Order").unwrap().unit_type, UnitType::Model);
        assert_eq!(restored.units_of_type(&UnitType::Controller), ["Admin::OrdersController"]);
        assert_eq!(restored.dependents_of("User"), ["Order", "Admin::OrdersController"]);
        assert_eq!(restored.unit_for_file("app/models/order.rb"), Some("Order"));
        assert_eq!(restored.stats(), graph.stats());
    }

    #[test]
    fn missing_keys_restore_empty() {
        let graph = DependencyGraph::from_json("{}").unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn reverse_is_derived_when_absent() {
        let json = r#"{
            "nodes": {"Order": {"type": "model"}, "User": {"type": ":model"}},
            "edges": {"Order": ["User"], "User": []}
        }"#;
        let graph = DependencyGraph::from_json(json).unwrap();
        assert_eq!(graph.dependents_of("User"), ["Order"]);
        assert_eq!(graph.units_of_type(&UnitType::Model), ["Order", "User"]);
    }

    #[test]
    fn stale_reverse_entries_are_dropped() {
        let json = r#"{
            "nodes": {"Order": {"type": "model"}},
            "edges": {"Order": []},
            "reverse": {"User": ["Order"]}
        }"#;
        let graph = DependencyGraph::from_json(json).unwrap();
        assert!(graph.dependents_of("User").is_empty());
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");

        let graph = sample();
        graph.save(&path).unwrap();
        let loaded = DependencyGraph::load(&path).unwrap();
        assert_eq!(loaded.node_count(), 3);
        assert_eq!(loaded.dependencies_of("Admin::OrdersController"), ["Order", "User"]);
    }
}
