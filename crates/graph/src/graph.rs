use crate::types::{GraphNode, GraphStats};
use codectx_units::{Unit, UnitType};
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashSet, VecDeque};

/// Directed dependency graph over units.
///
/// Built by a single writer through [`DependencyGraph::register`], then shared
/// read-only. Whenever the unit set changes the graph is rebuilt from scratch
/// (see [`DependencyGraph::from_units`]) rather than patched, since units are
/// never deleted individually.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Identifier -> node, in registration order
    pub(crate) nodes: IndexMap<String, GraphNode>,

    /// Identifier -> identifiers it depends on
    pub(crate) edges: IndexMap<String, Vec<String>>,

    /// Identifier -> identifiers that depend on it
    pub(crate) reverse: IndexMap<String, Vec<String>>,

    /// File path -> identifier (last write wins)
    pub(crate) file_map: IndexMap<String, String>,

    /// Unit type -> identifiers in registration order
    pub(crate) type_index: IndexMap<UnitType, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh graph from a full unit set
    pub fn from_units<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let mut graph = Self::new();
        for unit in units {
            graph.register(unit);
        }
        log::info!(
            "Built dependency graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Insert or update a unit's node and edges.
    ///
    /// Idempotent per identifier: re-registering replaces the forward edges
    /// and drops reverse entries for targets no longer referenced.
    pub fn register(&mut self, unit: &Unit) {
        let id = unit.identifier.as_str();
        let node = GraphNode::from_unit(unit);

        if let Some(previous) = self.nodes.get(id) {
            if previous.unit_type != node.unit_type {
                if let Some(ids) = self.type_index.get_mut(&previous.unit_type) {
                    ids.shift_remove(id);
                }
            }
            if previous.file_path != node.file_path {
                if let Some(old_path) = &previous.file_path {
                    if self.file_map.get(old_path).map(String::as_str) == Some(id) {
                        self.file_map.shift_remove(old_path);
                    }
                }
            }
        }

        self.type_index
            .entry(node.unit_type.clone())
            .or_default()
            .insert(id.to_string());
        if let Some(path) = &node.file_path {
            self.file_map.insert(path.clone(), id.to_string());
        }
        self.nodes.insert(id.to_string(), node);

        let mut targets: Vec<String> = Vec::with_capacity(unit.dependencies.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(unit.dependencies.len());
        for target in unit.dependency_targets() {
            if target != id && seen.insert(target) {
                targets.push(target.to_string());
            }
        }

        if let Some(stale) = self.edges.get(id) {
            let stale: Vec<String> = stale
                .iter()
                .filter(|t| !seen.contains(t.as_str()))
                .cloned()
                .collect();
            for target in stale {
                self.unlink_reverse(&target, id);
            }
        }

        for target in &targets {
            let dependents = self.reverse.entry(target.clone()).or_default();
            if !dependents.iter().any(|d| d == id) {
                dependents.push(id.to_string());
            }
        }
        self.edges.insert(id.to_string(), targets);
    }

    fn unlink_reverse(&mut self, target: &str, source: &str) {
        if let Some(dependents) = self.reverse.get_mut(target) {
            dependents.retain(|d| d != source);
            if dependents.is_empty() {
                self.reverse.shift_remove(target);
            }
        }
    }

    /// Identifiers `id` depends on; empty for unknown identifiers
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Identifiers that depend on `id`; empty for unknown identifiers
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Identifiers of a type, in registration order
    pub fn units_of_type(&self, unit_type: &UnitType) -> Vec<&str> {
        self.type_index
            .get(unit_type)
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn node_exists(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// First registered identifier ending in `"::" + suffix`.
    ///
    /// Bare identifiers without a namespace separator never match, so a
    /// lookup for `"User"` does not return a top-level `"User"` node.
    pub fn find_node_by_suffix(&self, suffix: &str) -> Option<&str> {
        let needle = format!("::{suffix}");
        self.nodes
            .keys()
            .find(|id| id.ends_with(&needle))
            .map(String::as_str)
    }

    /// Identifier registered for a file path
    pub fn unit_for_file(&self, path: &str) -> Option<&str> {
        self.file_map.get(path).map(String::as_str)
    }

    /// Blast radius of a change.
    ///
    /// Breadth-first over reverse edges from the units registered for the
    /// changed files. Returns every reached identifier (seeds included) in
    /// discovery order. `max_depth = None` means unbounded.
    pub fn affected_by<S: AsRef<str>>(
        &self,
        changed_files: &[S],
        max_depth: Option<usize>,
    ) -> Vec<String> {
        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();

        for file in changed_files {
            if let Some(id) = self.file_map.get(file.as_ref()) {
                if visited.insert(id.as_str()) {
                    queue.push_back((id.as_str(), 0));
                }
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for dependent in self.dependents_of(current) {
                if visited.insert(dependent.as_str()) {
                    queue.push_back((dependent.as_str(), depth + 1));
                }
            }
        }

        log::debug!(
            "Blast radius of {} files: {} units",
            changed_files.len(),
            visited.len()
        );
        visited.into_iter().map(str::to_string).collect()
    }

    /// Registered identifiers in registration order
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            ..Default::default()
        };
        for (unit_type, ids) in &self.type_index {
            if !ids.is_empty() {
                *stats.types.entry(unit_type.to_string()).or_insert(0) += ids.len();
            }
        }
        stats
    }
}
