//! Read-only structural analysis of a dependency graph.
//!
//! ```text
//! DependencyGraph ──> petgraph projection ──> cycles / bridges
//!        │
//!        └──────────> adjacency maps ──────> orphans / dead ends / hubs
//! ```

use crate::graph::DependencyGraph;
use crate::types::GraphStats;
use codectx_units::UnitType;
use once_cell::sync::OnceCell;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Analyzer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Hubs returned by [`GraphAnalyzer::analyze`]
    pub hub_limit: usize,

    /// Bridges returned by [`GraphAnalyzer::analyze`]
    pub bridge_limit: usize,

    /// Node pairs sampled for betweenness
    pub bridge_sample_size: usize,

    /// Types that are roots by nature and never reported as orphans
    pub root_types: Vec<UnitType>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            hub_limit: 20,
            bridge_limit: 20,
            bridge_sample_size: 200,
            root_types: vec![
                UnitType::RailsSource,
                UnitType::GemSource,
                UnitType::Route,
                UnitType::Migration,
                UnitType::Controller,
                UnitType::Job,
                UnitType::Mailer,
            ],
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bridge_sample_size == 0 && self.bridge_limit > 0 {
            return Err("bridge_sample_size must be > 0 when bridges are requested".to_string());
        }
        Ok(())
    }
}

/// Node ranked by how many units depend on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEntry {
    pub identifier: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub dependent_count: usize,
    pub dependents: Vec<String>,
}

/// Node ranked by sampled shortest-path credit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeEntry {
    pub identifier: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub score: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub orphan_count: usize,
    pub dead_end_count: usize,
    pub hub_count: usize,
    pub cycle_count: usize,
    pub bridge_count: usize,
    #[serde(flatten)]
    pub graph: GraphStats,
}

/// Bundled output of [`GraphAnalyzer::analyze`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub orphans: Vec<String>,
    pub dead_ends: Vec<String>,
    pub hubs: Vec<HubEntry>,
    pub cycles: Vec<Vec<String>>,
    pub bridges: Vec<BridgeEntry>,
    pub stats: AnalysisStats,
}

/// Arena projection of the registered nodes
struct Projection<'a> {
    graph: DiGraph<&'a str, ()>,
    index: HashMap<&'a str, NodeIndex>,
}

/// Structural analysis over a borrowed graph.
///
/// Holds no mutable state apart from per-instance memoization, so one
/// analyzer per caller is cheap and a shared graph can be analyzed from
/// several threads at once.
pub struct GraphAnalyzer<'a> {
    graph: &'a DependencyGraph,
    config: AnalyzerConfig,
    projection: OnceCell<Projection<'a>>,
    cycles: OnceCell<Vec<Vec<String>>>,
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self::with_config(graph, AnalyzerConfig::default())
    }

    pub fn with_config(graph: &'a DependencyGraph, config: AnalyzerConfig) -> Self {
        Self {
            graph,
            config,
            projection: OnceCell::new(),
            cycles: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn projection(&self) -> &Projection<'a> {
        self.projection.get_or_init(|| {
            let mut graph = DiGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
            let mut index = HashMap::with_capacity(self.graph.node_count());
            for id in self.graph.identifiers() {
                index.insert(id, graph.add_node(id));
            }
            for id in self.graph.identifiers() {
                let from = index[id];
                for target in self.graph.dependencies_of(id) {
                    if let Some(&to) = index.get(target.as_str()) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
            Projection { graph, index }
        })
    }

    /// Nodes nobody depends on, excluding naturally-root types
    pub fn orphans(&self) -> Vec<String> {
        self.graph
            .nodes()
            .filter(|node| !self.config.root_types.contains(&node.unit_type))
            .filter(|node| self.graph.dependents_of(&node.identifier).is_empty())
            .map(|node| node.identifier.clone())
            .collect()
    }

    /// Nodes without outgoing dependencies
    pub fn dead_ends(&self) -> Vec<String> {
        self.graph
            .identifiers()
            .filter(|id| self.graph.dependencies_of(id).is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Most depended-on nodes, ties broken by identifier
    pub fn hubs(&self, limit: usize) -> Vec<HubEntry> {
        let mut hubs: Vec<HubEntry> = self
            .graph
            .nodes()
            .filter_map(|node| {
                let dependents = self.graph.dependents_of(&node.identifier);
                (!dependents.is_empty()).then(|| HubEntry {
                    identifier: node.identifier.clone(),
                    unit_type: node.unit_type.clone(),
                    dependent_count: dependents.len(),
                    dependents: dependents.to_vec(),
                })
            })
            .collect();
        hubs.sort_by(|a, b| {
            b.dependent_count
                .cmp(&a.dependent_count)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        hubs.truncate(limit);
        hubs
    }

    /// All distinct dependency cycles.
    ///
    /// Each cycle starts at its lexicographically smallest node and repeats
    /// it at the end, e.g. `["A", "B", "A"]`.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        self.cycles.get_or_init(|| self.find_cycles()).clone()
    }

    fn find_cycles(&self) -> Vec<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<&str, Color> =
            self.graph.identifiers().map(|id| (id, Color::White)).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        for start in self.graph.identifiers() {
            if color.get(start) != Some(&Color::White) {
                continue;
            }

            // (node, next child position)
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            let mut path: Vec<&str> = vec![start];
            color.insert(start, Color::Gray);

            while let Some((node, child)) = stack.last_mut() {
                let deps = self.graph.dependencies_of(node);
                if *child >= deps.len() {
                    color.insert(*node, Color::Black);
                    stack.pop();
                    path.pop();
                    continue;
                }
                let next = deps[*child].as_str();
                *child += 1;

                match color.get(next).copied() {
                    Some(Color::White) => {
                        color.insert(next, Color::Gray);
                        stack.push((next, 0));
                        path.push(next);
                    }
                    Some(Color::Gray) => {
                        if let Some(pos) = path.iter().position(|n| *n == next) {
                            let cycle = canonical_cycle(&path[pos..]);
                            if seen.insert(cycle.join("->")) {
                                cycles.push(cycle);
                            }
                        }
                    }
                    // Black, or an unregistered target
                    _ => {}
                }
            }
        }

        cycles.sort();
        log::debug!("Found {} dependency cycles", cycles.len());
        cycles
    }

    /// Sampled betweenness centrality.
    ///
    /// Draws up to `sample_size` distinct ordered node pairs, finds one
    /// shortest forward path per pair and credits each interior node. All
    /// pairs are used when the sample would cover them anyway.
    pub fn bridges(&self, limit: usize, sample_size: usize) -> Vec<BridgeEntry> {
        let n = self.graph.node_count();
        if n < 3 || limit == 0 || sample_size == 0 {
            return Vec::new();
        }

        let projection = self.projection();
        let ids: Vec<&str> = self.graph.identifiers().collect();
        let pairs = sample_pairs(n, sample_size, self.sampling_seed());

        let mut credit: HashMap<&str, usize> = HashMap::new();
        for (from, to) in pairs {
            let start = projection.index[ids[from]];
            let goal = projection.index[ids[to]];
            if let Some((_, path)) = astar(&projection.graph, start, |node| node == goal, |_| 1usize, |_| 0) {
                if path.len() > 2 {
                    for node in &path[1..path.len() - 1] {
                        *credit.entry(projection.graph[*node]).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut bridges: Vec<BridgeEntry> = credit
            .into_iter()
            .filter_map(|(id, score)| {
                self.graph.node(id).map(|node| BridgeEntry {
                    identifier: id.to_string(),
                    unit_type: node.unit_type.clone(),
                    score,
                })
            })
            .collect();
        bridges.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.identifier.cmp(&b.identifier)));
        bridges.truncate(limit);
        bridges
    }

    /// Seed derived from the graph's identifier set, so equal graphs sample
    /// identically and graphs of equal size do not.
    fn sampling_seed(&self) -> u64 {
        let mut ids: Vec<&str> = self.graph.identifiers().collect();
        ids.sort_unstable();
        let mut hasher = Sha256::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(seed)
    }

    /// Run every analysis with the configured limits
    pub fn analyze(&self) -> AnalysisReport {
        let orphans = self.orphans();
        let dead_ends = self.dead_ends();
        let hubs = self.hubs(self.config.hub_limit);
        let cycles = self.cycles();
        let bridges = self.bridges(self.config.bridge_limit, self.config.bridge_sample_size);

        let stats = AnalysisStats {
            orphan_count: orphans.len(),
            dead_end_count: dead_ends.len(),
            hub_count: hubs.len(),
            cycle_count: cycles.len(),
            bridge_count: bridges.len(),
            graph: self.graph.stats(),
        };
        log::info!(
            "Analyzed graph: {} orphans, {} dead ends, {} cycles, {} bridges",
            stats.orphan_count,
            stats.dead_end_count,
            stats.cycle_count,
            stats.bridge_count
        );

        AnalysisReport {
            orphans,
            dead_ends,
            hubs,
            cycles,
            bridges,
            stats,
        }
    }
}

/// Rotate a loop to start at its smallest node and close it
fn canonical_cycle(nodes: &[&str]) -> Vec<String> {
    let start = nodes
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map_or(0, |(i, _)| i);
    let mut cycle: Vec<String> = nodes[start..]
        .iter()
        .chain(&nodes[..start])
        .map(|n| n.to_string())
        .collect();
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }
    cycle
}

/// Distinct ordered pairs `(from, to)` with `from != to`
fn sample_pairs(n: usize, sample_size: usize, seed: u64) -> Vec<(usize, usize)> {
    let total = n * (n - 1);
    if sample_size >= total {
        return (0..n)
            .flat_map(|from| (0..n).filter(move |to| *to != from).map(move |to| (from, to)))
            .collect();
    }

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut chosen: HashSet<(usize, usize)> = HashSet::with_capacity(sample_size);
    let mut pairs = Vec::with_capacity(sample_size);
    let max_attempts = sample_size.saturating_mul(20);
    let mut attempts = 0;
    while pairs.len() < sample_size && attempts < max_attempts {
        attempts += 1;
        let from = rng.usize(0..n);
        let to = rng.usize(0..n);
        if from != to && chosen.insert((from, to)) {
            pairs.push((from, to));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use codectx_units::Unit;
    use pretty_assertions::assert_eq;

    fn model(id: &str, deps: &[&str]) -> Unit {
        deps.iter()
            .fold(Unit::new(id, UnitType::Model), |u, d| u.depends_on(*d))
    }

    #[test]
    fn two_node_cycle_reported_once() {
        let graph = DependencyGraph::from_units(&[model("B", &["A"]), model("A", &["B"])]);
        let analyzer = GraphAnalyzer::new(&graph);
        assert_eq!(analyzer.cycles(), vec![vec!["A", "B", "A"]]);
    }

    #[test]
    fn rotated_cycles_collapse() {
        let graph = DependencyGraph::from_units(&[
            model("C", &["A"]),
            model("A", &["B"]),
            model("B", &["C"]),
            model("D", &["B"]),
        ]);
        let cycles = GraphAnalyzer::new(&graph).cycles();
        assert_eq!(cycles, vec![vec!["A", "B", "C", "A"]]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let graph = DependencyGraph::from_units(&[model("A", &["B"]), model("B", &["C"]), model("C", &[])]);
        assert!(GraphAnalyzer::new(&graph).cycles().is_empty());
    }

    #[test]
    fn orphans_skip_root_types() {
        let graph = DependencyGraph::from_units(&[
            model("User", &[]),
            model("Order", &["User"]),
            Unit::new("OrdersController", UnitType::Controller).depends_on("Order"),
            Unit::new("ActiveRecord::Base", UnitType::RailsSource),
        ]);
        let analyzer = GraphAnalyzer::new(&graph);
        assert!(analyzer.orphans().is_empty());
        assert_eq!(analyzer.dead_ends(), ["User", "ActiveRecord::Base"]);
    }

    #[test]
    fn hubs_sorted_by_dependents() {
        let graph = DependencyGraph::from_units(&[
            model("User", &[]),
            model("Account", &[]),
            model("Order", &["User", "Account"]),
            model("Invoice", &["User"]),
        ]);
        let hubs = GraphAnalyzer::new(&graph).hubs(5);
        assert_eq!(hubs.len(), 2);
        assert_eq!(hubs[0].identifier, "User");
        assert_eq!(hubs[0].dependent_count, 2);
        assert_eq!(hubs[0].dependents, ["Order", "Invoice"]);
        assert_eq!(hubs[1].identifier, "Account");
    }

    #[test]
    fn bridges_empty_below_three_nodes() {
        let graph = DependencyGraph::from_units(&[model("A", &["B"]), model("B", &[])]);
        assert!(GraphAnalyzer::new(&graph).bridges(10, 100).is_empty());
    }

    #[test]
    fn chain_middle_is_bridge() {
        let graph = DependencyGraph::from_units(&[
            model("Controller", &["Service"]),
            model("Service", &["Repository"]),
            model("Repository", &[]),
        ]);
        let bridges = GraphAnalyzer::new(&graph).bridges(10, 100);
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].identifier, "Service");
        assert_eq!(bridges[0].score, 1);
    }

    #[test]
    fn sampled_bridges_are_reproducible() {
        let units: Vec<Unit> = (0..30)
            .map(|i| {
                let deps: Vec<String> = (i + 1..(i + 3).min(30)).map(|j| format!("N{j:02}")).collect();
                deps.iter()
                    .fold(Unit::new(format!("N{i:02}"), UnitType::Service), |u, d| u.depends_on(d.as_str()))
            })
            .collect();
        let graph = DependencyGraph::from_units(&units);
        let first = GraphAnalyzer::new(&graph).bridges(5, 50);
        let second = GraphAnalyzer::new(&graph).bridges(5, 50);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn sample_pairs_are_distinct() {
        let pairs = sample_pairs(10, 40, 7);
        let unique: HashSet<_> = pairs.iter().collect();
        assert_eq!(unique.len(), pairs.len());
        assert!(pairs.iter().all(|(a, b)| a != b));
        assert_eq!(sample_pairs(3, 100, 7).len(), 6);
    }

    #[test]
    fn analyze_bundles_counts() {
        let graph = DependencyGraph::from_units(&[
            model("A", &["B"]),
            model("B", &["A", "C"]),
            model("C", &[]),
        ]);
        let report = GraphAnalyzer::new(&graph).analyze();
        assert_eq!(report.stats.cycle_count, 1);
        assert_eq!(report.stats.dead_end_count, 1);
        assert_eq!(report.stats.graph.node_count, 3);
        assert_eq!(report.cycles[0], ["A", "B", "A"]);
    }
}
