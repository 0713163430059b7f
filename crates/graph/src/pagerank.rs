//! PageRank importance over the dependency graph.
//!
//! A unit receives rank from the units that depend on it, so heavily reused
//! models and services float to the top.

use crate::graph::DependencyGraph;
use codectx_units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_ITERATIONS: usize = 20;

/// Percent of ranked units placed in the `high` bucket
const HIGH_PERCENT: usize = 10;
/// Cumulative percent of ranked units placed in `high` or `medium`
const MEDIUM_PERCENT: usize = 40;

/// Importance bucket derived from PageRank position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceBucket {
    High,
    Medium,
    Low,
}

impl ImportanceBucket {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ImportanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DependencyGraph {
    /// Iterative PageRank with uniform redistribution of dangling mass.
    ///
    /// Only registered nodes participate: an edge to an unregistered target
    /// neither receives rank nor counts toward the source's out-degree.
    /// Scores sum to 1 for a non-empty graph.
    pub fn pagerank(&self, damping: f64, iterations: usize) -> HashMap<String, f64> {
        let n = self.node_count();
        if n == 0 {
            return HashMap::new();
        }

        let index: HashMap<&str, usize> = self
            .nodes
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        // out[i] = registered dependencies of node i
        let out: Vec<Vec<usize>> = self
            .nodes
            .keys()
            .map(|id| {
                self.dependencies_of(id)
                    .iter()
                    .filter_map(|target| index.get(target.as_str()).copied())
                    .collect()
            })
            .collect();

        let n_f = n as f64;
        let mut scores = vec![1.0 / n_f; n];

        for _ in 0..iterations {
            let dangling: f64 = out
                .iter()
                .zip(&scores)
                .filter(|(targets, _)| targets.is_empty())
                .map(|(_, score)| score)
                .sum();
            let base = (1.0 - damping) / n_f + damping * dangling / n_f;

            let mut next = vec![base; n];
            for (source, targets) in out.iter().enumerate() {
                if targets.is_empty() {
                    continue;
                }
                let share = damping * scores[source] / targets.len() as f64;
                for &target in targets {
                    next[target] += share;
                }
            }
            scores = next;
        }

        self.nodes
            .keys()
            .cloned()
            .zip(scores)
            .collect()
    }

    /// Bucket every node by PageRank position.
    ///
    /// Top 10% are `High` (at least one node), the next 30% `Medium`, the
    /// rest `Low`. Ties are broken by identifier.
    pub fn importance_buckets(&self) -> HashMap<String, ImportanceBucket> {
        let scores = self.pagerank(DEFAULT_DAMPING, DEFAULT_ITERATIONS);
        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let n = ranked.len();
        let high_cut = (n * HIGH_PERCENT).div_ceil(100).max(1);
        let medium_cut = (n * MEDIUM_PERCENT).div_ceil(100).max(high_cut);

        ranked
            .into_iter()
            .enumerate()
            .map(|(position, (id, _))| {
                let bucket = if position < high_cut {
                    ImportanceBucket::High
                } else if position < medium_cut {
                    ImportanceBucket::Medium
                } else {
                    ImportanceBucket::Low
                };
                (id, bucket)
            })
            .collect()
    }

    /// Write `metadata.importance` onto each unit known to the graph
    pub fn annotate_importance(&self, units: &mut [Unit]) {
        let buckets = self.importance_buckets();
        let mut annotated = 0usize;
        for unit in units.iter_mut() {
            if let Some(bucket) = buckets.get(&unit.identifier) {
                unit.metadata
                    .insert("importance".to_string(), bucket.as_str().into());
                annotated += 1;
            }
        }
        log::debug!("Annotated importance on {annotated}/{} units", units.len());
    }
}
