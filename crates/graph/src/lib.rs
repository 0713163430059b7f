//! # codectx graph
//!
//! Structural intelligence over extracted units.
//!
//! ## Features
//!
//! - **Dependency graph** - forward edges, derived reverse edges, type and file indexes
//! - **Blast radius** - which units a set of changed files can affect
//! - **PageRank** - importance scores and high/medium/low buckets
//! - **Structural analysis** - orphans, dead ends, hubs, cycles, sampled bridges
//! - **Snapshots** - JSON round-trip of the whole graph
//!
//! ## Architecture
//!
//! ```text
//! Unit[]
//!     │
//!     ├──> DependencyGraph (single writer, then read-only)
//!     │      ├─ forward / reverse adjacency
//!     │      ├─ type index, file index
//!     │      └─ affected_by, pagerank, snapshot
//!     │
//!     └──> GraphAnalyzer (petgraph projection, per-instance memo)
//!            ├─ orphans, dead ends, hubs
//!            ├─ three-colour cycle detection
//!            └─ sampled betweenness (bridges)
//! ```

mod analyzer;
mod error;
mod graph;
mod overview;
mod pagerank;
mod snapshot;
mod types;

pub use analyzer::{
    AnalysisReport, AnalysisStats, AnalyzerConfig, BridgeEntry, GraphAnalyzer, HubEntry,
};
pub use error::{GraphError, Result};
pub use graph::DependencyGraph;
pub use overview::StructuralOverview;
pub use pagerank::{ImportanceBucket, DEFAULT_DAMPING, DEFAULT_ITERATIONS};
pub use snapshot::{GraphSnapshot, SnapshotNode};
pub use types::{GraphNode, GraphStats};
