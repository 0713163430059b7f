use codectx_units::{Unit, UnitType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub identifier: String,

    #[serde(rename = "type")]
    pub unit_type: UnitType,

    pub file_path: Option<String>,

    pub namespace: Option<String>,
}

impl GraphNode {
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            identifier: unit.identifier.clone(),
            unit_type: unit.unit_type.clone(),
            file_path: unit.file_path.clone(),
            namespace: unit.namespace.clone(),
        }
    }
}

/// Summary counts of a graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    #[serde(default)]
    pub node_count: usize,

    #[serde(default)]
    pub edge_count: usize,

    /// Unit type -> node count
    #[serde(default)]
    pub types: BTreeMap<String, usize>,
}
