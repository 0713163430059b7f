use codectx_units::UnitType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Vector,
    Keyword,
    Graph,
    GraphExpansion,
    Direct,
    /// Fused from several sources by reciprocal rank fusion
    Rrf,
}

impl CandidateSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Graph => "graph",
            Self::GraphExpansion => "graph_expansion",
            Self::Direct => "direct",
            Self::Rrf => "rrf",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [
            Self::Vector,
            Self::Keyword,
            Self::Graph,
            Self::GraphExpansion,
            Self::Direct,
            Self::Rrf,
        ]
        .into_iter()
        .find(|source| source.as_str() == s)
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit proposed by a search strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub identifier: String,
    pub score: f64,
    pub source: CandidateSource,

    /// Strategy annotations: `type`, `file_path`, `matched_fields`, `sources`
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Candidate {
    pub fn new(identifier: impl Into<String>, score: f64, source: CandidateSource) -> Self {
        Self {
            identifier: identifier.into(),
            score,
            source,
            metadata: Map::new(),
        }
    }

    /// Builder: set a metadata entry
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Unit type recorded by the producing strategy
    pub fn unit_type(&self) -> Option<UnitType> {
        self.metadata
            .get("type")
            .and_then(Value::as_str)
            .map(UnitType::from)
    }

    /// Number of unit fields a keyword search matched
    pub fn matched_field_count(&self) -> usize {
        self.metadata
            .get("matched_fields")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Sources that contributed to this candidate.
    ///
    /// For fused candidates this is the list recorded during fusion.
    pub fn origins(&self) -> Vec<CandidateSource> {
        if self.source != CandidateSource::Rrf {
            return vec![self.source];
        }
        self.metadata
            .get("sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(CandidateSource::parse)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// What the user wants to do with the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Understand,
    Locate,
    Trace,
    Debug,
    Implement,
    Reference,
    Compare,
    Framework,
}

/// How much of the codebase the answer should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Pinpoint,
    Focused,
    Exploratory,
    Comprehensive,
}

/// Retrieval method chosen for a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Vector,
    Keyword,
    Graph,
    Hybrid,
    Direct,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Graph => "graph",
            Self::Hybrid => "hybrid",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub scope: Scope,
    pub target_type: Option<UnitType>,
    pub framework_context: bool,
    pub keywords: Vec<String>,
}

/// Result of executing one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub candidates: Vec<Candidate>,
    pub strategy: Strategy,
    pub query: String,
}

/// Budget section of an assembled context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Structural,
    Primary,
    Supporting,
    Framework,
}

impl Section {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Primary => "primary",
            Self::Supporting => "supporting",
            Self::Framework => "framework",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which unit contributed which part of the context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub identifier: String,
    #[serde(rename = "type")]
    pub unit_type: Option<UnitType>,
    pub score: f64,
    pub file_path: Option<String>,
    pub section: Section,
    pub truncated: bool,
}

/// Token-budgeted context string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub context: String,
    pub tokens_used: usize,
    pub budget: usize,
    pub sources: Vec<SourceAttribution>,
    pub sections: Vec<Section>,
}

/// Source entry of a retrieval result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub identifier: String,
    #[serde(rename = "type")]
    pub unit_type: Option<UnitType>,
    pub score: f64,
    pub file_path: Option<String>,
}

impl From<&SourceAttribution> for SourceSummary {
    fn from(source: &SourceAttribution) -> Self {
        Self {
            identifier: source.identifier.clone(),
            unit_type: source.unit_type.clone(),
            score: source.score,
            file_path: source.file_path.clone(),
        }
    }
}

/// End-to-end answer for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub classification: Classification,
    pub strategy: Strategy,
    pub context: String,
    pub sources: Vec<SourceSummary>,
    pub tokens_used: usize,
    pub budget: usize,
    pub sections: Vec<Section>,
}
