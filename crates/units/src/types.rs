use crate::error::{Result, UnitError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A named code entity with forward dependency edges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// Globally unique identifier (e.g., "Admin::User")
    pub identifier: String,

    /// Unit type tag
    #[serde(rename = "type")]
    pub unit_type: UnitType,

    /// Enclosing namespace, if the extractor recorded one
    #[serde(default)]
    pub namespace: Option<String>,

    /// Source file path
    #[serde(default)]
    pub file_path: Option<String>,

    /// Forward dependency edges
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Source text rendered into assembled context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,

    /// Free-form enrichment (change_frequency, importance, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Forward edge from a unit to the unit it depends on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub target: String,

    /// How the dependency was discovered (association, constant reference, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl Dependency {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            via: None,
        }
    }
}

impl Unit {
    /// Create a unit with no dependencies
    pub fn new(identifier: impl Into<String>, unit_type: UnitType) -> Self {
        Self {
            identifier: identifier.into(),
            unit_type,
            namespace: None,
            file_path: None,
            dependencies: Vec::new(),
            source_code: None,
            metadata: Map::new(),
        }
    }

    /// Builder: set namespace
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Builder: set file path
    #[must_use]
    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Builder: add a dependency edge
    #[must_use]
    pub fn depends_on(mut self, target: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::new(target));
        self
    }

    /// Builder: set source text
    #[must_use]
    pub fn source_code(mut self, source: impl Into<String>) -> Self {
        self.source_code = Some(source.into());
        self
    }

    /// Builder: set a metadata entry
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Namespace, falling back to the identifier prefix before the last `::`
    #[must_use]
    pub fn effective_namespace(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or_else(|| self.identifier.rsplit_once("::").map(|(ns, _)| ns))
    }

    /// Git-derived change-frequency bucket (hot, active, new, dormant)
    #[must_use]
    pub fn change_frequency(&self) -> Option<&str> {
        self.metadata.get("change_frequency").and_then(Value::as_str)
    }

    /// Importance bucket (high, medium, low)
    #[must_use]
    pub fn importance(&self) -> Option<&str> {
        self.metadata.get("importance").and_then(Value::as_str)
    }

    /// Dependency targets in declaration order
    pub fn dependency_targets(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|d| d.target.as_str())
    }
}

/// Parse a JSON array of units, rejecting empty identifiers
pub fn parse_units(json: &str) -> Result<Vec<Unit>> {
    let units: Vec<Unit> = serde_json::from_str(json)?;
    if let Some(pos) = units.iter().position(|u| u.identifier.trim().is_empty()) {
        return Err(UnitError::EmptyIdentifier(pos));
    }
    log::debug!("Parsed {} units", units.len());
    Ok(units)
}

/// Type tag of a unit.
///
/// Serialized as a plain snake_case string; any unrecognised string parses to
/// [`UnitType::Other`] so payloads from newer extractors still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitType {
    Model,
    Controller,
    Service,
    Job,
    Mailer,
    Graphql,
    Component,
    Concern,
    Serializer,
    Policy,
    Helper,
    Route,
    Migration,
    Lib,
    /// Framework source pulled in for reference
    RailsSource,
    /// Third-party gem source
    GemSource,
    Other(String),
}

impl UnitType {
    const KNOWN: [Self; 16] = [
        Self::Model,
        Self::Controller,
        Self::Service,
        Self::Job,
        Self::Mailer,
        Self::Graphql,
        Self::Component,
        Self::Concern,
        Self::Serializer,
        Self::Policy,
        Self::Helper,
        Self::Route,
        Self::Migration,
        Self::Lib,
        Self::RailsSource,
        Self::GemSource,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Model => "model",
            Self::Controller => "controller",
            Self::Service => "service",
            Self::Job => "job",
            Self::Mailer => "mailer",
            Self::Graphql => "graphql",
            Self::Component => "component",
            Self::Concern => "concern",
            Self::Serializer => "serializer",
            Self::Policy => "policy",
            Self::Helper => "helper",
            Self::Route => "route",
            Self::Migration => "migration",
            Self::Lib => "lib",
            Self::RailsSource => "rails_source",
            Self::GemSource => "gem_source",
            Self::Other(name) => name,
        }
    }

    /// Framework or gem source rather than application code
    #[must_use]
    pub const fn is_framework_source(&self) -> bool {
        matches!(self, Self::RailsSource | Self::GemSource)
    }
}

impl FromStr for UnitType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches(':').to_ascii_lowercase();
        Ok(Self::KNOWN
            .into_iter()
            .find(|known| known.as_str() == normalized)
            .unwrap_or(Self::Other(normalized)))
    }
}

impl From<&str> for UnitType {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UnitType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UnitType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unit_type_round_trips_through_strings() {
        for known in UnitType::KNOWN {
            assert_eq!(UnitType::from(known.as_str()), known);
        }
        assert_eq!(UnitType::from(":model"), UnitType::Model);
        assert_eq!(UnitType::from("Controller"), UnitType::Controller);
        assert_eq!(
            UnitType::from("view_component"),
            UnitType::Other("view_component".to_string())
        );
    }

    #[test]
    fn unit_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&UnitType::RailsSource).unwrap();
        assert_eq!(json, "\"rails_source\"");
        let back: UnitType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UnitType::RailsSource);
    }

    #[test]
    fn effective_namespace_falls_back_to_identifier_prefix() {
        let nested = Unit::new("Admin::Billing::Invoice", UnitType::Model);
        assert_eq!(nested.effective_namespace(), Some("Admin::Billing"));

        let explicit = Unit::new("Invoice", UnitType::Model).namespace("Billing");
        assert_eq!(explicit.effective_namespace(), Some("Billing"));

        let top_level = Unit::new("User", UnitType::Model);
        assert_eq!(top_level.effective_namespace(), None);
    }

    #[test]
    fn parse_units_fills_defaults() {
        let units = parse_units(r#"[{"identifier": "User", "type": "model"}]"#).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].dependencies.is_empty());
        assert!(units[0].metadata.is_empty());
        assert_eq!(units[0].file_path, None);
    }

    #[test]
    fn parse_units_rejects_empty_identifier() {
        let err = parse_units(r#"[{"identifier": "User", "type": "model"}, {"identifier": " ", "type": "job"}]"#)
            .unwrap_err();
        assert!(matches!(err, UnitError::EmptyIdentifier(1)));
    }

    #[test]
    fn metadata_accessors_read_buckets() {
        let unit = Unit::new("User", UnitType::Model)
            .meta("change_frequency", "hot")
            .meta("importance", "high");
        assert_eq!(unit.change_frequency(), Some("hot"));
        assert_eq!(unit.importance(), Some("high"));
    }
}
