use anyhow::{anyhow, Context, Result};
use codectx_graph::AnalyzerConfig;
use codectx_search::RetrievalConfig;
use codectx_stores::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level TOML config; every table is optional.
///
/// ```toml
/// [retrieval]
/// budget = 4000
///
/// [retrieval.weights]
/// semantic = 0.5
/// keyword = 0.1
///
/// [stores]
/// vector = "memory"
///
/// [analyzer]
/// hub_limit = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retrieval: RetrievalConfig,
    pub stores: StoreConfig,
    pub analyzer: AnalyzerConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Invalid TOML config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        log::debug!("Configuration: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval
            .validate()
            .map_err(|e| anyhow!("[retrieval] {e}"))?;
        self.stores.validate().map_err(|e| anyhow!("[stores] {e}"))?;
        self.analyzer
            .validate()
            .map_err(|e| anyhow!("[analyzer] {e}"))?;
        Ok(())
    }
}
