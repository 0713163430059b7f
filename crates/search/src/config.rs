use codectx_units::UnitType;
use serde::{Deserialize, Serialize};

/// Weights of the six ranking signals; must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub semantic: f64,
    pub keyword: f64,
    pub recency: f64,
    pub importance: f64,
    pub type_match: f64,
    pub diversity: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            semantic: 0.40,
            keyword: 0.20,
            recency: 0.15,
            importance: 0.10,
            type_match: 0.10,
            diversity: 0.05,
        }
    }
}

impl RankingWeights {
    fn values(&self) -> [f64; 6] {
        [
            self.semantic,
            self.keyword,
            self.recency,
            self.importance,
            self.type_match,
            self.diversity,
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.values().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("ranking weights must be finite and non-negative".to_string());
        }
        let sum: f64 = self.values().iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("ranking weights must sum to 1.0 (got {sum:.6})"));
        }
        Ok(())
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Token budget of the assembled context
    pub budget: usize,

    /// Candidates requested from the search strategy
    pub limit: usize,

    /// Reciprocal rank fusion constant
    pub rrf_k: f64,

    /// Below this many remaining tokens a section stops instead of
    /// truncating the next entry
    pub min_useful_tokens: usize,

    /// Percent of the budget reserved for the structural overview
    pub structural_share: usize,

    pub weights: RankingWeights,

    /// Unit types assembled into the framework section
    pub framework_types: Vec<UnitType>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            budget: 8000,
            limit: 20,
            rrf_k: 60.0,
            min_useful_tokens: 200,
            structural_share: 10,
            weights: RankingWeights::default(),
            framework_types: vec![UnitType::RailsSource, UnitType::GemSource],
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.budget == 0 {
            return Err("budget must be > 0".to_string());
        }
        if self.limit == 0 {
            return Err("limit must be > 0".to_string());
        }
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err("rrf_k must be > 0".to_string());
        }
        if self.structural_share > 100 {
            return Err("structural_share must be a percentage (0-100)".to_string());
        }
        self.weights.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RetrievalConfig::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = RankingWeights {
            semantic: 0.9,
            ..Default::default()
        };
        let err = weights.validate().unwrap_err();
        assert!(err.contains("sum to 1.0"), "{err}");
    }

    #[test]
    fn rejects_zero_budget_and_bad_share() {
        let config = RetrievalConfig {
            budget: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetrievalConfig {
            structural_share: 150,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: RetrievalConfig = serde_json::from_str(r#"{"budget": 1000}"#).unwrap();
        assert_eq!(config.budget, 1000);
        assert_eq!(config.limit, 20);
        assert_eq!(config.weights, RankingWeights::default());
    }
}
