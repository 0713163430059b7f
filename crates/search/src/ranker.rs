//! Weighted multi-signal ranking.
//!
//! ```text
//! candidates ──> [RRF if multi-source] ──> six signals × weights ──> sort
//!                                                                     │
//!                                    diversity penalty ──> re-sort <──┘
//! ```

use crate::config::RankingWeights;
use crate::fusion;
use crate::types::{Candidate, Classification};
use codectx_units::{Unit, UnitType};
use std::cmp::Ordering;
use std::collections::HashMap;

const KEYWORD_FIELD_CAP: usize = 3;
const DIVERSITY_STEP: f64 = 0.1;
const DIVERSITY_MAX_PENALTY: f64 = 0.5;

/// Per-candidate signal values, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub semantic: f64,
    pub keyword: f64,
    pub recency: f64,
    pub importance: f64,
    pub type_match: f64,
    pub diversity: f64,
}

impl Signals {
    fn weighted(&self, w: &RankingWeights) -> f64 {
        self.semantic * w.semantic
            + self.keyword * w.keyword
            + self.recency * w.recency
            + self.importance * w.importance
            + self.type_match * w.type_match
            + self.diversity * w.diversity
    }
}

pub fn recency_signal(change_frequency: Option<&str>) -> f64 {
    match change_frequency {
        Some("hot") => 1.0,
        Some("active") => 0.8,
        Some("new") => 0.7,
        Some("dormant") => 0.3,
        _ => 0.5,
    }
}

pub fn importance_signal(importance: Option<&str>) -> f64 {
    match importance {
        Some("high") => 1.0,
        Some("medium") => 0.6,
        Some("low") => 0.3,
        _ => 0.5,
    }
}

pub fn type_match_signal(unit_type: Option<&UnitType>, target: Option<&UnitType>) -> f64 {
    match (target, unit_type) {
        (None, _) => 0.5,
        (Some(target), Some(actual)) if actual == target => 1.0,
        (Some(_), _) => 0.3,
    }
}

fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.identifier.cmp(&b.identifier))
}

#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankingWeights,
    rrf_k: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankingWeights::default(), fusion::DEFAULT_RRF_K)
    }
}

impl Ranker {
    pub fn new(weights: RankingWeights, rrf_k: f64) -> Self {
        Self { weights, rrf_k }
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Fuse, score and order candidates.
    ///
    /// `units` is the batch-fetched unit map for the candidate identifiers;
    /// candidates without a unit fall back to neutral signal values.
    pub fn rank(
        &self,
        candidates: Vec<Candidate>,
        classification: &Classification,
        units: &HashMap<String, Unit>,
    ) -> Vec<Candidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut ranked = if fusion::is_multi_source(&candidates) {
            fusion::fuse(candidates, self.rrf_k)
        } else {
            candidates
        };

        for candidate in &mut ranked {
            let signals = self.signals(candidate, classification, units.get(&candidate.identifier));
            candidate.score = signals.weighted(&self.weights);
        }
        ranked.sort_by(by_score_desc);

        self.apply_diversity(&mut ranked, units);
        ranked.sort_by(by_score_desc);

        log::debug!("Ranked {} candidates", ranked.len());
        ranked
    }

    pub fn signals(
        &self,
        candidate: &Candidate,
        classification: &Classification,
        unit: Option<&Unit>,
    ) -> Signals {
        let unit_type = unit.map(|u| u.unit_type.clone()).or_else(|| candidate.unit_type());
        Signals {
            semantic: candidate.score,
            keyword: candidate.matched_field_count().min(KEYWORD_FIELD_CAP) as f64
                / KEYWORD_FIELD_CAP as f64,
            recency: recency_signal(unit.and_then(Unit::change_frequency)),
            importance: importance_signal(unit.and_then(Unit::importance)),
            type_match: type_match_signal(unit_type.as_ref(), classification.target_type.as_ref()),
            diversity: 1.0,
        }
    }

    /// Penalize repeats of a namespace or type already seen higher up
    fn apply_diversity(&self, ranked: &mut [Candidate], units: &HashMap<String, Unit>) {
        let mut seen_namespaces: HashMap<String, usize> = HashMap::new();
        let mut seen_types: HashMap<String, usize> = HashMap::new();

        for candidate in ranked.iter_mut() {
            let unit = units.get(&candidate.identifier);
            let namespace = unit
                .and_then(Unit::effective_namespace)
                .unwrap_or_default()
                .to_string();
            let unit_type = unit
                .map(|u| u.unit_type.as_str().to_string())
                .or_else(|| candidate.unit_type().map(|t| t.as_str().to_string()))
                .unwrap_or_default();

            let ns_count = seen_namespaces.entry(namespace).or_insert(0);
            let type_count = seen_types.entry(unit_type).or_insert(0);
            let penalty = ((*ns_count + *type_count) as f64 * DIVERSITY_STEP).min(DIVERSITY_MAX_PENALTY);
            candidate.score -= penalty * self.weights.diversity;
            *ns_count += 1;
            *type_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateSource, Intent, Scope};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn classification(target_type: Option<UnitType>) -> Classification {
        Classification {
            intent: Intent::Understand,
            scope: Scope::Focused,
            target_type,
            framework_context: false,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn empty_input_ranks_to_empty() {
        let ranked = Ranker::default().rank(Vec::new(), &classification(None), &HashMap::new());
        assert!(ranked.is_empty());
    }

    #[test]
    fn signal_tables() {
        assert_eq!(recency_signal(Some("hot")), 1.0);
        assert_eq!(recency_signal(Some("dormant")), 0.3);
        assert_eq!(recency_signal(None), 0.5);
        assert_eq!(importance_signal(Some("medium")), 0.6);
        assert_eq!(importance_signal(Some("bogus")), 0.5);
        assert_eq!(type_match_signal(Some(&UnitType::Model), Some(&UnitType::Model)), 1.0);
        assert_eq!(type_match_signal(Some(&UnitType::Job), Some(&UnitType::Model)), 0.3);
        assert_eq!(type_match_signal(None, Some(&UnitType::Model)), 0.3);
        assert_eq!(type_match_signal(Some(&UnitType::Job), None), 0.5);
    }

    #[test]
    fn keyword_signal_is_capped() {
        let candidate = Candidate::new("User", 1.0, CandidateSource::Keyword).meta(
            "matched_fields",
            json!(["identifier", "namespace", "file_path", "source_code"]),
        );
        let signals = Ranker::default().signals(&candidate, &classification(None), None);
        assert_eq!(signals.keyword, 1.0);
    }

    #[test]
    fn single_candidate_score_is_weighted_sum() {
        let unit = Unit::new("User", UnitType::Model)
            .meta("change_frequency", "hot")
            .meta("importance", "high");
        let units = HashMap::from([("User".to_string(), unit)]);
        let ranked = Ranker::default().rank(
            vec![Candidate::new("User", 1.0, CandidateSource::Vector)],
            &classification(Some(UnitType::Model)),
            &units,
        );
        // 0.40 + 0 + 0.15 + 0.10 + 0.10 + 0.05, first item carries no penalty
        assert!((ranked[0].score - 0.80).abs() < 1e-9);
    }

    #[test]
    fn type_match_lifts_target_type() {
        let units = HashMap::from([
            ("Billing::Invoice".to_string(), Unit::new("Billing::Invoice", UnitType::Model)),
            ("Sync::InvoiceJob".to_string(), Unit::new("Sync::InvoiceJob", UnitType::Job)),
        ]);
        let ranked = Ranker::default().rank(
            vec![
                Candidate::new("Sync::InvoiceJob", 0.5, CandidateSource::Vector),
                Candidate::new("Billing::Invoice", 0.5, CandidateSource::Vector),
            ],
            &classification(Some(UnitType::Model)),
            &units,
        );
        assert_eq!(ranked[0].identifier, "Billing::Invoice");
    }

    #[test]
    fn repeated_namespace_is_penalized() {
        let units: HashMap<String, Unit> = ["Admin::A", "Admin::B", "Admin::C", "Admin::D", "Shop::E"]
            .into_iter()
            .map(|id| (id.to_string(), Unit::new(id, UnitType::Other(id.to_lowercase()))))
            .collect();
        let candidates = vec![
            Candidate::new("Admin::A", 0.9, CandidateSource::Vector),
            Candidate::new("Admin::B", 0.9, CandidateSource::Vector),
            Candidate::new("Admin::C", 0.9, CandidateSource::Vector),
            Candidate::new("Admin::D", 0.5, CandidateSource::Vector),
            Candidate::new("Shop::E", 0.5, CandidateSource::Vector),
        ];
        let ranker = Ranker::default();
        let pre = ranker
            .signals(&candidates[3], &classification(None), units.get("Admin::D"))
            .weighted(ranker.weights());

        let ranked = ranker.rank(candidates, &classification(None), &units);
        let admin_d = ranked.iter().find(|c| c.identifier == "Admin::D").unwrap();
        let shop_e = ranked.iter().find(|c| c.identifier == "Shop::E").unwrap();
        assert!(admin_d.score < pre);
        assert!(admin_d.score < shop_e.score);
    }

    #[test]
    fn multi_source_input_is_fused() {
        let ranked = Ranker::default().rank(
            vec![
                Candidate::new("User", 0.9, CandidateSource::Vector),
                Candidate::new("User", 1.0, CandidateSource::Keyword),
                Candidate::new("Order", 0.8, CandidateSource::Keyword),
            ],
            &classification(None),
            &HashMap::new(),
        );
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|c| c.source == CandidateSource::Rrf));
        assert_eq!(ranked[0].identifier, "User");
    }
}
