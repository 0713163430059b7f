//! Reciprocal Rank Fusion: score(d) = Σ 1/(k + rank_i(d))
//!
//! Ranks are 0-based positions within each source after sorting that
//! source's candidates by descending score.

use crate::types::{Candidate, CandidateSource};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_RRF_K: f64 = 60.0;

/// True when candidates come from more than one source
pub fn is_multi_source(candidates: &[Candidate]) -> bool {
    candidates
        .first()
        .is_some_and(|first| candidates.iter().any(|c| c.source != first.source))
}

/// Fuse candidates from several sources into one list with source `rrf`.
///
/// Metadata of the first occurrence of an identifier wins per key; the
/// contributing sources are recorded under `metadata.sources`. Output is
/// sorted by fused score descending, ties in first-seen order.
pub fn fuse(candidates: Vec<Candidate>, k: f64) -> Vec<Candidate> {
    let mut by_source: Vec<(CandidateSource, Vec<Candidate>)> = Vec::new();
    for candidate in candidates {
        match by_source.iter_mut().find(|(source, _)| *source == candidate.source) {
            Some((_, list)) => list.push(candidate),
            None => by_source.push((candidate.source, vec![candidate])),
        }
    }

    let mut fused: Vec<Candidate> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut origins: Vec<Vec<CandidateSource>> = Vec::new();

    for (source, mut list) in by_source {
        // Stable: equal scores keep their strategy order
        list.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (rank, candidate) in list.into_iter().enumerate() {
            let contribution = 1.0 / (k + rank as f64);
            match position.get(&candidate.identifier) {
                Some(&idx) => {
                    fused[idx].score += contribution;
                    for (key, value) in candidate.metadata {
                        fused[idx].metadata.entry(key).or_insert(value);
                    }
                    if !origins[idx].contains(&source) {
                        origins[idx].push(source);
                    }
                }
                None => {
                    position.insert(candidate.identifier.clone(), fused.len());
                    origins.push(vec![source]);
                    fused.push(Candidate {
                        identifier: candidate.identifier,
                        score: contribution,
                        source: CandidateSource::Rrf,
                        metadata: candidate.metadata,
                    });
                }
            }
        }
    }

    for (candidate, sources) in fused.iter_mut().zip(origins) {
        let names: Vec<Value> = sources.iter().map(|s| Value::from(s.as_str())).collect();
        candidate.metadata.insert("sources".to_string(), Value::Array(names));
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    log::debug!("RRF fused {} candidates (k={k})", fused.len());
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(id: &str, score: f64, source: CandidateSource) -> Candidate {
        Candidate::new(id, score, source)
    }

    #[test]
    fn shared_top_hit_scores_double() {
        let fused = fuse(
            vec![
                candidate("User", 0.9, CandidateSource::Vector),
                candidate("Order", 0.5, CandidateSource::Vector),
                candidate("User", 1.0, CandidateSource::Keyword),
                candidate("Invoice", 0.8, CandidateSource::Keyword),
            ],
            DEFAULT_RRF_K,
        );

        assert_eq!(fused[0].identifier, "User");
        assert!((fused[0].score - 2.0 / 60.0).abs() < 1e-12);
        assert_eq!(fused[0].source, CandidateSource::Rrf);
        assert_eq!(
            fused[0].origins(),
            vec![CandidateSource::Vector, CandidateSource::Keyword]
        );

        let order = fused.iter().find(|c| c.identifier == "Order").unwrap();
        assert!((order.score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn unique_top_hit_scores_lower_than_shared() {
        let fused = fuse(
            vec![
                candidate("Shared", 0.9, CandidateSource::Vector),
                candidate("Shared", 0.9, CandidateSource::Graph),
                candidate("Solo", 0.1, CandidateSource::Keyword),
            ],
            DEFAULT_RRF_K,
        );
        let shared = fused.iter().find(|c| c.identifier == "Shared").unwrap();
        let solo = fused.iter().find(|c| c.identifier == "Solo").unwrap();
        assert!((solo.score - 1.0 / 60.0).abs() < 1e-12);
        assert!(solo.score < shared.score);
    }

    #[test]
    fn ranks_follow_score_not_input_order() {
        let fused = fuse(
            vec![
                candidate("Low", 0.1, CandidateSource::Vector),
                candidate("High", 0.9, CandidateSource::Vector),
                candidate("Other", 1.0, CandidateSource::Keyword),
            ],
            DEFAULT_RRF_K,
        );
        let high = fused.iter().find(|c| c.identifier == "High").unwrap();
        assert!((high.score - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn metadata_merges_first_wins() {
        let fused = fuse(
            vec![
                candidate("User", 0.9, CandidateSource::Vector).meta("type", "model"),
                candidate("User", 1.0, CandidateSource::Keyword)
                    .meta("type", "service")
                    .meta("matched_fields", serde_json::json!(["identifier"])),
            ],
            DEFAULT_RRF_K,
        );
        assert_eq!(fused[0].metadata["type"], "model");
        assert_eq!(fused[0].matched_field_count(), 1);
    }

    #[test]
    fn source_detection() {
        assert!(!is_multi_source(&[]));
        assert!(!is_multi_source(&[candidate("A", 1.0, CandidateSource::Vector)]));
        assert!(is_multi_source(&[
            candidate("A", 1.0, CandidateSource::Vector),
            candidate("B", 1.0, CandidateSource::Keyword),
        ]));
    }
}
