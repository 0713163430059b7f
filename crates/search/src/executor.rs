//! Strategy selection and execution against the store roles.

use crate::error::Result;
use crate::types::{Candidate, CandidateSource, Classification, Intent, Scope, SearchOutcome, Strategy};
use codectx_stores::{EmbeddingProvider, GraphStore, MetadataStore, StoreSet, VectorFilter, VectorStore};
use codectx_units::Unit;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const MIN_KEYWORD_WINDOW: usize = 10;
const MAX_GRAPH_SEEDS: usize = 3;
const EXPANSION_SEEDS: usize = 3;

const SEED_SCORE: f64 = 1.0;
const DEPENDENCY_SCORE: f64 = 0.8;
const DEPENDENT_SCORE: f64 = 0.7;
const EXPANSION_SCORE: f64 = 0.5;
const DIRECT_SCORE: f64 = 1.0;

/// Strategy table, explicit overrides first
pub fn select_strategy(classification: &Classification) -> Strategy {
    match (classification.intent, classification.scope) {
        (Intent::Locate | Intent::Reference, Scope::Pinpoint) => Strategy::Direct,
        (Intent::Trace, _) => Strategy::Graph,
        (Intent::Framework, _) => Strategy::Keyword,
        (_, Scope::Comprehensive | Scope::Exploratory) => Strategy::Hybrid,
        (Intent::Locate | Intent::Reference, _) => Strategy::Keyword,
        _ => Strategy::Vector,
    }
}

/// `user_session` -> `UserSession`
fn camelize(word: &str) -> String {
    word.split('_').filter(|part| !part.is_empty()).map(capitalize).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lookup variants for exact identifier resolution, deduplicated in order
fn identifier_variants(query: &str, keywords: &[String]) -> Vec<String> {
    let verbatim = query.split_whitespace().map(|token| {
        token
            .trim_matches(|c: char| !c.is_alphanumeric() && c != ':' && c != '_')
            .to_string()
    });
    let derived = keywords.iter().flat_map(|k| [capitalize(k), camelize(k)]);

    let mut variants: Vec<String> = Vec::new();
    for variant in verbatim.chain(derived) {
        if !variant.is_empty() && !variants.contains(&variant) {
            variants.push(variant);
        }
    }
    variants
}

/// Which searchable unit fields mention any of the keywords
fn matched_fields(unit: &Unit, keywords: &[String]) -> Vec<&'static str> {
    let fields: [(&'static str, Option<&str>); 4] = [
        ("identifier", Some(unit.identifier.as_str())),
        ("namespace", unit.effective_namespace()),
        ("file_path", unit.file_path.as_deref()),
        ("source_code", unit.source_code.as_deref()),
    ];
    fields
        .into_iter()
        .filter(|(_, value)| {
            value.is_some_and(|text| {
                let text = text.to_lowercase();
                keywords.iter().any(|k| text.contains(k.as_str()))
            })
        })
        .map(|(name, _)| name)
        .collect()
}

fn describe(candidate: Candidate, unit: &Unit) -> Candidate {
    let mut candidate = candidate.meta("type", unit.unit_type.as_str());
    if let Some(path) = &unit.file_path {
        candidate = candidate.meta("file_path", path.as_str());
    }
    candidate
}

/// Append `candidate` unless its identifier is already present; with
/// `keep_max` a later higher score replaces the earlier one.
fn merge(list: &mut Vec<Candidate>, positions: &mut HashMap<String, usize>, candidate: Candidate, keep_max: bool) {
    match positions.get(&candidate.identifier) {
        Some(&idx) => {
            if keep_max && candidate.score > list[idx].score {
                list[idx] = candidate;
            }
        }
        None => {
            positions.insert(candidate.identifier.clone(), list.len());
            list.push(candidate);
        }
    }
}

fn finish(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(limit);
    candidates
}

/// Runs one retrieval strategy per query
#[derive(Clone)]
pub struct SearchExecutor {
    vector: Arc<dyn VectorStore>,
    metadata: Arc<dyn MetadataStore>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchExecutor {
    pub fn new(stores: &StoreSet) -> Self {
        Self::from_parts(
            Arc::clone(&stores.vector),
            Arc::clone(&stores.metadata),
            stores.graph_store(),
            Arc::clone(&stores.embedder),
        )
    }

    pub fn from_parts(
        vector: Arc<dyn VectorStore>,
        metadata: Arc<dyn MetadataStore>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            vector,
            metadata,
            graph,
            embedder,
        }
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    pub async fn execute(&self, query: &str, classification: &Classification, limit: usize) -> Result<SearchOutcome> {
        let selected = select_strategy(classification);
        let (candidates, strategy) = match selected {
            Strategy::Vector => (self.vector_search(query, classification, limit).await?, selected),
            Strategy::Keyword => (self.keyword_search(&classification.keywords, limit).await?, selected),
            Strategy::Graph => (self.graph_search(&classification.keywords, limit).await?, selected),
            Strategy::Hybrid => (self.hybrid_search(query, classification, limit).await?, selected),
            Strategy::Direct => self.direct_search(query, &classification.keywords, limit).await?,
        };

        log::debug!(
            "Strategy {strategy} returned {} candidates for '{query}'",
            candidates.len()
        );
        Ok(SearchOutcome {
            candidates,
            strategy,
            query: query.to_string(),
        })
    }

    async fn vector_search(&self, query: &str, classification: &Classification, limit: usize) -> Result<Vec<Candidate>> {
        let embedding = self.embedder.embed(query).await?;
        let filter = VectorFilter {
            unit_type: classification.target_type.clone(),
        };
        let hits = self.vector.search(&embedding, limit, &filter).await?;
        let candidates = hits
            .into_iter()
            .map(|hit| Candidate {
                identifier: hit.id,
                score: hit.score,
                source: CandidateSource::Vector,
                metadata: hit.metadata,
            })
            .collect();
        Ok(finish(candidates, limit))
    }

    async fn keyword_search(&self, keywords: &[String], limit: usize) -> Result<Vec<Candidate>> {
        let window = limit.max(MIN_KEYWORD_WINDOW);
        let mut candidates = Vec::new();
        let mut positions = HashMap::new();

        for keyword in keywords {
            let hits = self.metadata.search(keyword, window).await?;
            let denominator = hits.len().max(MIN_KEYWORD_WINDOW) as f64;
            for (rank, unit) in hits.iter().enumerate() {
                let fields: Vec<Value> = matched_fields(unit, keywords).into_iter().map(Value::from).collect();
                let candidate = Candidate::new(
                    unit.identifier.clone(),
                    1.0 - rank as f64 / denominator,
                    CandidateSource::Keyword,
                )
                .meta("matched_fields", fields);
                merge(&mut candidates, &mut positions, describe(candidate, unit), true);
            }
        }
        Ok(finish(candidates, limit))
    }

    /// Up to three seed identifiers: exact capitalized lookups first, then
    /// metadata text search per keyword
    async fn graph_seeds(&self, keywords: &[String]) -> Result<Vec<String>> {
        let mut seeds: Vec<String> = Vec::new();
        for keyword in keywords {
            for variant in [capitalize(keyword), camelize(keyword)] {
                if seeds.len() < MAX_GRAPH_SEEDS && !seeds.contains(&variant) && self.metadata.find(&variant).await?.is_some() {
                    seeds.push(variant);
                }
            }
        }
        if seeds.is_empty() {
            for keyword in keywords {
                for unit in self.metadata.search(keyword, MAX_GRAPH_SEEDS).await? {
                    if seeds.len() < MAX_GRAPH_SEEDS && !seeds.contains(&unit.identifier) {
                        seeds.push(unit.identifier);
                    }
                }
            }
        }
        Ok(seeds)
    }

    async fn graph_search(&self, keywords: &[String], limit: usize) -> Result<Vec<Candidate>> {
        let seeds = self.graph_seeds(keywords).await?;
        let mut candidates = Vec::new();
        let mut positions = HashMap::new();

        for seed in &seeds {
            merge(&mut candidates, &mut positions, Candidate::new(seed.clone(), SEED_SCORE, CandidateSource::Graph), true);
            for dependency in self.graph.dependencies_of(seed).await? {
                merge(&mut candidates, &mut positions, Candidate::new(dependency, DEPENDENCY_SCORE, CandidateSource::Graph), true);
            }
            for dependent in self.graph.dependents_of(seed).await? {
                merge(&mut candidates, &mut positions, Candidate::new(dependent, DEPENDENT_SCORE, CandidateSource::Graph), true);
            }
        }

        let candidates = finish(candidates, limit);
        self.describe_all(candidates).await
    }

    async fn hybrid_search(&self, query: &str, classification: &Classification, limit: usize) -> Result<Vec<Candidate>> {
        let vector_hits = self.vector_search(query, classification, limit).await?;
        let keyword_hits = self.keyword_search(&classification.keywords, limit).await?;

        let mut expansion = Vec::new();
        for hit in vector_hits.iter().take(EXPANSION_SEEDS) {
            for dependency in self.graph.dependencies_of(&hit.identifier).await? {
                expansion.push(Candidate::new(dependency, EXPANSION_SCORE, CandidateSource::GraphExpansion));
            }
        }
        let expansion = self.describe_all(expansion).await?;

        let mut candidates = Vec::new();
        let mut positions = HashMap::new();
        for candidate in vector_hits.into_iter().chain(keyword_hits).chain(expansion) {
            merge(&mut candidates, &mut positions, candidate, false);
        }
        Ok(finish(candidates, limit))
    }

    /// Exact identifier lookups; falls back to keyword search when nothing
    /// resolves, reporting the keyword strategy
    async fn direct_search(&self, query: &str, keywords: &[String], limit: usize) -> Result<(Vec<Candidate>, Strategy)> {
        let mut candidates = Vec::new();
        for variant in identifier_variants(query, keywords) {
            if candidates.len() >= limit {
                break;
            }
            if let Some(unit) = self.metadata.find(&variant).await? {
                if !candidates.iter().any(|c: &Candidate| c.identifier == unit.identifier) {
                    let candidate = Candidate::new(unit.identifier.clone(), DIRECT_SCORE, CandidateSource::Direct);
                    candidates.push(describe(candidate, &unit));
                }
            }
        }

        if candidates.is_empty() {
            log::debug!("Direct lookup resolved nothing, falling back to keyword search");
            return Ok((self.keyword_search(keywords, limit).await?, Strategy::Keyword));
        }
        Ok((candidates, Strategy::Direct))
    }

    /// Attach `type` and `file_path` from one batched metadata fetch
    async fn describe_all(&self, candidates: Vec<Candidate>) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let ids: Vec<String> = candidates.iter().map(|c| c.identifier.clone()).collect();
        let units = self.metadata.find_batch(&ids).await?;
        Ok(candidates
            .into_iter()
            .map(|candidate| match units.get(&candidate.identifier) {
                Some(unit) => describe(candidate, unit),
                None => candidate,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::QueryClassifier;
    use codectx_stores::{StoreBuilder, StoreConfig};
    use codectx_units::UnitType;
    use pretty_assertions::assert_eq;

    fn classification(intent: Intent, scope: Scope, keywords: &[&str]) -> Classification {
        Classification {
            intent,
            scope,
            target_type: None,
            framework_context: false,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    async fn executor() -> SearchExecutor {
        let stores = StoreBuilder::new(StoreConfig::default()).build().unwrap();
        stores
            .index_units(vec![
                Unit::new("User", UnitType::Model)
                    .file_path("app/models/user.rb")
                    .source_code("class User < ApplicationRecord\n  has_secure_password\nend"),
                Unit::new("UserSession", UnitType::Model).depends_on("User"),
                Unit::new("SessionsController", UnitType::Controller)
                    .file_path("app/controllers/sessions_controller.rb")
                    .depends_on("UserSession")
                    .depends_on("User"),
                Unit::new("Billing::Invoice", UnitType::Model).depends_on("User"),
            ])
            .await
            .unwrap();
        SearchExecutor::new(&stores)
    }

    #[test]
    fn strategy_table() {
        let cases = [
            (Intent::Locate, Scope::Pinpoint, Strategy::Direct),
            (Intent::Reference, Scope::Pinpoint, Strategy::Direct),
            (Intent::Trace, Scope::Comprehensive, Strategy::Graph),
            (Intent::Framework, Scope::Exploratory, Strategy::Keyword),
            (Intent::Understand, Scope::Comprehensive, Strategy::Hybrid),
            (Intent::Debug, Scope::Exploratory, Strategy::Hybrid),
            (Intent::Locate, Scope::Focused, Strategy::Keyword),
            (Intent::Understand, Scope::Focused, Strategy::Vector),
            (Intent::Debug, Scope::Pinpoint, Strategy::Vector),
        ];
        for (intent, scope, expected) in cases {
            assert_eq!(select_strategy(&classification(intent, scope, &[])), expected, "{intent:?}/{scope:?}");
        }
    }

    #[test]
    fn identifier_variants_cover_case_forms() {
        let keywords = vec!["user_session".to_string()];
        assert_eq!(
            identifier_variants("user_session?", &keywords),
            ["user_session", "User_session", "UserSession"]
        );
        assert_eq!(camelize("admin__user"), "AdminUser");
    }

    #[tokio::test]
    async fn vector_strategy_for_plain_question() {
        let executor = executor().await;
        let query = "how does user authentication work?";
        let outcome = executor
            .execute(query, &QueryClassifier::classify(query), 5)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, Strategy::Vector);
        assert!(!outcome.candidates.is_empty());
        assert!(outcome.candidates.len() <= 5);
        assert!(outcome.candidates.iter().all(|c| c.source == CandidateSource::Vector));
        assert!(outcome.candidates.iter().all(|c| c.metadata.contains_key("type")));
    }

    #[tokio::test]
    async fn keyword_scores_decay_by_rank() {
        let executor = executor().await;
        let candidates = executor.keyword_search(&["user".to_string()], 10).await.unwrap();
        let ids: Vec<&str> = candidates.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, ["User", "UserSession"]);
        assert_eq!(candidates[0].score, 1.0);
        assert!((candidates[1].score - 0.9).abs() < 1e-12);
        assert_eq!(candidates[0].matched_field_count(), 3);
    }

    #[tokio::test]
    async fn graph_strategy_scores_neighbourhood() {
        let executor = executor().await;
        let c = classification(Intent::Trace, Scope::Focused, &["user_session"]);
        let outcome = executor.execute("trace user_session", &c, 10).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Graph);

        let score = |id: &str| outcome.candidates.iter().find(|c| c.identifier == id).map(|c| c.score);
        assert_eq!(score("UserSession"), Some(1.0));
        assert_eq!(score("User"), Some(0.8));
        assert_eq!(score("SessionsController"), Some(0.7));
        assert_eq!(outcome.candidates[0].unit_type(), Some(UnitType::Model));
    }

    #[tokio::test]
    async fn direct_strategy_resolves_camelized_keyword() {
        let executor = executor().await;
        let c = classification(Intent::Locate, Scope::Pinpoint, &["user_session"]);
        let outcome = executor.execute("user_session", &c, 10).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Direct);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].identifier, "UserSession");
    }

    #[tokio::test]
    async fn direct_strategy_falls_back_to_keyword() {
        let executor = executor().await;
        let c = classification(Intent::Locate, Scope::Pinpoint, &["sessions"]);
        let outcome = executor.execute("sessions", &c, 10).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Keyword);
        assert_eq!(outcome.candidates[0].identifier, "SessionsController");
    }

    #[tokio::test]
    async fn hybrid_expands_vector_hits() {
        let executor = executor().await;
        let mut c = classification(Intent::Understand, Scope::Comprehensive, &["invoice"]);
        c.target_type = Some(UnitType::Controller);
        let outcome = executor.execute("controller invoice", &c, 20).await.unwrap();
        assert_eq!(outcome.strategy, Strategy::Hybrid);

        let source = |id: &str| outcome.candidates.iter().find(|c| c.identifier == id).map(|c| c.source);
        assert_eq!(source("SessionsController"), Some(CandidateSource::Vector));
        assert_eq!(source("Billing::Invoice"), Some(CandidateSource::Keyword));
        assert_eq!(source("UserSession"), Some(CandidateSource::GraphExpansion));
        assert_eq!(source("User"), Some(CandidateSource::GraphExpansion));
        assert_eq!(outcome.candidates.len(), 4);

        let expansion = outcome.candidates.iter().find(|c| c.identifier == "User").unwrap();
        assert_eq!(expansion.score, 0.5);
        assert_eq!(expansion.unit_type(), Some(UnitType::Model));
    }

    #[tokio::test]
    async fn zero_hits_yield_empty_candidates() {
        let executor = executor().await;
        let c = classification(Intent::Locate, Scope::Focused, &["zzzz"]);
        let outcome = executor.execute("where is zzzz", &c, 10).await.unwrap();
        assert!(outcome.candidates.is_empty());

        let c = classification(Intent::Trace, Scope::Focused, &[]);
        assert!(executor.execute("trace", &c, 10).await.unwrap().candidates.is_empty());
    }
}
