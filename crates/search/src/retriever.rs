use crate::assembler::ContextAssembler;
use crate::classifier::QueryClassifier;
use crate::config::RetrievalConfig;
use crate::error::{Result, SearchError};
use crate::executor::{select_strategy, SearchExecutor};
use crate::ranker::Ranker;
use crate::types::{RetrievalResult, SourceSummary};
use codectx_graph::{DependencyGraph, GraphAnalyzer, StructuralOverview};
use codectx_stores::StoreSet;

/// classify → execute → rank → assemble, one independent run per query
pub struct Retriever {
    executor: SearchExecutor,
    ranker: Ranker,
    config: RetrievalConfig,
    overview: Option<String>,
}

impl Retriever {
    pub fn new(stores: &StoreSet, config: RetrievalConfig) -> Result<Self> {
        Self::with_executor(SearchExecutor::new(stores), config)
    }

    pub fn with_executor(executor: SearchExecutor, config: RetrievalConfig) -> Result<Self> {
        config.validate().map_err(SearchError::InvalidConfig)?;
        Ok(Self {
            executor,
            ranker: Ranker::new(config.weights, config.rrf_k),
            config,
            overview: None,
        })
    }

    /// Attach the structural overview of `graph` to every assembled context
    #[must_use]
    pub fn with_graph(mut self, graph: &DependencyGraph) -> Self {
        let report = GraphAnalyzer::new(graph).analyze();
        let overview = StructuralOverview::render(graph, Some(&report));
        self.overview = Some(overview).filter(|o| !o.is_empty());
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_with_budget(query, self.config.budget).await
    }

    pub async fn retrieve_with_budget(&self, query: &str, budget: usize) -> Result<RetrievalResult> {
        let query = query.trim();
        if query.is_empty() {
            log::debug!("Blank query, nothing to retrieve");
            let classification = QueryClassifier::classify(query);
            return Ok(RetrievalResult {
                query: String::new(),
                strategy: select_strategy(&classification),
                classification,
                context: String::new(),
                sources: Vec::new(),
                tokens_used: 0,
                budget,
                sections: Vec::new(),
            });
        }

        let classification = QueryClassifier::classify(query);
        let outcome = self.executor.execute(query, &classification, self.config.limit).await?;

        // One batched fetch serves both ranking and assembly
        let ids: Vec<String> = outcome.candidates.iter().map(|c| c.identifier.clone()).collect();
        let units = if ids.is_empty() {
            Default::default()
        } else {
            self.executor.metadata().find_batch(&ids).await?
        };

        let ranked = self.ranker.rank(outcome.candidates, &classification, &units);
        let assembled = ContextAssembler::new(&self.config)
            .with_budget(budget)
            .assemble(&ranked, &classification, self.overview.as_deref(), &units);

        log::info!(
            "Retrieved '{query}': strategy={}, {} sources, {}/{} tokens",
            outcome.strategy,
            assembled.sources.len(),
            assembled.tokens_used,
            assembled.budget
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            classification,
            strategy: outcome.strategy,
            sources: assembled.sources.iter().map(SourceSummary::from).collect(),
            context: assembled.context,
            tokens_used: assembled.tokens_used,
            budget: assembled.budget,
            sections: assembled.sections,
        })
    }
}
