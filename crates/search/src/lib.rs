//! # codectx search
//!
//! Query-time retrieval over indexed units.
//!
//! ```text
//! query ──> QueryClassifier ──> SearchExecutor ──> Ranker ──> ContextAssembler
//!           intent/scope/       vector|keyword|     RRF +      token-budgeted
//!           keywords            graph|hybrid|direct  signals    sections
//! ```
//!
//! [`Retriever`] runs the whole pipeline; each stage is usable on its own.
//!
//! ## Example
//!
//! ```no_run
//! use codectx_search::{RetrievalConfig, Retriever};
//! use codectx_stores::{StoreBuilder, StoreConfig};
//! use codectx_units::{Unit, UnitType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stores = StoreBuilder::new(StoreConfig::default()).build()?;
//!     let graph = stores.index_units(vec![Unit::new("User", UnitType::Model)]).await?;
//!
//!     let retriever = Retriever::new(&stores, RetrievalConfig::default())?.with_graph(&graph);
//!     let result = retriever.retrieve("how does user authentication work?").await?;
//!     println!("{}", result.context);
//!     Ok(())
//! }
//! ```

mod assembler;
mod classifier;
mod config;
mod error;
mod executor;
mod fusion;
mod ranker;
mod retriever;
mod types;

pub use assembler::{BudgetAllocation, ContextAssembler};
pub use classifier::QueryClassifier;
pub use config::{RankingWeights, RetrievalConfig};
pub use error::{Result, SearchError};
pub use executor::{select_strategy, SearchExecutor};
pub use fusion::{fuse as rrf_fuse, DEFAULT_RRF_K};
pub use ranker::{importance_signal, recency_signal, type_match_signal, Ranker, Signals};
pub use retriever::Retriever;
pub use types::{
    AssembledContext, Candidate, CandidateSource, Classification, Intent, RetrievalResult, Scope, SearchOutcome,
    Section, SourceAttribution, SourceSummary, Strategy,
};
