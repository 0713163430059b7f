//! Token-budgeted context assembly.
//!
//! The budget is split into sections up front, then each section is packed
//! greedily with its candidates in score order:
//!
//! ```text
//! budget ──> structural (share %, only with an overview)
//!        └─> remainder ──> primary / supporting / framework
//!                          55 / 25 / 20  with framework context
//!                          65 / 35 / 0   otherwise
//! ```

use crate::config::RetrievalConfig;
use crate::types::{AssembledContext, Candidate, CandidateSource, Classification, Section, SourceAttribution};
use codectx_units::{HeuristicEstimator, TokenEstimator, Unit, UnitType};
use std::collections::HashMap;
use std::sync::Arc;

const TRUNCATION_MARKER: &str = "\n... [truncated]";
const BLOCK_SEPARATOR: &str = "\n\n";
const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Token budget per section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetAllocation {
    pub structural: usize,
    pub primary: usize,
    pub supporting: usize,
    pub framework: usize,
}

impl BudgetAllocation {
    pub fn for_section(&self, section: Section) -> usize {
        match section {
            Section::Structural => self.structural,
            Section::Primary => self.primary,
            Section::Supporting => self.supporting,
            Section::Framework => self.framework,
        }
    }
}

fn percent(value: usize, pct: usize) -> usize {
    value * pct / 100
}

/// One rendered candidate
struct Block {
    text: String,
    tokens: usize,
    truncated: bool,
}

pub struct ContextAssembler {
    budget: usize,
    min_useful_tokens: usize,
    structural_share: usize,
    framework_types: Vec<UnitType>,
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextAssembler {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            budget: config.budget,
            min_useful_tokens: config.min_useful_tokens,
            structural_share: config.structural_share,
            framework_types: config.framework_types.clone(),
            estimator: Arc::new(HeuristicEstimator),
        }
    }

    #[must_use]
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn allocate(&self, framework_context: bool, has_structural: bool) -> BudgetAllocation {
        let structural = if has_structural {
            percent(self.budget, self.structural_share)
        } else {
            0
        };
        let remainder = self.budget - structural;
        let (primary, supporting, framework) = if framework_context { (55, 25, 20) } else { (65, 35, 0) };
        BudgetAllocation {
            structural,
            primary: percent(remainder, primary),
            supporting: percent(remainder, supporting),
            framework: percent(remainder, framework),
        }
    }

    fn unit_type(&self, candidate: &Candidate, unit: Option<&Unit>) -> Option<UnitType> {
        unit.map(|u| u.unit_type.clone()).or_else(|| candidate.unit_type())
    }

    fn section_of(&self, candidate: &Candidate, unit_type: Option<&UnitType>) -> Section {
        let origins = candidate.origins();
        if !origins.is_empty() && origins.iter().all(|o| *o == CandidateSource::GraphExpansion) {
            Section::Supporting
        } else if unit_type.is_some_and(|t| self.framework_types.contains(t)) {
            Section::Framework
        } else {
            Section::Primary
        }
    }

    fn render(&self, candidate: &Candidate, unit_type: Option<&UnitType>, unit: Option<&Unit>) -> String {
        let mut text = match unit_type {
            Some(t) => format!("### {} ({})", candidate.identifier, t.as_str()),
            None => format!("### {}", candidate.identifier),
        };
        if let Some(path) = file_path(candidate, unit) {
            text.push_str("\nFile: ");
            text.push_str(&path);
        }
        if let Some(source) = unit.and_then(|u| u.source_code.as_deref()).filter(|s| !s.is_empty()) {
            text.push_str("\n\n");
            text.push_str(source);
        }
        text
    }

    /// Longest char prefix of `text` that, with the marker appended, fits
    /// within `max_tokens`
    fn truncate(&self, text: &str, max_tokens: usize) -> Option<Block> {
        let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).chain([text.len()]).collect();
        let fits = |end: usize| {
            let candidate = format!("{}{TRUNCATION_MARKER}", &text[..end]);
            self.estimator.estimate_tokens(&candidate) <= max_tokens
        };

        // boundaries[lo] always fits once the marker alone fits
        if !fits(0) {
            return None;
        }
        let (mut lo, mut hi) = (0, boundaries.len() - 1);
        while lo < hi {
            let mid = (lo + hi).div_ceil(2);
            if fits(boundaries[mid]) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let truncated = format!("{}{TRUNCATION_MARKER}", &text[..boundaries[lo]]);
        Some(Block {
            tokens: self.estimator.estimate_tokens(&truncated),
            text: truncated,
            truncated: true,
        })
    }

    /// Greedy fit: append while blocks fit; the first block that does not
    /// fit is truncated when enough budget remains, and the section stops.
    fn fit(&self, text: String, remaining: usize) -> Fit {
        let tokens = self.estimator.estimate_tokens(&text);
        if tokens <= remaining {
            return Fit::Whole(Block {
                text,
                tokens,
                truncated: false,
            });
        }
        if remaining > self.min_useful_tokens {
            if let Some(block) = self.truncate(&text, remaining) {
                return Fit::Partial(block);
            }
        }
        Fit::Stop
    }

    pub fn assemble(
        &self,
        candidates: &[Candidate],
        classification: &Classification,
        structural_context: Option<&str>,
        units: &HashMap<String, Unit>,
    ) -> AssembledContext {
        let structural_context = structural_context.map(str::trim).filter(|s| !s.is_empty());
        let allocation = self.allocate(classification.framework_context, structural_context.is_some());

        let mut rendered: Vec<(Section, String)> = Vec::new();
        let mut sources: Vec<SourceAttribution> = Vec::new();
        let mut tokens_used = 0;

        if let Some(overview) = structural_context {
            if let Fit::Whole(block) | Fit::Partial(block) = self.fit(overview.to_string(), allocation.structural) {
                tokens_used += block.tokens;
                rendered.push((Section::Structural, block.text));
            }
        }

        let mut ordered: Vec<&Candidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

        for section in [Section::Primary, Section::Supporting, Section::Framework] {
            let mut remaining = allocation.for_section(section);
            let mut blocks: Vec<String> = Vec::new();

            for candidate in &ordered {
                let unit = units.get(&candidate.identifier);
                let unit_type = self.unit_type(candidate, unit);
                if self.section_of(candidate, unit_type.as_ref()) != section {
                    continue;
                }

                let (block, stop) = match self.fit(self.render(candidate, unit_type.as_ref(), unit), remaining) {
                    Fit::Whole(block) => (block, false),
                    Fit::Partial(block) => (block, true),
                    Fit::Stop => break,
                };
                remaining -= block.tokens;
                tokens_used += block.tokens;
                sources.push(SourceAttribution {
                    identifier: candidate.identifier.clone(),
                    unit_type,
                    score: candidate.score,
                    file_path: file_path(candidate, unit),
                    section,
                    truncated: block.truncated,
                });
                blocks.push(block.text);
                if stop {
                    break;
                }
            }

            if !blocks.is_empty() {
                rendered.push((section, blocks.join(BLOCK_SEPARATOR)));
            }
        }

        let sections: Vec<Section> = rendered.iter().map(|(section, _)| *section).collect();
        let context = rendered
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        log::debug!(
            "Assembled {} sources into {tokens_used}/{} tokens ({} sections)",
            sources.len(),
            self.budget,
            sections.len()
        );

        AssembledContext {
            context,
            tokens_used,
            budget: self.budget,
            sources,
            sections,
        }
    }
}

enum Fit {
    Whole(Block),
    Partial(Block),
    Stop,
}

fn file_path(candidate: &Candidate, unit: Option<&Unit>) -> Option<String> {
    unit.and_then(|u| u.file_path.clone()).or_else(|| {
        candidate
            .metadata
            .get("file_path")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    })
}
