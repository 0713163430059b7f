/// Pluggable token-count estimation.
///
/// Budgets throughout the retrieval pipeline are expressed in estimated
/// language-model tokens; callers with a real tokenizer plug it in here.
pub trait TokenEstimator: Send + Sync {
    fn estimate_tokens(&self, text: &str) -> usize;
}

/// Character-count heuristic: roughly 4 chars per token for code.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub const CHARS_PER_TOKEN: usize = 4;

    /// Longest prefix (in chars) of text that stays within `tokens`.
    #[must_use]
    pub const fn chars_for_tokens(tokens: usize) -> usize {
        tokens * Self::CHARS_PER_TOKEN
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        chars.div_ceil(Self::CHARS_PER_TOKEN)
    }
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for &T {
    fn estimate_tokens(&self, text: &str) -> usize {
        (**self).estimate_tokens(text)
    }
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for std::sync::Arc<T> {
    fn estimate_tokens(&self, text: &str) -> usize {
        (**self).estimate_tokens(text)
    }
}
