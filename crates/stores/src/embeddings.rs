use crate::error::Result;
use crate::traits::EmbeddingProvider;
use async_trait::async_trait;
use codectx_units::Unit;
use sha2::{Digest, Sha256};

pub const DEFAULT_DIMENSION: usize = 128;

/// Deterministic bag-of-tokens embedder.
///
/// Every token maps to a fixed pseudo-random unit vector drawn from an RNG
/// seeded by the token's hash; a text's embedding is the normalized sum of
/// its token vectors. Texts sharing words therefore land close together, which is
/// enough to drive the retrieval pipeline without a model download.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous embedding, shared by the async trait impl
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            for (acc, value) in sum.iter_mut().zip(token_vector(&token, self.dimension)) {
                *acc += value;
            }
        }
        normalize(&mut sum);
        sum
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Text indexed for a unit: identifier, namespace, path and source
pub fn embedding_text(unit: &Unit) -> String {
    let mut parts: Vec<&str> = vec![unit.identifier.as_str()];
    parts.extend(unit.effective_namespace());
    parts.extend(unit.file_path.as_deref());
    parts.extend(unit.source_code.as_deref());
    parts.join("\n")
}

/// Lowercase word tokens; camelCase and `::` boundaries split
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// First eight bytes of the token's SHA-256, so seeds are stable across runs
fn token_seed(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}

fn token_vector(token: &str, dimension: usize) -> Vec<f32> {
    let mut rng = fastrand::Rng::with_seed(token_seed(token));
    let mut vector: Vec<f32> = (0..dimension).map(|_| rng.f32() * 2.0 - 1.0).collect();
    normalize(&mut vector);
    vector
}

fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn normalize(vector: &mut [f32]) {
    let length = magnitude(vector);
    if length > 0.0 {
        vector.iter_mut().for_each(|v| *v /= length);
    }
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denominator = magnitude(a) * magnitude(b);
    if a.len() != b.len() || denominator == 0.0 {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() / denominator
}
