// src/index/embedder.rs
use sha2::{Digest, Sha256};

/// Text → fixed-size dense vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
    fn dimension(&self) -> usize;
}

/// Deterministic feature-hashing embedder (no model download, no network).
///
/// Each lower-cased alphanumeric token is hashed into a bucket with a ±1 sign;
/// the resulting vector is L2-normalized so a dot product is cosine similarity.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub const DEFAULT_DIM: usize = 256;

    /// `dim` of zero falls back to [`Self::DEFAULT_DIM`].
    pub fn new(dim: usize) -> Self {
        Self {
            dim: if dim == 0 { Self::DEFAULT_DIM } else { dim },
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIM)
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn bucket(token: &str, dim: usize) -> (usize, f32) {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let h = u64::from_le_bytes(head);
    let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
    ((h % dim as u64) as usize, sign)
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for tok in tokenize(text) {
            let (i, sign) = bucket(&tok, self.dim);
            v[i] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Dot product; equals cosine similarity for normalized inputs.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
