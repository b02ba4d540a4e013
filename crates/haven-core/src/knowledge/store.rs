//! Sled-backed passage store with best-effort similarity lookup.
//!
//! Passages are JSON records in a single named tree. Lookup embeds the
//! query with a placeholder (non-semantic) vector, scores every stored
//! passage by cosine similarity, and returns the top matches. The caller
//! treats every failure here as "no results".

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use uuid::Uuid;

const TREE_NAME: &str = "passages";

/// Fixed length of placeholder embedding vectors.
pub const EMBEDDING_DIMS: usize = 384;

/// Supporting passage retrievable for prompt context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: Uuid,
    /// Citation title surfaced to the caller alongside the reply.
    pub title: String,
    pub text: String,
    /// Embedding of `text`, produced by [`stub_embedding`] until a real
    /// embeddings backend is wired in.
    pub embedding: Vec<f32>,
}

impl Passage {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let embedding = stub_embedding(&text);
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            text,
            embedding,
        }
    }

    /// Deserializes from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// Read-mostly passage store. One sled tree, JSON values, keyed by caller
/// slug. Shared across requests behind an `Arc`; sled handles internal
/// locking.
pub struct PassageStore {
    _db: Db,
    tree: sled::Tree,
}

impl PassageStore {
    /// Opens (or creates) the store at the given path.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { _db: db, tree })
    }

    pub fn insert(&self, key: &str, passage: &Passage) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(passage)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Passage>, StoreError> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Scores every stored passage against the query vector and returns the
    /// `limit` most similar, best first. Records that fail to decode are
    /// skipped rather than failing the lookup.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<Passage>, StoreError> {
        let mut scored: Vec<(f32, Passage)> = Vec::new();
        for entry in self.tree.iter() {
            let (_key, bytes) = entry?;
            if let Some(passage) = Passage::from_bytes(&bytes) {
                let score = cosine_similarity(query, &passage.embedding);
                scored.push((score, passage));
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero
/// norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Placeholder embedding: a fixed-length vector derived from an FNV-1a hash
/// of the text, expanded with an LCG. Not semantic — equal texts map to
/// equal vectors and nothing more — but deterministic, so lookups are
/// repeatable under test.
pub fn stub_embedding(text: &str) -> Vec<f32> {
    let mut state: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        state ^= u64::from(byte);
        state = state.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut out = Vec::with_capacity(EMBEDDING_DIMS);
    for _ in 0..EMBEDDING_DIMS {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Top 24 bits scaled into [0, 1), then shifted to [-1.0, 1.0).
        let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
        out.push(unit * 2.0 - 1.0);
    }
    out
}
