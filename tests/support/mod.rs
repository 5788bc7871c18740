//! Shared fakes for black-box integration tests: a deterministic
//! in-process `EmbeddingProvider` and `TextGenerationProvider`, neither of
//! which touches the network.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use athenaeum_core::{EmbeddingProvider, LibraryResult, TextGenerationProvider};

/// Embeds by hashing each word into a fixed-size bag-of-words vector.
/// Deterministic and stable across calls, so cosine similarity behaves
/// predictably in tests without pulling in a real model.
pub struct HashEmbedder {
    pub dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        HashEmbedder { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, inputs: &[String]) -> LibraryResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|text| embed_text(text, self.dimension)).collect())
    }
}

pub fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0_f32; dimension];
    for word in text.split_whitespace() {
        let mut hash: u64 = 1469598103934665603;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        vector[(hash as usize) % dimension] += 1.0;
    }
    if vector.iter().all(|v| *v == 0.0) {
        vector[0] = 1.0;
    }
    vector
}

/// Returns a fixed canned response regardless of prompt, and records every
/// prompt it was called with for assertions.
pub struct CannedGenerator {
    pub response: String,
    pub calls: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        CannedGenerator {
            response: response.into(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerationProvider for CannedGenerator {
    async fn generate(&self, prompt: &str, _system_prompt: Option<&str>) -> LibraryResult<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

pub fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
