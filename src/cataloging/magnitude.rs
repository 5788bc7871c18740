//! Mapping from id to precomputed L2 magnitude. O(1) lookup; recomputes on
//! miss rather than failing, since the authoritative embedding is always
//! available from the volume table.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MagnitudeCache {
    magnitudes: HashMap<String, f64>,
}

impl MagnitudeCache {
    pub fn new() -> Self {
        MagnitudeCache::default()
    }

    /// Compute and store the L2 magnitude of `embedding` for `id`.
    pub fn set(&mut self, id: &str, embedding: &[f32]) -> f64 {
        let magnitude = l2_norm(embedding);
        self.magnitudes.insert(id.to_string(), magnitude);
        magnitude
    }

    /// Fetch the cached magnitude, recomputing from `embedding` on a miss.
    pub fn get_or_compute(&mut self, id: &str, embedding: &[f32]) -> f64 {
        if let Some(&m) = self.magnitudes.get(id) {
            return m;
        }
        self.set(id, embedding)
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.magnitudes.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) {
        self.magnitudes.remove(id);
    }

    pub fn clear(&mut self) {
        self.magnitudes.clear();
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }
}

pub fn l2_norm(embedding: &[f32]) -> f64 {
    embedding.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_matches_direct_computation() {
        let mut cache = MagnitudeCache::new();
        let embedding = [3.0_f32, 4.0];
        cache.set("a", &embedding);
        assert!((cache.get("a").unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn miss_recomputes_rather_than_panicking() {
        let mut cache = MagnitudeCache::new();
        let embedding = [3.0_f32, 4.0];
        assert!((cache.get_or_compute("a", &embedding) - 5.0).abs() < 1e-9);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = MagnitudeCache::new();
        cache.set("a", &[1.0]);
        cache.remove("a");
        assert!(cache.get("a").is_none());
        cache.set("b", &[1.0]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
