//! Two inner maps supporting O(1) candidate lookup for simple equality
//! filters: key -> {ids} and (key,value) -> {ids}.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct MetadataIndex {
    by_key: HashMap<String, HashSet<String>>,
    by_key_value: HashMap<(String, String), HashSet<String>>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        MetadataIndex::default()
    }

    pub fn insert(&mut self, id: &str, metadata: &HashMap<String, String>) {
        for (key, value) in metadata {
            self.by_key.entry(key.clone()).or_default().insert(id.to_string());
            self.by_key_value
                .entry((key.clone(), value.clone()))
                .or_default()
                .insert(id.to_string());
        }
    }

    pub fn remove(&mut self, id: &str, metadata: &HashMap<String, String>) {
        for (key, value) in metadata {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
            let kv = (key.clone(), value.clone());
            if let Some(ids) = self.by_key_value.get_mut(&kv) {
                ids.remove(id);
                if ids.is_empty() {
                    self.by_key_value.remove(&kv);
                }
            }
        }
    }

    pub fn ids_with_key(&self, key: &str) -> HashSet<String> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    pub fn ids_with_key_value(&self, key: &str, value: &str) -> HashSet<String> {
        self.by_key_value
            .get(&(key.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_key_value.clear();
    }
}
