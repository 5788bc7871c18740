//! Hierarchical topic index. Topic paths are slash-separated
//! (`code/react/hooks`); a topic's descendants are all paths sharing that
//! prefix followed by `/`.

use std::collections::{HashMap, HashSet};

use crate::atoms::metadata_keys;
use crate::atoms::Volume;

/// Default cap on automatically-extracted topics per volume.
pub const DEFAULT_MAX_TOPICS_PER_ENTRY: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see",
    "two", "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "with",
    "that", "this", "from", "they", "have", "more", "will", "would", "there", "their", "what",
    "about", "which", "when", "make", "like", "time", "just", "know", "take", "into", "your",
    "some", "could", "them", "than", "then", "were", "these", "been", "being", "here", "also",
];

#[derive(Debug, Default)]
pub struct TopicIndex {
    direct: HashMap<String, HashSet<String>>,
    children: HashMap<String, HashSet<String>>,
    co_occurrence: HashMap<(String, String), u64>,
    max_topics_per_entry: usize,
}

impl TopicIndex {
    pub fn new() -> Self {
        TopicIndex {
            max_topics_per_entry: DEFAULT_MAX_TOPICS_PER_ENTRY,
            ..Default::default()
        }
    }

    pub fn with_max_topics_per_entry(max_topics_per_entry: usize) -> Self {
        TopicIndex {
            max_topics_per_entry,
            ..Default::default()
        }
    }

    /// Extract topics for `volume` using the priority order (i)
    /// `metadata.topics` JSON array, (ii) `metadata.topic` comma-separated,
    /// (iii) automatic word-frequency extraction, and index the volume
    /// under each.
    pub fn add_entry(&mut self, volume: &Volume) -> Vec<String> {
        let topics = extract_topics(volume, self.max_topics_per_entry);
        for topic in &topics {
            self.direct.entry(topic.clone()).or_default().insert(volume.id.clone());
            self.register_ancestry(topic);
        }
        for i in 0..topics.len() {
            for j in (i + 1)..topics.len() {
                self.bump_co_occurrence(&topics[i], &topics[j]);
            }
        }
        topics
    }

    /// Remove `id` from every topic in `topics` (as returned by a prior
    /// `add_entry` call for that volume).
    pub fn remove_entry(&mut self, id: &str, topics: &[String]) {
        for topic in topics {
            if let Some(ids) = self.direct.get_mut(topic) {
                ids.remove(id);
            }
        }
    }

    fn register_ancestry(&mut self, path: &str) {
        let mut current = path.to_string();
        while let Some((parent, _)) = current.rsplit_once('/') {
            self.children.entry(parent.to_string()).or_default().insert(current.clone());
            current = parent.to_string();
        }
    }

    fn bump_co_occurrence(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        let key = canonical_pair(a, b);
        *self.co_occurrence.entry(key).or_insert(0) += 1;
    }

    /// The union of a topic's direct ids and all descendants' ids.
    pub fn get_entries(&self, topic: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let prefix = format!("{topic}/");
        for (path, ids) in &self.direct {
            if path == topic || path.starts_with(&prefix) {
                result.extend(ids.iter().cloned());
            }
        }
        result
    }

    /// Direct child paths of `topic`.
    pub fn get_children(&self, topic: &str) -> HashSet<String> {
        self.children.get(topic).cloned().unwrap_or_default()
    }

    /// All known topic paths with at least one directly-assigned id.
    pub fn all_topics(&self) -> Vec<String> {
        self.direct.keys().cloned().collect()
    }

    /// Topics that have co-occurred with `topic` on the same volume, with
    /// their co-occurrence counts.
    pub fn get_related_topics(&self, topic: &str) -> Vec<(String, u64)> {
        let mut related = Vec::new();
        for ((a, b), count) in &self.co_occurrence {
            if a == topic {
                related.push((b.clone(), *count));
            } else if b == topic {
                related.push((a.clone(), *count));
            }
        }
        related
    }

    /// Reassign all ids directly under `from` to `to`, and migrate
    /// `from`'s co-occurrence counters onto `to` (merging counts with any
    /// counter `to` already had with the same partner).
    pub fn merge_topic(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some(ids) = self.direct.remove(from) {
            self.direct.entry(to.to_string()).or_default().extend(ids);
        }
        self.register_ancestry(to);

        let stale: Vec<(String, String)> = self
            .co_occurrence
            .keys()
            .filter(|(a, b)| a == from || b == from)
            .cloned()
            .collect();

        for key in stale {
            if let Some(count) = self.co_occurrence.remove(&key) {
                let (a, b) = key;
                let partner = if a == from { b } else { a };
                if partner == to {
                    continue;
                }
                let new_key = canonical_pair(to, &partner);
                *self.co_occurrence.entry(new_key).or_insert(0) += count;
            }
        }
    }

    pub fn clear(&mut self) {
        self.direct.clear();
        self.children.clear();
        self.co_occurrence.clear();
    }
}

fn canonical_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn extract_topics(volume: &Volume, max_topics: usize) -> Vec<String> {
    if let Some(raw) = volume.metadata.get(metadata_keys::TOPICS) {
        if let Ok(parsed) = serde_json::from_str::<Vec<String>>(raw) {
            if !parsed.is_empty() {
                return parsed.into_iter().take(max_topics).collect();
            }
        }
    }

    if let Some(raw) = volume.metadata.get(metadata_keys::TOPIC) {
        let parsed: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            return parsed.into_iter().take(max_topics).collect();
        }
    }

    auto_extract_topics(&volume.text, max_topics)
}

fn auto_extract_topics(text: &str, max_topics: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for raw_token in text.split_whitespace() {
        let token: String = raw_token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if token.chars().count() <= 2 {
            continue;
        }
        if STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(max_topics).map(|(t, _)| t).collect()
}
