use std::collections::HashMap;

use log::debug;

use crate::prompt::{Model, SummaryLength};

/// Generated summaries keyed by `videoId|language|length|model`.
///
/// Entries live until [`SummaryCache::clear`]; there is no eviction.
#[derive(Debug, Clone, Default)]
pub struct SummaryCache {
    entries: HashMap<String, String>,
}

impl SummaryCache {
    pub fn key(video_id: &str, language: &str, length: SummaryLength, model: Model) -> String {
        [video_id, language, length.value(), model.value()].join("|")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let hit = self.entries.get(key).map(String::as_str);
        if hit.is_some() {
            debug!("Summary cache hit: {key}");
        }
        hit
    }

    pub fn insert(&mut self, key: String, summary: String) {
        debug!("Cached summary: {key}");
        self.entries.insert(key, summary);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
