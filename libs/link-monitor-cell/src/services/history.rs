use std::collections::{HashMap, VecDeque};

use crate::models::ProbeResult;

pub const DEFAULT_HISTORY_LEN: usize = 30;

/// Client-side rolling window of recent results per link, fed from
/// `latency_update` events. Clear it whenever monitoring is re-enabled.
#[derive(Debug, Clone)]
pub struct LatencyHistory {
    capacity: usize,
    entries: HashMap<String, VecDeque<ProbeResult>>,
}

impl LatencyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn record(&mut self, result: ProbeResult) {
        let capacity = self.capacity;
        let window = self
            .entries
            .entry(result.id.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if window.len() == capacity {
            window.pop_front();
        }
        window.push_back(result);
    }

    pub fn record_batch<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = ProbeResult>,
    {
        for result in results {
            self.record(result);
        }
    }

    /// Oldest first.
    pub fn history(&self, id: &str) -> Vec<ProbeResult> {
        self.entries
            .get(id)
            .map(|window| window.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn current(&self, id: &str) -> Option<&ProbeResult> {
        self.entries.get(id).and_then(|window| window.back())
    }

    pub fn tracked_links(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LatencyHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
