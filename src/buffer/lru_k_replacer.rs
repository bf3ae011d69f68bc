use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::PageId;

type Timestamp = u64;

/// Access history of one cached page
#[derive(Debug, Default)]
struct AccessHistory {
    /// Most recent access at the back, at most k entries
    history: VecDeque<Timestamp>,
}

impl AccessHistory {
    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance, or None (+inf) with fewer than k accesses.
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Timestamp {
        self.history.front().copied().unwrap_or(0)
    }
}

/// Eviction order key; smaller keys are evicted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Priority {
    /// Fewer than k accesses, ordered by first access
    Infinite(Timestamp),
    /// Ordered by descending backward k-distance
    Finite(Reverse<Timestamp>),
}

/// LRU-K replacement policy over cached pages.
///
/// The victim is the page whose backward k-distance (time since its kth most
/// recent access) is largest. Pages with fewer than k accesses count as +inf;
/// ties among them go to the page accessed earliest.
///
/// The replacer knows nothing about dirtiness. `evict_where` asks the caller
/// which candidates may go, in eviction order, so the buffer pool can skip
/// dirty or borrowed pages.
pub struct LruKReplacer {
    k: usize,
    current_timestamp: AtomicU64,
    pages: Mutex<HashMap<PageId, AccessHistory>>,
}

impl LruKReplacer {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            current_timestamp: AtomicU64::new(0),
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Records an access to `page_id` at the current timestamp.
    pub fn record_access(&self, page_id: PageId) {
        let timestamp = self.current_timestamp.fetch_add(1, Ordering::Relaxed);
        self.pages
            .lock()
            .entry(page_id)
            .or_default()
            .record_access(timestamp, self.k);
    }

    /// Evicts the page with the largest backward k-distance among those for
    /// which `evictable` returns true.
    pub fn evict_where<F>(&self, mut evictable: F) -> Option<PageId>
    where
        F: FnMut(&PageId) -> bool,
    {
        let mut pages = self.pages.lock();
        let now = self.current_timestamp.load(Ordering::Relaxed);

        let mut candidates: Vec<(Priority, PageId)> = pages
            .iter()
            .map(|(page_id, info)| {
                let priority = match info.k_distance(now, self.k) {
                    None => Priority::Infinite(info.earliest_timestamp()),
                    Some(distance) => Priority::Finite(Reverse(distance)),
                };
                (priority, *page_id)
            })
            .collect();
        candidates.sort_unstable();

        let victim = candidates
            .into_iter()
            .map(|(_, page_id)| page_id)
            .find(|page_id| evictable(page_id))?;
        pages.remove(&victim);
        Some(victim)
    }

    /// Evicts the best candidate unconditionally.
    pub fn evict(&self) -> Option<PageId> {
        self.evict_where(|_| true)
    }

    /// Forgets `page_id`, e.g. when its cached copy is discarded.
    pub fn remove(&self, page_id: PageId) {
        self.pages.lock().remove(&page_id);
    }

    /// Returns the number of tracked pages.
    pub fn size(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn page(no: u32) -> PageId {
        PageId::new(TableId::new(7), no)
    }

    #[test]
    fn test_lru_k_replacer_new() {
        let replacer = LruKReplacer::new(2);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.k(), 2);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_k_replacer_basic() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(0));
        replacer.record_access(page(1));
        replacer.record_access(page(2));
        assert_eq!(replacer.size(), 3);

        // All have +inf distance; earliest access goes first
        assert_eq!(replacer.evict(), Some(page(0)));
        assert_eq!(replacer.size(), 2);
    }

    #[test]
    fn test_lru_k_replacer_infinite_before_finite() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(1));
        replacer.record_access(page(0));
        replacer.record_access(page(0));

        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(0)));
    }

    #[test]
    fn test_lru_k_replacer_largest_k_distance() {
        let replacer = LruKReplacer::new(2);
        for no in 0..3 {
            replacer.record_access(page(no));
            replacer.record_access(page(no));
        }

        assert_eq!(replacer.evict(), Some(page(0)));
        assert_eq!(replacer.evict(), Some(page(1)));
        assert_eq!(replacer.evict(), Some(page(2)));
    }

    #[test]
    fn test_lru_k_replacer_predicate_skips_pages() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(0));
        replacer.record_access(page(1));

        assert_eq!(replacer.evict_where(|p| *p != page(0)), Some(page(1)));
        assert_eq!(replacer.evict_where(|p| *p != page(0)), None);
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_lru_k_replacer_remove() {
        let replacer = LruKReplacer::new(2);
        replacer.record_access(page(0));
        replacer.remove(page(0));

        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }
}
