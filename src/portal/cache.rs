//! The sticky placement cache: remembers the last successful destination
//! for a `(type, id)` under sticky placement (§4.3, glossary "Sticky
//! cache"). A plain capacity-bounded LRU; unlike the instance container's
//! LRU, eviction here is synchronous since there is nothing to deactivate.

use std::collections::VecDeque;

use dashmap::DashMap;
use parking_lot::Mutex;

pub struct StickyCache {
    capacity: usize,
    entries: DashMap<String, String>,
    order: Mutex<VecDeque<String>>,
}

impl StickyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    pub fn insert(&self, key: String, destination: String) {
        self.entries.insert(key.clone(), destination);
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == &key) {
            order.remove(pos);
        }
        order.push_back(key);
        while order.len() > self.capacity {
            if let Some(victim) = order.pop_front() {
                self.entries.remove(&victim);
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let cache = StickyCache::new(2);
        cache.insert("a".into(), "app0".into());
        cache.insert("b".into(), "app1".into());
        cache.insert("c".into(), "app2".into());
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some("app1".to_string()));
        assert_eq!(cache.get("c"), Some("app2".to_string()));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = StickyCache::new(4);
        cache.insert("a".into(), "app0".into());
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
    }
}
