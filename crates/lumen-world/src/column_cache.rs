use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::generation::ColumnProfile;

#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Bounded LRU of per-column terrain samples keyed by `(cx, cz)`.
///
/// Every chunk in a vertical stack shares one profile, so stacks only sample
/// the height/biome noise once.
pub struct ColumnCache {
    entries: RwLock<HashMap<(i32, i32), Arc<ColumnProfile>>>,
    order: Mutex<VecDeque<(i32, i32)>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ColumnCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, cx: i32, cz: i32) -> Option<Arc<ColumnProfile>> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|map| map.get(&(cx, cz)).cloned());
        match found {
            Some(profile) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.touch((cx, cz));
                Some(profile)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns the cached profile or builds, caches and returns a new one.
    pub fn get_or_insert_with(
        &self,
        cx: i32,
        cz: i32,
        build: impl FnOnce() -> ColumnProfile,
    ) -> Arc<ColumnProfile> {
        if let Some(profile) = self.get(cx, cz) {
            return profile;
        }
        let profile = Arc::new(build());
        self.insert(Arc::clone(&profile));
        profile
    }

    pub fn insert(&self, profile: Arc<ColumnProfile>) {
        let key = (profile.cx, profile.cz);
        {
            let mut entries = self.entries.write().unwrap();
            entries.insert(key, profile);
        }
        self.remove_from_order(key);
        self.order.lock().unwrap().push_back(key);
        self.enforce_capacity();
    }

    pub fn clear(&self) {
        let removed = {
            let mut entries = self.entries.write().unwrap();
            let len = entries.len() as u64;
            entries.clear();
            len
        };
        if removed > 0 {
            self.evictions.fetch_add(removed, Ordering::Relaxed);
        }
        self.order.lock().unwrap().clear();
    }

    pub fn stats(&self) -> ColumnCacheStats {
        ColumnCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.read().map(|m| m.len()).unwrap_or(0),
        }
    }

    fn touch(&self, key: (i32, i32)) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| *k == key) {
            if let Some(entry) = order.remove(pos) {
                order.push_back(entry);
            }
        }
    }

    fn remove_from_order(&self, key: (i32, i32)) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| *k == key) {
            order.remove(pos);
        }
    }

    fn enforce_capacity(&self) {
        let mut victims = Vec::new();
        {
            let mut order = self.order.lock().unwrap();
            while order.len() > self.capacity {
                if let Some(old) = order.pop_front() {
                    victims.push(old);
                }
            }
        }
        if victims.is_empty() {
            return;
        }
        let mut entries = self.entries.write().unwrap();
        for key in victims {
            if entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Biome, ColumnSample};

    fn profile(cx: i32, cz: i32) -> ColumnProfile {
        ColumnProfile::from_samples(
            cx,
            cz,
            vec![
                ColumnSample {
                    height: 4,
                    biome: Biome::Plains
                };
                crate::CHUNK_AREA
            ],
        )
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ColumnCache::new(2);
        cache.insert(Arc::new(profile(0, 0)));
        cache.insert(Arc::new(profile(1, 0)));
        assert!(cache.get(0, 0).is_some());
        cache.insert(Arc::new(profile(2, 0)));
        assert!(cache.get(1, 0).is_none());
        assert!(cache.get(0, 0).is_some());
        assert!(cache.get(2, 0).is_some());
        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn get_or_insert_with_builds_once() {
        let cache = ColumnCache::new(8);
        let mut built = 0;
        for _ in 0..3 {
            cache.get_or_insert_with(5, -5, || {
                built += 1;
                profile(5, -5)
            });
        }
        assert_eq!(built, 1);
        assert_eq!(cache.stats().hits, 2);
    }
}
