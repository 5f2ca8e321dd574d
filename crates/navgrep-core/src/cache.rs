use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Default number of file bodies kept for repeated hovers.
pub const DEFAULT_CONTENT_CACHE_ENTRIES: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub repo: String,
    pub revision: String,
    pub path: String,
}

impl ContentKey {
    pub fn new(repo: &str, revision: &str, path: &str) -> Self {
        Self {
            repo: repo.to_string(),
            revision: revision.to_string(),
            path: path.to_string(),
        }
    }
}

/// Bounded map from repo/revision/path to previously fetched file content.
pub struct ContentCache {
    entries: Mutex<LruCache<ContentKey, Arc<str>>>,
}

impl ContentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &ContentKey) -> Option<Arc<str>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: ContentKey, content: Arc<str>) {
        self.entries.lock().put(key, content);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_CACHE_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used_entry() {
        let cache = ContentCache::new(2);
        let a = ContentKey::new("r", "v", "a");
        let b = ContentKey::new("r", "v", "b");
        let c = ContentKey::new("r", "v", "c");
        cache.insert(a.clone(), Arc::from("A"));
        cache.insert(b.clone(), Arc::from("B"));
        assert_eq!(cache.get(&a).as_deref(), Some("A"));
        cache.insert(c.clone(), Arc::from("C"));
        assert!(cache.get(&b).is_none());
        assert_eq!(cache.get(&a).as_deref(), Some("A"));
        assert_eq!(cache.get(&c).as_deref(), Some("C"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = ContentCache::new(0);
        cache.insert(ContentKey::new("r", "v", "a"), Arc::from("A"));
        assert_eq!(cache.len(), 1);
    }
}
