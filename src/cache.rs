use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

pub const INDEX_PAGE_FRAGMENT: &str = "index_page";

/// Rendered page fragments with a fixed time to live.
///
/// Entries are never invalidated by writes; readers see stale fragments until
/// they expire.
#[derive(Debug)]
pub struct FragmentCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl FragmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Key for `fragment`, varied on the given values.
    pub fn key(fragment: &str, vary_on: &[&dyn std::fmt::Display]) -> String {
        let mut key = String::from(fragment);
        for value in vary_on {
            key.push(':');
            key.push_str(&value.to_string());
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((stored_at, fragment)) if stored_at.elapsed() < self.ttl => {
                Some(fragment.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, fragment: String) {
        if !self.is_enabled() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), fragment));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_varies_on_values() {
        assert_eq!(FragmentCache::key(INDEX_PAGE_FRAGMENT, &[]), "index_page");
        assert_eq!(FragmentCache::key(INDEX_PAGE_FRAGMENT, &[&2]), "index_page:2");
    }

    #[test]
    fn returns_fresh_fragment() {
        let cache = FragmentCache::new(Duration::from_secs(20));
        cache.insert("index_page:1".to_string(), "{}".to_string());
        assert_eq!(cache.get("index_page:1").as_deref(), Some("{}"));
        assert_eq!(cache.get("index_page:2"), None);
    }

    #[test]
    fn expired_fragment_is_dropped() {
        let cache = FragmentCache::new(Duration::from_millis(10));
        cache.insert("index_page:1".to_string(), "{}".to_string());
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("index_page:1"), None);
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = FragmentCache::new(Duration::ZERO);
        cache.insert("index_page:1".to_string(), "{}".to_string());
        assert_eq!(cache.get("index_page:1"), None);
    }
}
