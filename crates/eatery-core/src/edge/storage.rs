use std::collections::HashMap;

use crate::api::HttpResponse;

/// One named cache: responses keyed by request URL.
#[derive(Debug, Default, Clone)]
pub struct ResponseCache {
    entries: HashMap<String, HttpResponse>,
}

impl ResponseCache {
    pub fn get(&self, url: &str) -> Option<&HttpResponse> {
        self.entries.get(url)
    }

    pub fn put(&mut self, url: &str, response: HttpResponse) {
        self.entries.insert(url.to_string(), response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All named caches owned by the edge worker, in creation order.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: Vec<(String, ResponseCache)>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cache with this name, creating it if needed.
    pub fn open(&mut self, name: &str) -> &mut ResponseCache {
        let index = match self.caches.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.caches.push((name.to_string(), ResponseCache::default()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[index].1
    }

    pub fn keys(&self) -> Vec<String> {
        self.caches.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.caches.len();
        self.caches.retain(|(n, _)| n != name);
        self.caches.len() != before
    }

    /// Look the URL up in every cache, oldest first.
    pub fn match_url(&self, url: &str) -> Option<&HttpResponse> {
        self.caches.iter().find_map(|(_, cache)| cache.get(url))
    }

    pub fn sizes(&self) -> Vec<(String, usize)> {
        self.caches
            .iter()
            .map(|(n, cache)| (n.clone(), cache.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_once() {
        let mut storage = CacheStorage::new();
        storage.open("restaurant-static-v1").put("/", HttpResponse::new(200, "shell"));
        storage.open("restaurant-static-v1");
        assert_eq!(storage.keys(), vec!["restaurant-static-v1"]);
        assert_eq!(storage.open("restaurant-static-v1").len(), 1);
    }

    #[test]
    fn test_match_searches_every_cache() {
        let mut storage = CacheStorage::new();
        storage.open("a").put("/one", HttpResponse::new(200, "1"));
        storage.open("b").put("/two", HttpResponse::new(200, "2"));

        assert_eq!(storage.match_url("/two").map(|r| r.text()), Some("2".to_string()));
        assert!(storage.match_url("/three").is_none());
    }

    #[test]
    fn test_delete() {
        let mut storage = CacheStorage::new();
        storage.open("old");
        assert!(storage.delete("old"));
        assert!(!storage.delete("old"));
        assert!(storage.keys().is_empty());
    }
}
