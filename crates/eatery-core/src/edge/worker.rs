use std::sync::Arc;

use futures::future::join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::storage::CacheStorage;
use super::EdgeError;
use crate::api::{HttpRequest, HttpResponse, Transport};

/// Every cache this application creates starts with this prefix.
pub const CACHE_PREFIX: &str = "restaurant-";

const DEFAULT_ORIGIN: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeCacheConfig {
    pub enabled: bool,
    /// Cache generation; bumping it makes the next activation drop the old caches.
    pub version: String,
    /// Origin that relative static asset paths are resolved against.
    pub origin: String,
    pub static_assets: Vec<String>,
}

impl Default for EdgeCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            version: "v1".to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            static_assets: vec![
                "/".to_string(),
                "https://unpkg.com/leaflet@1.3.1/dist/leaflet.css".to_string(),
                "/css/styles.css".to_string(),
                "https://unpkg.com/leaflet@1.3.1/dist/leaflet.js".to_string(),
                "/js/main.min.js".to_string(),
                "/js/restaurant.min.js".to_string(),
            ],
        }
    }
}

impl EdgeCacheConfig {
    pub fn static_cache_name(&self) -> String {
        format!("{}static-{}", CACHE_PREFIX, self.version)
    }

    pub fn dynamic_cache_name(&self) -> String {
        format!("{}dynamic-{}", CACHE_PREFIX, self.version)
    }

    /// Caches that survive activation.
    pub fn allow_list(&self) -> [String; 2] {
        [self.static_cache_name(), self.dynamic_cache_name()]
    }

    /// Absolute URLs of the application shell assets.
    pub fn static_urls(&self) -> Vec<String> {
        let origin = self.origin.trim_end_matches('/');
        self.static_assets
            .iter()
            .map(|asset| {
                if asset.starts_with("http://") || asset.starts_with("https://") {
                    asset.clone()
                } else {
                    format!("{}{}", origin, asset)
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Started but not installed; requests pass straight through.
    New,
    Installed,
    /// Controls requests: lookups and dynamic caching happen.
    Active,
}

/// Outcome of looking a request up before deciding whether to hit upstream.
#[derive(Debug)]
pub enum Lookup {
    Hit(HttpResponse),
    /// Not cached; fetch and store the response.
    Miss,
    /// Not handled by the cache at all.
    Bypass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeStats {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub caches: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub precached: usize,
    pub removed_caches: Vec<String>,
}

/// Service worker state: the cache storage plus lifecycle.
pub struct EdgeWorker {
    config: EdgeCacheConfig,
    storage: CacheStorage,
    upstream: Arc<dyn Transport>,
    state: WorkerState,
    stats: EdgeStats,
}

impl EdgeWorker {
    pub fn new(config: EdgeCacheConfig, storage: CacheStorage, upstream: Arc<dyn Transport>) -> Self {
        Self {
            config,
            storage,
            upstream,
            state: WorkerState::New,
            stats: EdgeStats::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn upstream(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.upstream)
    }

    pub fn into_storage(self) -> CacheStorage {
        self.storage
    }

    /// Pre-cache the application shell into the static cache.
    ///
    /// All-or-nothing: if any asset fails to download or answers with a
    /// non-2xx status, nothing is stored and the worker stays uninstalled.
    pub async fn install(&mut self) -> Result<usize, EdgeError> {
        let urls = self.config.static_urls();
        let upstream = self.upstream();
        let results = join_all(
            urls.iter()
                .map(|url| upstream.send(HttpRequest::get(url.clone()))),
        )
        .await;

        let mut fetched = Vec::with_capacity(urls.len());
        for (url, result) in urls.into_iter().zip(results) {
            let response = result.map_err(|e| EdgeError::Precache {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(EdgeError::Precache {
                    url,
                    reason: format!("status {}", response.status),
                });
            }
            fetched.push((url, response));
        }

        let precached = fetched.len();
        let cache = self.storage.open(&self.config.static_cache_name());
        for (url, response) in fetched {
            cache.put(&url, response);
        }
        self.state = WorkerState::Installed;
        info!(precached, cache = %self.config.static_cache_name(), "Edge cache installed");
        Ok(precached)
    }

    /// Take control and delete this application's caches from older versions.
    pub fn activate(&mut self) -> Vec<String> {
        let allow_list = self.config.allow_list();
        let stale: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| name.starts_with(CACHE_PREFIX) && !allow_list.contains(name))
            .collect();
        for name in &stale {
            self.storage.delete(name);
        }

        self.state = WorkerState::Active;
        info!(removed = stale.len(), "Edge cache activated");
        stale
    }

    pub fn lookup(&mut self, request: &HttpRequest) -> Lookup {
        if self.state != WorkerState::Active || request.method != Method::GET {
            self.stats.bypassed += 1;
            return Lookup::Bypass;
        }

        match self.storage.match_url(&request.url) {
            Some(response) => {
                self.stats.hits += 1;
                debug!(url = %request.url, "Edge cache hit");
                Lookup::Hit(response.clone())
            }
            None => {
                self.stats.misses += 1;
                debug!(url = %request.url, "Edge cache miss");
                Lookup::Miss
            }
        }
    }

    /// Keep a fetched response in the dynamic cache.
    pub fn store(&mut self, url: &str, response: HttpResponse) {
        let name = self.config.dynamic_cache_name();
        self.storage.open(&name).put(url, response);
    }

    pub fn stats(&self) -> EdgeStats {
        EdgeStats {
            caches: self.storage.sizes(),
            ..self.stats.clone()
        }
    }
}
