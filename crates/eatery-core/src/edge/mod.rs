//! HTTP-level edge cache, modeled on a page's service worker.
//!
//! The worker runs as its own task and owns its cache storage; the rest of
//! the program only reaches it through an `EdgeCacheHandle`, which is also a
//! `Transport` so gateway requests can be routed through it.
//!
//! Lifecycle:
//! - install: pre-cache the application shell into the static cache, then
//!   activate right away (no waiting for older workers to release control)
//! - activate: delete this application's caches that are not in the
//!   current allow-list
//! - fetch: serve from any cache, otherwise fetch and keep a copy in the
//!   dynamic cache; entries never expire

pub mod handle;
pub mod storage;
pub mod worker;

use thiserror::Error;

pub use handle::EdgeCacheHandle;
pub use storage::{CacheStorage, ResponseCache};
pub use worker::{EdgeCacheConfig, EdgeStats, EdgeWorker, InstallReport, WorkerState, CACHE_PREFIX};

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Failed to pre-cache {url}: {reason}")]
    Precache { url: String, reason: String },

    #[error("Edge cache worker has stopped")]
    Stopped,
}
