//! Local persistent store for offline data access.
//!
//! This module provides the `LocalStore`, a versioned key-value store with
//! two partitions:
//! - `restaurants`: the whole directory listing under one key
//! - `reviews`: one review list per restaurant id
//!
//! Values are kept as JSON files on disk. When the platform has no usable
//! storage location the store opens as unavailable and behaves as an
//! always-empty cache.

pub mod error;
pub mod local;

pub use error::StoreError;
pub use local::{CachedData, LocalStore, Partition, RESTAURANTS_KEY, STORE_NAME, STORE_VERSION};
