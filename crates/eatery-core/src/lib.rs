//! Offline-first data layer for a restaurant directory.
//!
//! Front ends talk to a [`Directory`], which serves restaurants and reviews
//! from a versioned local store, falls back to the remote API through a
//! [`Gateway`], and parks writes made while offline until connectivity
//! returns. Requests can optionally be routed through an HTTP-level edge
//! cache ([`EdgeCacheHandle`]) that pre-caches the application shell.

pub mod api;
pub mod config;
pub mod directory;
pub mod edge;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;

pub use api::{Gateway, HttpGateway, ReqwestTransport, Transport};
pub use config::Config;
pub use directory::{CacheStatus, Delivery, Directory, DirectoryError};
pub use edge::{EdgeCacheConfig, EdgeCacheHandle};
pub use models::{FavoriteUpdate, Restaurant, Review};
pub use store::LocalStore;
pub use sync::{Connectivity, SyncReport};
