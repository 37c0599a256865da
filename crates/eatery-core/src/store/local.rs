use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::StoreError;
use crate::utils::format_age;

/// Name of the store directory under the cache location.
pub const STORE_NAME: &str = "restaurant";

/// Current schema version. Bump together with a new arm in `run_upgrade_step`.
pub const STORE_VERSION: u32 = 2;

/// Key the whole restaurant listing is stored under.
pub const RESTAURANTS_KEY: &str = "restaurants-list";

/// Marker file holding the schema version the store was last upgraded to.
const VERSION_FILE: &str = "version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Restaurants,
    Reviews,
}

impl Partition {
    pub fn name(&self) -> &'static str {
        match self {
            Partition::Restaurants => "restaurants",
            Partition::Reviews => "reviews",
        }
    }
}

/// Envelope every stored value is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// Handle to the on-disk store.
///
/// A handle without a root is "unavailable": reads always miss and writes
/// are dropped. Cloning is cheap and all clones see the same files.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: Option<PathBuf>,
}

impl LocalStore {
    /// Open (and upgrade if needed) the store under `base_dir`.
    ///
    /// Never fails: a missing base directory or any error while preparing
    /// the store yields an unavailable handle.
    pub async fn open(base_dir: Option<&Path>) -> Self {
        let Some(base_dir) = base_dir else {
            info!("No storage location available, running without a local store");
            return Self::unavailable();
        };

        let root = base_dir.join(STORE_NAME);
        match Self::prepare(&root).await {
            Ok(()) => {
                debug!(path = %root.display(), "Local store opened");
                Self { root: Some(root) }
            }
            Err(e) => {
                warn!(path = %root.display(), error = %e, "Local store unavailable");
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { root: None }
    }

    pub fn is_available(&self) -> bool {
        self.root.is_some()
    }

    async fn prepare(root: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(root).await?;
        let old_version = read_version(root).await;
        if old_version < STORE_VERSION {
            let applied = upgrade(root, old_version).await?;
            info!(from = old_version, to = STORE_VERSION, steps = applied.len(), "Upgraded local store");
            tokio::fs::write(root.join(VERSION_FILE), STORE_VERSION.to_string()).await?;
        }
        Ok(())
    }

    fn entry_path(root: &Path, partition: Partition, key: &str) -> PathBuf {
        root.join(partition.name())
            .join(format!("{}.json", sanitize_key(key)))
    }

    /// Read a value together with the time it was stored.
    pub async fn get_cached<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<CachedData<T>>, StoreError> {
        let Some(root) = &self.root else {
            return Ok(None);
        };

        let path = Self::entry_path(root, partition, key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    partition: partition.name(),
                    key: key.to_string(),
                    source,
                })
            }
        };

        let cached = serde_json::from_str(&contents).map_err(|source| StoreError::Decode {
            partition: partition.name(),
            key: key.to_string(),
            source,
        })?;
        Ok(Some(cached))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        Ok(self
            .get_cached::<T>(partition, key)
            .await?
            .map(|cached| cached.data))
    }

    pub async fn put<T: Serialize>(
        &self,
        partition: Partition,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let Some(root) = &self.root else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(&CachedData::new(value)).map_err(|source| {
            StoreError::Encode {
                partition: partition.name(),
                key: key.to_string(),
                source,
            }
        })?;

        let path = Self::entry_path(root, partition, key);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|source| StoreError::Io {
                partition: partition.name(),
                key: key.to_string(),
                source,
            })?;
        debug!(partition = partition.name(), key = key, "Stored value");
        Ok(())
    }

    /// Schema version recorded on disk, or `None` when unavailable.
    pub async fn version(&self) -> Option<u32> {
        match &self.root {
            Some(root) => Some(read_version(root).await),
            None => None,
        }
    }
}

async fn read_version(root: &Path) -> u32 {
    match tokio::fs::read_to_string(root.join(VERSION_FILE)).await {
        Ok(contents) => contents.trim().parse().unwrap_or(0),
        Err(_) => 0,
    }
}

/// Walk every step from `old_version` up to the current version, in order.
/// Returns the partitions each step created.
async fn upgrade(root: &Path, old_version: u32) -> io::Result<Vec<Partition>> {
    let mut created = Vec::new();
    for step in old_version..STORE_VERSION {
        if let Some(partition) = run_upgrade_step(root, step).await? {
            created.push(partition);
        }
    }
    Ok(created)
}

async fn run_upgrade_step(root: &Path, step: u32) -> io::Result<Option<Partition>> {
    let partition = match step {
        0 => Partition::Restaurants,
        1 => Partition::Reviews,
        _ => return Ok(None),
    };
    // create_dir_all is a no-op for an existing partition
    tokio::fs::create_dir_all(root.join(partition.name())).await?;
    Ok(Some(partition))
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
