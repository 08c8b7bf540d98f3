//! Node store caching for fast startup.
//!
//! Building a [`NodeStore`] walks every container's listfile, which for a
//! full game installation is expensive. The built store is cached on disk
//! and invalidated when the container set changes: the cache key carries a
//! sha256 digest over container names and listfile contents, so any change
//! in any container's listing rebuilds the store.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::package::PackageGroup;

use super::store::NodeStore;

/// Cache key for validating cached stores.
///
/// The cache is valid only if all fields match the current container set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreCacheKey {
    /// Packlens version (cache format may change across releases).
    pub version: String,

    /// Container names in load order.
    pub container_names: Vec<String>,

    /// Hex sha256 over container names and listfile contents.
    pub content_digest: String,
}

impl StoreCacheKey {
    /// Computes the key for the group's current container set.
    pub fn compute(group: &PackageGroup) -> Self {
        let mut container_names = Vec::with_capacity(group.container_count());
        let mut hasher = Sha256::new();

        for container in 0..group.container_count() {
            let name = group.container_name(container).unwrap_or_default();
            container_names.push(name.to_string());
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            if let Some(listfile) = group.listfile(container) {
                for entry in listfile.entries() {
                    hasher.update(entry.as_bytes());
                    hasher.update([b'\n']);
                }
            }
        }

        let digest = hasher.finalize();
        let content_digest = digest.iter().map(|b| format!("{:02x}", b)).collect();

        Self {
            version: crate::VERSION.to_string(),
            container_names,
            content_digest,
        }
    }
}

/// On-disk record: the key comes first so staleness is judged before the
/// (much larger) store payload matters.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    key: StoreCacheKey,
    built_at_secs: u64,
    store: NodeStore,
}

/// Default per-user cache location.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".packlens").join("node_store.cache"))
}

/// Loads the cached store at `path` if it decodes and its key matches the
/// current container set. Any failure here only costs a rebuild, so
/// missing, corrupt, and stale caches all come back as `None`.
pub fn try_load_cached_store(path: &Path, current: &StoreCacheKey) -> Option<NodeStore> {
    let file = File::open(path).ok()?;
    let record: CacheRecord = match bincode::deserialize_from(BufReader::new(file)) {
        Ok(record) => record,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable node store cache");
            return None;
        }
    };

    if record.key != *current {
        debug!("node store cache is stale, rebuilding");
        return None;
    }

    info!(
        built = %age_label(record.built_at_secs),
        containers = record.key.container_names.len(),
        nodes = record.store.len(),
        "loaded node store from cache"
    );
    Some(record.store)
}

/// Persists a built store under `key`, creating parent directories as
/// needed. The record is written to a sibling staging file and renamed into
/// place, so a crash mid-write cannot leave a torn cache behind.
pub fn save_store_cache(path: &Path, key: StoreCacheKey, store: &NodeStore) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let record = CacheRecord {
        key,
        built_at_secs: unix_now_secs(),
        store: store.clone(),
    };

    let staging = path.with_extension("tmp");
    let writer = BufWriter::new(File::create(&staging)?);
    bincode::serialize_into(writer, &record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::rename(&staging, path)?;

    info!(
        path = %path.display(),
        containers = record.key.container_names.len(),
        nodes = record.store.len(),
        "cached node store"
    );
    Ok(())
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Coarse cache age for the load log line.
fn age_label(built_at_secs: u64) -> String {
    let age = unix_now_secs().saturating_sub(built_at_secs);
    match age {
        s if s >= 86_400 => format!("{}d ago", s / 86_400),
        s if s >= 3_600 => format!("{}h ago", s / 3_600),
        s if s >= 60 => format!("{}m ago", s / 60),
        s => format!("{}s ago", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::testing::MemoryPackage;
    use tempfile::TempDir;

    fn group(entries: &[(&str, &[u8])]) -> PackageGroup {
        let pkg = MemoryPackage::new("A.arc", entries);
        PackageGroup::from_packages(vec![Box::new(pkg)]).unwrap()
    }

    #[test]
    fn test_key_is_content_derived() {
        let g1 = group(&[("Textures\\y.blp", b"y")]);
        let g2 = group(&[("Textures\\y.blp", b"y")]);
        let g3 = group(&[("Textures\\z.blp", b"z")]);

        // Same contents, distinct group identities: same key.
        assert_eq!(StoreCacheKey::compute(&g1), StoreCacheKey::compute(&g2));
        // Different listing: different digest.
        assert_ne!(
            StoreCacheKey::compute(&g1).content_digest,
            StoreCacheKey::compute(&g3).content_digest
        );
    }

    #[test]
    fn test_cache_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache_path = temp.path().join("store.cache");

        let group = group(&[("Textures\\y.blp", b"y"), ("Models\\x.m2", b"x")]);
        let key = StoreCacheKey::compute(&group);
        let store = NodeStore::build(&group);

        save_store_cache(&cache_path, key.clone(), &store).unwrap();

        let loaded = try_load_cached_store(&cache_path, &key).unwrap();
        assert_eq!(loaded.len(), store.len());
        assert!(loaded.lookup_path("A.arc", "Textures\\y.blp").is_some());
    }

    #[test]
    fn test_cache_rejected_on_key_mismatch() {
        let temp = TempDir::new().unwrap();
        let cache_path = temp.path().join("store.cache");

        let g1 = group(&[("Textures\\y.blp", b"y")]);
        let store = NodeStore::build(&g1);
        save_store_cache(&cache_path, StoreCacheKey::compute(&g1), &store).unwrap();

        let g2 = group(&[("Textures\\z.blp", b"z")]);
        assert!(try_load_cached_store(&cache_path, &StoreCacheKey::compute(&g2)).is_none());
    }

    #[test]
    fn test_missing_or_corrupt_cache_is_none() {
        let temp = TempDir::new().unwrap();
        let cache_path = temp.path().join("missing.cache");
        let g = group(&[("a.txt", b"a")]);
        let key = StoreCacheKey::compute(&g);

        assert!(try_load_cached_store(&cache_path, &key).is_none());

        std::fs::write(&cache_path, b"not a cache").unwrap();
        assert!(try_load_cached_store(&cache_path, &key).is_none());
    }

    #[test]
    fn test_save_creates_parents_and_removes_staging() {
        let temp = TempDir::new().unwrap();
        let cache_path = temp.path().join("nested").join("store.cache");

        let g = group(&[("a.txt", b"a")]);
        save_store_cache(&cache_path, StoreCacheKey::compute(&g), &NodeStore::build(&g)).unwrap();

        assert!(cache_path.is_file());
        assert!(!cache_path.with_extension("tmp").exists());
    }

    #[test]
    fn test_age_label_granularity() {
        let now = unix_now_secs();
        assert!(age_label(now).ends_with("s ago"));
        assert_eq!(age_label(now - 120), "2m ago");
        assert_eq!(age_label(now - 7_200), "2h ago");
        assert_eq!(age_label(now - 172_800), "2d ago");
    }
}
