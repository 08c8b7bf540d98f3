//! Session lifecycle: container discovery, store construction, arena
//! seeding, and explorer startup/teardown.
//!
//! A [`Session`] owns everything tied to one loaded package group. Reloading
//! tears the whole structure down (explorer first, so no worker touches
//! stale state) and rebuilds it from the containers on disk; all reference
//! ids from before the reload are invalid afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::explorer::{Discovery, Explorer, ExplorerConfig, VirtualMapper};
use crate::node::{
    default_cache_path, save_store_cache, try_load_cached_store, NodeStore, StoreCacheKey,
};
use crate::package::{DirPackage, Package, PackageError, PackageGroup, ReferenceInfo};
use crate::reference::{EnumState, RefArena, RefId};

/// Errors raised while opening or reloading a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read package root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no package containers found under {0}")]
    NoPackages(PathBuf),

    #[error(transparent)]
    Package(#[from] PackageError),
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Directory whose immediate subdirectories are loaded as package
    /// containers, in lexicographic name order.
    pub root: PathBuf,

    /// Explorer tuning.
    pub explorer: ExplorerConfig,

    /// Where to persist the node store between runs. `None` disables the
    /// disk cache entirely.
    pub cache_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Configuration with defaults: default explorer tuning and the
    /// per-user cache location.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            explorer: ExplorerConfig::default(),
            cache_path: default_cache_path(),
        }
    }
}

/// One loaded package group plus its enumeration engine.
pub struct Session {
    config: SessionConfig,
    group: Arc<PackageGroup>,
    store: Arc<NodeStore>,
    explorer: Explorer,
    virtual_root: RefId,
}

impl Session {
    /// Opens every container under `config.root`, builds (or loads) the
    /// node store, seeds the reference arena with one hard root per
    /// container under a single virtual root, and constructs the explorer.
    ///
    /// The explorer is not started; call [`start`](Session::start) from
    /// within a tokio runtime.
    pub fn open(config: SessionConfig) -> Result<Self, SessionError> {
        let packages = discover_containers(&config.root)?;
        info!(
            root = %config.root.display(),
            containers = packages.len(),
            "opening session"
        );

        let group = Arc::new(PackageGroup::from_packages(packages)?);
        let store = Arc::new(load_or_build_store(&group, config.cache_path.as_deref()));
        let (arena, mapper, virtual_root) = seed_arena(&group);

        let explorer = Explorer::new(
            Arc::clone(&group),
            Arc::clone(&store),
            Arc::clone(&arena),
            mapper,
            config.explorer.clone(),
        );

        Ok(Self {
            config,
            group,
            store,
            explorer,
            virtual_root,
        })
    }

    /// Starts the explorer's background loops.
    pub fn start(&self) {
        self.explorer.start();
    }

    /// Stops the explorer and waits for every in-flight worker to finish.
    pub async fn close(&self) {
        self.explorer.stop().await;
    }

    /// Tears down the explorer, then rebuilds the group, store, arena, and
    /// mapper from the containers currently on disk and restarts the
    /// engine. Every reference id handed out before this call is invalid
    /// afterwards.
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        self.explorer.stop().await;

        let fresh = Self::open(self.config.clone())?;
        let Self {
            group,
            store,
            explorer,
            virtual_root,
            ..
        } = fresh;
        self.group = group;
        self.store = store;
        self.explorer = explorer;
        self.virtual_root = virtual_root;

        self.explorer.start();
        info!("session reloaded");
        Ok(())
    }

    /// The virtual root merging all container roots.
    pub fn virtual_root(&self) -> RefId {
        self.virtual_root
    }

    /// The enumeration engine.
    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// The loaded package group.
    pub fn group(&self) -> &Arc<PackageGroup> {
        &self.group
    }

    /// The immutable node store built from the group's listfiles.
    pub fn store(&self) -> &Arc<NodeStore> {
        &self.store
    }

    /// Submits a reference for enumeration (idempotent).
    pub fn submit(&self, id: RefId) {
        self.explorer.submit_work(id);
    }

    /// Drains references discovered since the last call.
    pub fn drain_discovered(&self) -> Vec<Discovery> {
        self.explorer.drain_discovered()
    }

    /// True when no enumeration work is queued, parked, or running.
    pub fn is_idle(&self) -> bool {
        self.explorer.is_idle()
    }

    /// Extracts a file from the first loaded container that has it.
    pub fn extract_file(&self, path: &str) -> Result<Option<Bytes>, PackageError> {
        self.group.extract_file(path)
    }

    /// Size and deletion metadata from the first loaded container that has
    /// the path.
    pub fn reference_info(&self, path: &str) -> Option<ReferenceInfo> {
        self.group.reference_info(path)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.config.root)
            .field("containers", &self.group.container_count())
            .field("nodes", &self.store.len())
            .finish()
    }
}

/// Opens every immediate subdirectory of `root` as a container, in
/// lexicographic name order so priority is deterministic across runs.
fn discover_containers(root: &Path) -> Result<Vec<Box<dyn Package>>, SessionError> {
    let entries = std::fs::read_dir(root).map_err(|source| SessionError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    if dirs.is_empty() {
        return Err(SessionError::NoPackages(root.to_path_buf()));
    }

    let mut packages: Vec<Box<dyn Package>> = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let pkg = DirPackage::open(&dir)?;
        info!(container = pkg.name(), "loaded container");
        packages.push(Box::new(pkg));
    }
    Ok(packages)
}

/// Loads the node store from the disk cache when the key matches, building
/// and re-caching it otherwise. Cache failures only cost a rebuild.
fn load_or_build_store(group: &PackageGroup, cache_path: Option<&Path>) -> NodeStore {
    let key = StoreCacheKey::compute(group);

    if let Some(path) = cache_path {
        if let Some(store) = try_load_cached_store(path, &key) {
            return store;
        }
    }

    let store = NodeStore::build(group);
    info!(nodes = store.len(), "node store built");

    if let Some(path) = cache_path {
        if let Err(e) = save_store_cache(path, key, &store) {
            warn!(path = %path.display(), error = %e, "failed to cache node store");
        }
    }
    store
}

/// Seeds a fresh arena: one hard root per container (empty path, parent
/// none), all merged under a single virtual root mapped at the empty path.
fn seed_arena(group: &PackageGroup) -> (Arc<RefArena>, VirtualMapper, RefId) {
    let arena = Arc::new(RefArena::new(group.id()));
    let mapper = VirtualMapper::new();

    let mut roots = Vec::with_capacity(group.container_count());
    for container in 0..group.container_count() {
        let name = group
            .container_name(container)
            .unwrap_or_default()
            .to_string();
        roots.push(arena.insert_hard(None, container, name, "", None, EnumState::NotEnumerated));
    }

    let virtual_root = arena.insert_virtual(None, roots[0], EnumState::NotEnumerated);
    for &hard in &roots[1..] {
        arena.push_overridden(virtual_root, hard);
    }
    mapper.add_mapping("", virtual_root);

    (arena, mapper, virtual_root)
}
