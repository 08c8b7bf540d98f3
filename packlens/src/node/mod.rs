//! The immutable, offset-addressed node tree store.
//!
//! Built once per distinct set of containers by walking each container's
//! cached listfile, then treated as read-only: offsets are stable for the
//! lifetime of one loaded store and child ordering is insertion order, which
//! index-based path addressing depends on. Because construction walks every
//! listfile, the result is cached on disk keyed by a content-derived hash of
//! the container set (see [`cache`]).

pub mod cache;
mod store;

pub use cache::{default_cache_path, save_store_cache, try_load_cached_store, StoreCacheKey};
pub use store::{Node, NodeKind, NodeStore};
