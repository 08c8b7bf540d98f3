//! Packlens - merged virtual file trees over game archive packages.
//!
//! This library merges multiple independent archive containers ("packages")
//! into one deduplicated, hierarchical, lazily-enumerated virtual namespace.
//! Directories are expanded incrementally by background workers and published
//! to a single-threaded consumer (typically a UI) through a polled buffer.
//!
//! # Architecture
//!
//! ```text
//! game directory ──► discover containers ──► PackageGroup
//!                                               │
//!                                               ▼
//!                    NodeStore (built once, cached on disk by content hash)
//!                                               │
//!                                               ▼
//!                    Explorer ── workers expand one reference at a time
//!                         │
//!                         ▼
//!                    VirtualMapper folds per-container ("hard") references
//!                    sharing a logical path into one virtual reference
//!                         │
//!                         ▼
//!                    consumer polls drain_discovered()
//! ```
//!
//! See [`session::Session`] for the composition root that wires these
//! together for one root directory.

pub mod explorer;
pub mod node;
pub mod package;
pub mod reference;
pub mod session;

pub use explorer::{Discovery, Explorer, ExplorerConfig, ExplorerError, VirtualMapper};
pub use package::{DirPackage, Package, PackageError, PackageGroup, ReferenceInfo};
pub use reference::{EnumState, FileKind, RefArena, RefId, RefKind, Reference};
pub use session::{Session, SessionConfig, SessionError};

/// Crate version, used to invalidate on-disk caches across releases.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
