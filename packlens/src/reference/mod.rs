//! File reference model: identity, equality, and the parent/child graph for
//! one logical filesystem-like entry in the merged virtual namespace.
//!
//! Two flavors of reference exist:
//!
//! - **Hard reference**: bound to one physical container. Created when that
//!   container's enumeration discovers an entry (directory boundary or leaf).
//! - **Virtual reference**: a union view over one or more hard references
//!   sharing the same logical path across different containers. The
//!   first-discovered hard reference is the *primary*; later ones are
//!   tracked as *overridden* and shadowed for content extraction.
//!
//! References live in a [`RefArena`] and are addressed by [`RefId`]. The
//! parent relation is a plain index (non-owning) and the child relation is an
//! owned list of indices, so no ownership cycles exist anywhere in the graph.

mod arena;
mod filetype;
mod model;

pub use arena::{RefArena, SubmitDisposition};
pub use filetype::FileKind;
pub use model::{parent_path, EnumState, RefId, RefKey, RefKind, Reference, ReferenceError};
