//! Reference value types.

use std::fmt;

use thiserror::Error;

use crate::package::GroupId;

/// Errors raised by reference mutation.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// A virtual reference's path is fixed to its primary hard reference.
    ///
    /// Constructing a virtual reference with a diverging path is a
    /// programmer error elsewhere and must fail loudly rather than silently
    /// diverge.
    #[error("virtual reference path is fixed to `{expected}`, refusing `{rejected}`")]
    VirtualPathMismatch { expected: String, rejected: String },

    /// The arena has no reference at this index.
    #[error("unknown reference id {0}")]
    UnknownReference(RefId),
}

/// Index of a reference within its [`RefArena`](super::RefArena).
///
/// Stable for the lifetime of one arena; a full reload discards the arena
/// and all ids with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(pub(crate) u32);

impl RefId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumeration lifecycle of a reference.
///
/// Transitions are strictly forward: `NotEnumerated → Enumerating →
/// Enumerated`. A full reload restarts from fresh construction rather than
/// reversing any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumState {
    /// Children have not been requested yet.
    NotEnumerated,
    /// Accepted into the work queue; a worker owns this reference.
    Enumerating,
    /// Immediate children are fully known. Terminal.
    Enumerated,
}

impl fmt::Display for EnumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumState::NotEnumerated => write!(f, "not-enumerated"),
            EnumState::Enumerating => write!(f, "enumerating"),
            EnumState::Enumerated => write!(f, "enumerated"),
        }
    }
}

/// Hard/virtual discriminant, with the variant-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefKind {
    /// Bound to one physical container (index into the owning group).
    Hard { container: usize },

    /// Union view over hard references sharing one logical path.
    ///
    /// `primary` is the first-discovered hard reference and wins for content
    /// extraction; `overridden` are later discoveries from other containers,
    /// in discovery order.
    Virtual {
        primary: RefId,
        overridden: Vec<RefId>,
    },
}

impl RefKind {
    /// Returns true for the hard variant.
    pub fn is_hard(&self) -> bool {
        matches!(self, RefKind::Hard { .. })
    }

    /// Returns true for the virtual variant.
    pub fn is_virtual(&self) -> bool {
        matches!(self, RefKind::Virtual { .. })
    }
}

/// One entry in the merged virtual namespace.
///
/// Shared fields are factored into this struct; hard/virtual specifics live
/// in [`RefKind`]. Instances are owned by the arena and handed out as
/// snapshots; the only mutations after creation are `state` transitions,
/// child appends, and overridden-list appends, all performed through arena
/// methods.
#[derive(Debug, Clone)]
pub struct Reference {
    /// This reference's own id.
    pub id: RefId,
    /// Owning package group identity.
    pub group: GroupId,
    /// Parent reference, if any. Non-owning back-link.
    pub parent: Option<RefId>,
    /// Container name for hard references; always empty for virtual ones.
    pub package_name: String,
    /// Backslash-normalized path within the namespace. Empty for
    /// package-level references. Trailing separator denotes a directory.
    /// For virtual references this mirrors the primary's path and cannot
    /// diverge from it.
    pub file_path: String,
    /// Offset of this entry in the backing node store, when resolved.
    pub node_offset: Option<u64>,
    /// Enumeration lifecycle state.
    pub state: EnumState,
    /// Owned child list, appended to only by the worker that enumerated
    /// this reference.
    pub children: Vec<RefId>,
    /// Hard/virtual payload.
    pub kind: RefKind,
}

impl Reference {
    /// True for package-level references (a container root).
    pub fn is_package(&self) -> bool {
        self.file_path.is_empty() && !self.package_name.is_empty()
    }

    /// True for directory references (trailing path separator).
    pub fn is_directory(&self) -> bool {
        self.file_path.ends_with('\\')
    }

    /// True for leaf file references.
    pub fn is_file(&self) -> bool {
        !self.file_path.is_empty() && !self.is_directory()
    }

    /// Derived file type, from the path extension alone (no I/O).
    pub fn file_kind(&self) -> super::FileKind {
        super::FileKind::from_path(&self.file_path)
    }

    /// Structural identity key. See [`RefKey`].
    pub fn key(&self, primary_key: Option<RefKey>) -> RefKey {
        RefKey {
            group: self.group,
            package_name: self.package_name.to_ascii_lowercase(),
            file_path: self.file_path.to_ascii_lowercase(),
            primary: primary_key.map(Box::new),
        }
    }

    /// Display name: the last path segment, or the package name for
    /// package-level references.
    pub fn name(&self) -> &str {
        if self.file_path.is_empty() {
            return &self.package_name;
        }
        let trimmed = self.file_path.trim_end_matches('\\');
        match trimmed.rfind('\\') {
            Some(pos) => &trimmed[pos + 1..],
            None => trimmed,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavor = if self.kind.is_virtual() { "virtual" } else { "hard" };
        write!(
            f,
            "{} {}:{}\\{} ({})",
            flavor, self.group, self.package_name, self.file_path, self.state
        )
    }
}

/// Structural equality/hash key for references.
///
/// Hard references compare by group identity, package name, and path (the
/// parent chain is deliberately excluded). Virtual references carry an empty
/// package name and additionally fold in their primary's key, so two virtual
/// wrappers over the same hard reference compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey {
    group: GroupId,
    package_name: String,
    file_path: String,
    primary: Option<Box<RefKey>>,
}

/// Logical parent path of a backslash-normalized path.
///
/// `Textures\foo.blp` → `Textures\`; `Textures\` → ``; `` → ``.
pub fn parent_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('\\');
    match trimmed.rfind('\\') {
        Some(pos) => &path[..=pos],
        None => "",
    }
}
