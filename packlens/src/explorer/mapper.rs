//! The virtual reference mapper.
//!
//! Maintains the mapping from logical path to the virtual reference merging
//! all hard references that share that path across containers, and folds
//! newly discovered hard references into the virtual tree: the first
//! container to report a path becomes the primary; later discoveries are
//! appended as overridden siblings on the same virtual object.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::reference::{parent_path, EnumState, RefArena, RefId};

use super::Discovery;

/// Path → virtual reference map for one package group.
///
/// Keys are case-folded logical paths (the empty path maps to the virtual
/// root). First writer wins: `add_mapping` never replaces an existing entry.
#[derive(Debug, Default)]
pub struct VirtualMapper {
    map: DashMap<String, RefId>,
}

impl VirtualMapper {
    /// Creates an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapped paths.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing has been mapped yet.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Records a path → virtual mapping. No-op if an entry for that path
    /// already exists (first writer wins). Returns whether the mapping was
    /// inserted.
    pub fn add_mapping(&self, path: &str, virtual_ref: RefId) -> bool {
        match self.map.entry(path.to_ascii_lowercase()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(virtual_ref);
                true
            }
        }
    }

    /// Pure lookup by logical path. `None` means the path has not been
    /// folded into the virtual tree yet: its parent hasn't finished
    /// enumerating, or it is genuinely new.
    pub fn virtual_for(&self, path: &str) -> Option<RefId> {
        self.map.get(&path.to_ascii_lowercase()).map(|v| *v)
    }

    /// Folds a newly discovered hard reference into the virtual tree.
    ///
    /// If a virtual reference already exists for the hard reference's path,
    /// the hard reference is appended to its overridden list. Otherwise a
    /// new virtual reference wrapping it as primary is attached under the
    /// virtual parent and registered.
    ///
    /// Returns `None` only if the hard reference is unknown to the arena.
    pub fn fold(&self, arena: &RefArena, hard: RefId) -> Option<Discovery> {
        let snap = arena.snapshot(hard)?;
        let folded = snap.file_path.to_ascii_lowercase();

        // Resolve the virtual parent before taking the entry lock: both keys
        // may live in the same map shard.
        let virtual_parent = self.virtual_for(parent_path(&snap.file_path));

        match self.map.entry(folded) {
            Entry::Occupied(e) => {
                let virtual_ref = *e.get();
                arena.push_overridden(virtual_ref, hard);
                trace!(
                    path = %snap.file_path,
                    package = %snap.package_name,
                    %virtual_ref,
                    "appended overridden hard reference"
                );
                Some(Discovery {
                    reference: hard,
                    virtual_ref,
                    merged: true,
                })
            }
            Entry::Vacant(e) => {
                // Leaf files have no children and are born enumerated.
                let state = if snap.is_file() {
                    EnumState::Enumerated
                } else {
                    EnumState::NotEnumerated
                };
                let virtual_ref = arena.insert_virtual(virtual_parent, hard, state);
                e.insert(virtual_ref);
                trace!(
                    path = %snap.file_path,
                    package = %snap.package_name,
                    %virtual_ref,
                    "created virtual reference"
                );
                Some(Discovery {
                    reference: hard,
                    virtual_ref,
                    merged: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::GroupId;

    fn seeded() -> (RefArena, VirtualMapper, RefId) {
        let arena = RefArena::new(GroupId::next());
        let mapper = VirtualMapper::new();
        let root_a = arena.insert_hard(None, 0, "A.arc", "", None, EnumState::Enumerating);
        let vroot = arena.insert_virtual(None, root_a, EnumState::Enumerating);
        mapper.add_mapping("", vroot);
        (arena, mapper, vroot)
    }

    #[test]
    fn test_add_mapping_first_writer_wins() {
        let (_arena, mapper, vroot) = seeded();
        assert!(!mapper.add_mapping("", RefId(99)));
        assert_eq!(mapper.virtual_for(""), Some(vroot));
    }

    #[test]
    fn test_fold_creates_then_merges() {
        let (arena, mapper, vroot) = seeded();

        let from_a = arena.insert_hard(
            None,
            0,
            "A.arc",
            "Textures\\",
            None,
            EnumState::NotEnumerated,
        );
        let d1 = mapper.fold(&arena, from_a).unwrap();
        assert!(!d1.merged);
        assert_eq!(arena.parent(d1.virtual_ref), Some(vroot));
        assert_eq!(arena.virtual_parts(d1.virtual_ref), Some((from_a, vec![])));

        let from_b = arena.insert_hard(
            None,
            1,
            "B.arc",
            "textures\\",
            None,
            EnumState::NotEnumerated,
        );
        let d2 = mapper.fold(&arena, from_b).unwrap();
        assert!(d2.merged);
        assert_eq!(d2.virtual_ref, d1.virtual_ref);
        assert_eq!(
            arena.virtual_parts(d1.virtual_ref),
            Some((from_a, vec![from_b]))
        );

        // The folded path is indexed exactly once.
        assert_eq!(mapper.virtual_for("TEXTURES\\"), Some(d1.virtual_ref));
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn test_fold_file_is_born_enumerated() {
        let (arena, mapper, _vroot) = seeded();
        let file = arena.insert_hard(
            None,
            0,
            "A.arc",
            "top.txt",
            None,
            EnumState::Enumerated,
        );
        let d = mapper.fold(&arena, file).unwrap();
        assert_eq!(arena.state(d.virtual_ref), Some(EnumState::Enumerated));
    }

    #[test]
    fn test_fold_without_parent_mapping_creates_detached_virtual() {
        let arena = RefArena::new(GroupId::next());
        let mapper = VirtualMapper::new();
        let hard = arena.insert_hard(
            None,
            0,
            "A.arc",
            "Textures\\y.blp",
            None,
            EnumState::Enumerated,
        );
        // Parent "Textures\" not folded yet: the virtual is created without
        // a virtual parent rather than lost.
        let d = mapper.fold(&arena, hard).unwrap();
        assert_eq!(arena.parent(d.virtual_ref), None);
    }
}
