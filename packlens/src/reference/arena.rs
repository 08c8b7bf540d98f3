//! Arena storage for references.
//!
//! All references of one session live in a single append-only arena owned by
//! the explorer. The arena is the one place reference state is mutated:
//! state transitions, child appends, and overridden-list appends all go
//! through it, under one lock, which is what makes the `NotEnumerated →
//! Enumerating` transition in [`try_begin_enumeration`] atomic with respect
//! to racing submissions.
//!
//! [`try_begin_enumeration`]: RefArena::try_begin_enumeration

use bytes::Bytes;
use parking_lot::RwLock;

use crate::package::{GroupId, PackageError, PackageGroup};

use super::model::{EnumState, RefId, RefKey, RefKind, Reference, ReferenceError};

/// Outcome of an enumeration-begin attempt, driving [`submit_work`]
/// dispatch.
///
/// [`submit_work`]: crate::explorer::Explorer::submit_work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// The reference was `NotEnumerated` and is now `Enumerating`; the caller
    /// must append it to the work queue.
    Begin,
    /// The reference is mid-flight; the caller should park it on the wait
    /// queue instead.
    Busy,
    /// Already `Enumerated`; nothing to do.
    Done,
}

/// Append-only arena of [`Reference`]s for one package group session.
pub struct RefArena {
    group: GroupId,
    refs: RwLock<Vec<Reference>>,
}

impl RefArena {
    /// Creates an empty arena bound to one group identity.
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            refs: RwLock::new(Vec::new()),
        }
    }

    /// Owning group identity.
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Number of references created so far.
    pub fn len(&self) -> usize {
        self.refs.read().len()
    }

    /// True if no references exist yet.
    pub fn is_empty(&self) -> bool {
        self.refs.read().is_empty()
    }

    /// Creates a hard reference bound to `container` and appends it to the
    /// parent's child list.
    ///
    /// Leaf files have no children, so callers create them directly in the
    /// `Enumerated` state.
    pub fn insert_hard(
        &self,
        parent: Option<RefId>,
        container: usize,
        package_name: impl Into<String>,
        file_path: impl Into<String>,
        node_offset: Option<u64>,
        state: EnumState,
    ) -> RefId {
        let mut refs = self.refs.write();
        let id = RefId(refs.len() as u32);
        refs.push(Reference {
            id,
            group: self.group,
            parent,
            package_name: package_name.into(),
            file_path: file_path.into(),
            node_offset,
            state,
            children: Vec::new(),
            kind: RefKind::Hard { container },
        });
        if let Some(parent) = parent {
            refs[parent.index()].children.push(id);
        }
        id
    }

    /// Creates a virtual reference wrapping `primary` and appends it to the
    /// virtual parent's child list.
    ///
    /// The path mirrors the primary's path and the package name is empty,
    /// per the virtual-reference invariants.
    pub fn insert_virtual(&self, parent: Option<RefId>, primary: RefId, state: EnumState) -> RefId {
        let mut refs = self.refs.write();
        let (file_path, node_offset) = {
            let p = &refs[primary.index()];
            (p.file_path.clone(), p.node_offset)
        };
        let id = RefId(refs.len() as u32);
        refs.push(Reference {
            id,
            group: self.group,
            parent,
            package_name: String::new(),
            file_path,
            node_offset,
            state,
            children: Vec::new(),
            kind: RefKind::Virtual {
                primary,
                overridden: Vec::new(),
            },
        });
        if let Some(parent) = parent {
            refs[parent.index()].children.push(id);
        }
        id
    }

    /// Clones out the full reference record.
    pub fn snapshot(&self, id: RefId) -> Option<Reference> {
        self.refs.read().get(id.index()).cloned()
    }

    /// Current enumeration state.
    pub fn state(&self, id: RefId) -> Option<EnumState> {
        self.refs.read().get(id.index()).map(|r| r.state)
    }

    /// Parent reference, if any.
    pub fn parent(&self, id: RefId) -> Option<RefId> {
        self.refs.read().get(id.index()).and_then(|r| r.parent)
    }

    /// True if the reference is a root or its parent has finished
    /// enumerating. Wait-queue entries become eligible for resubmission once
    /// this holds.
    pub fn parent_enumerated(&self, id: RefId) -> bool {
        let refs = self.refs.read();
        match refs.get(id.index()).and_then(|r| r.parent) {
            Some(parent) => refs[parent.index()].state == EnumState::Enumerated,
            None => true,
        }
    }

    /// Child ids in discovery order.
    pub fn children(&self, id: RefId) -> Vec<RefId> {
        self.refs
            .read()
            .get(id.index())
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    /// Atomically claims a reference for enumeration.
    ///
    /// The `NotEnumerated → Enumerating` transition happens here, under the
    /// arena lock, before any worker is dispatched; this is what guarantees
    /// no reference is ever expanded by two workers at once.
    pub fn try_begin_enumeration(&self, id: RefId) -> SubmitDisposition {
        let mut refs = self.refs.write();
        match refs.get_mut(id.index()) {
            Some(r) => match r.state {
                EnumState::NotEnumerated => {
                    r.state = EnumState::Enumerating;
                    SubmitDisposition::Begin
                }
                EnumState::Enumerating => SubmitDisposition::Busy,
                EnumState::Enumerated => SubmitDisposition::Done,
            },
            None => SubmitDisposition::Done,
        }
    }

    /// Marks a reference terminally `Enumerated`.
    pub fn mark_enumerated(&self, id: RefId) {
        let mut refs = self.refs.write();
        if let Some(r) = refs.get_mut(id.index()) {
            r.state = EnumState::Enumerated;
        }
    }

    /// Appends a later-discovered hard reference to a virtual reference's
    /// overridden list. No-op on hard references or duplicate appends.
    pub fn push_overridden(&self, virtual_id: RefId, hard: RefId) {
        let mut refs = self.refs.write();
        if let Some(r) = refs.get_mut(virtual_id.index()) {
            if let RefKind::Virtual { overridden, .. } = &mut r.kind {
                if !overridden.contains(&hard) {
                    overridden.push(hard);
                }
            }
        }
    }

    /// Primary and overridden hard references of a virtual reference.
    pub fn virtual_parts(&self, id: RefId) -> Option<(RefId, Vec<RefId>)> {
        let refs = self.refs.read();
        match &refs.get(id.index())?.kind {
            RefKind::Virtual {
                primary,
                overridden,
            } => Some((*primary, overridden.clone())),
            RefKind::Hard { .. } => None,
        }
    }

    /// Looks up a direct child by case-folded path. Used by workers to
    /// deduplicate directory discoveries.
    pub fn child_with_folded_path(&self, parent: RefId, folded: &str) -> Option<RefId> {
        let refs = self.refs.read();
        let children = &refs.get(parent.index())?.children;
        children
            .iter()
            .copied()
            .find(|c| refs[c.index()].file_path.eq_ignore_ascii_case(folded))
    }

    /// Structural identity key; virtual references fold in their primary's
    /// key.
    pub fn key(&self, id: RefId) -> Option<RefKey> {
        let refs = self.refs.read();
        let r = refs.get(id.index())?;
        let primary_key = match &r.kind {
            RefKind::Virtual { primary, .. } => {
                refs.get(primary.index()).map(|p| p.key(None))
            }
            RefKind::Hard { .. } => None,
        };
        Some(r.key(primary_key))
    }

    /// Re-points a hard reference's path.
    ///
    /// On virtual references this is rejected with
    /// [`ReferenceError::VirtualPathMismatch`] unless the value already
    /// matches the wrapped primary's path: a virtual path can never diverge
    /// from its primary.
    pub fn set_file_path(&self, id: RefId, path: impl Into<String>) -> Result<(), ReferenceError> {
        let path = path.into();
        let mut refs = self.refs.write();
        let Some(r) = refs.get_mut(id.index()) else {
            return Err(ReferenceError::UnknownReference(id));
        };
        if r.kind.is_virtual() && !r.file_path.eq_ignore_ascii_case(&path) {
            return Err(ReferenceError::VirtualPathMismatch {
                expected: r.file_path.clone(),
                rejected: path,
            });
        }
        r.file_path = path;
        Ok(())
    }

    /// Extracts the referenced entry's bytes.
    ///
    /// Hard references read from their one owning container. Virtual
    /// references delegate to the primary: the first-discovered container
    /// wins for content even though children from every container are
    /// visible in the union tree.
    pub fn extract(
        &self,
        group: &PackageGroup,
        id: RefId,
    ) -> Result<Option<Bytes>, PackageError> {
        let (kind, path) = {
            let refs = self.refs.read();
            match refs.get(id.index()) {
                Some(r) => (r.kind.clone(), r.file_path.clone()),
                None => return Ok(None),
            }
        };
        match kind {
            RefKind::Hard { container } => group.extract_from(container, &path),
            RefKind::Virtual { primary, .. } => self.extract(group, primary),
        }
    }
}

impl std::fmt::Debug for RefArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefArena")
            .field("group", &self.group)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> RefArena {
        RefArena::new(GroupId::next())
    }

    #[test]
    fn test_insert_hard_appends_to_parent() {
        let arena = arena();
        let root = arena.insert_hard(None, 0, "A.arc", "", None, EnumState::NotEnumerated);
        let child = arena.insert_hard(
            Some(root),
            0,
            "A.arc",
            "Textures\\",
            None,
            EnumState::NotEnumerated,
        );

        assert_eq!(arena.children(root), vec![child]);
        assert_eq!(arena.parent(child), Some(root));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_try_begin_enumeration_is_idempotent() {
        let arena = arena();
        let id = arena.insert_hard(None, 0, "A.arc", "", None, EnumState::NotEnumerated);

        assert_eq!(arena.try_begin_enumeration(id), SubmitDisposition::Begin);
        assert_eq!(arena.try_begin_enumeration(id), SubmitDisposition::Busy);
        arena.mark_enumerated(id);
        assert_eq!(arena.try_begin_enumeration(id), SubmitDisposition::Done);
        assert_eq!(arena.state(id), Some(EnumState::Enumerated));
    }

    #[test]
    fn test_virtual_mirrors_primary_path() {
        let arena = arena();
        let hard = arena.insert_hard(
            None,
            0,
            "A.arc",
            "Textures\\foo.blp",
            Some(4),
            EnumState::Enumerated,
        );
        let v = arena.insert_virtual(None, hard, EnumState::Enumerated);

        let snap = arena.snapshot(v).unwrap();
        assert_eq!(snap.file_path, "Textures\\foo.blp");
        assert_eq!(snap.package_name, "");
        assert_eq!(snap.node_offset, Some(4));
        assert_eq!(arena.virtual_parts(v), Some((hard, vec![])));
    }

    #[test]
    fn test_virtual_path_setter_rejects_divergence() {
        let arena = arena();
        let hard = arena.insert_hard(
            None,
            0,
            "A.arc",
            "Textures\\foo.blp",
            None,
            EnumState::Enumerated,
        );
        let v = arena.insert_virtual(None, hard, EnumState::Enumerated);

        // Same path (case-insensitively) is accepted.
        assert!(arena.set_file_path(v, "textures\\FOO.blp").is_ok());

        // Divergence fails loudly.
        let err = arena.set_file_path(v, "Sounds\\foo.blp").unwrap_err();
        assert!(matches!(err, ReferenceError::VirtualPathMismatch { .. }));
    }

    #[test]
    fn test_push_overridden_deduplicates() {
        let arena = arena();
        let a = arena.insert_hard(None, 0, "A.arc", "Textures\\", None, EnumState::NotEnumerated);
        let b = arena.insert_hard(None, 1, "B.arc", "Textures\\", None, EnumState::NotEnumerated);
        let v = arena.insert_virtual(None, a, EnumState::NotEnumerated);

        arena.push_overridden(v, b);
        arena.push_overridden(v, b);

        assert_eq!(arena.virtual_parts(v), Some((a, vec![b])));
    }

    #[test]
    fn test_child_with_folded_path() {
        let arena = arena();
        let root = arena.insert_hard(None, 0, "A.arc", "", None, EnumState::Enumerating);
        let dir = arena.insert_hard(
            Some(root),
            0,
            "A.arc",
            "Textures\\",
            None,
            EnumState::NotEnumerated,
        );

        assert_eq!(arena.child_with_folded_path(root, "textures\\"), Some(dir));
        assert_eq!(arena.child_with_folded_path(root, "models\\"), None);
    }

    #[test]
    fn test_parent_enumerated() {
        let arena = arena();
        let root = arena.insert_hard(None, 0, "A.arc", "", None, EnumState::Enumerating);
        let child = arena.insert_hard(
            Some(root),
            0,
            "A.arc",
            "Textures\\",
            None,
            EnumState::NotEnumerated,
        );

        assert!(arena.parent_enumerated(root)); // roots are always eligible
        assert!(!arena.parent_enumerated(child));
        arena.mark_enumerated(root);
        assert!(arena.parent_enumerated(child));
    }

    #[test]
    fn test_keys_equal_for_same_logical_entry() {
        let arena = arena();
        let a = arena.insert_hard(
            None,
            0,
            "A.arc",
            "Textures\\foo.blp",
            None,
            EnumState::Enumerated,
        );
        let b = arena.insert_hard(
            Some(a),
            0,
            "A.ARC",
            "TEXTURES\\FOO.BLP",
            None,
            EnumState::Enumerated,
        );
        assert_eq!(arena.key(a), arena.key(b));

        // Two virtual wrappers over the same hard reference compare equal.
        let v1 = arena.insert_virtual(None, a, EnumState::Enumerated);
        let v2 = arena.insert_virtual(None, a, EnumState::Enumerated);
        assert_eq!(arena.key(v1), arena.key(v2));
        assert_ne!(arena.key(v1), arena.key(a));
    }
}
