//! The package group: one logical game installation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::debug;

use super::container::{Package, PackageError};
use super::listfile::Listfile;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a package group.
///
/// Reference equality is defined over group *identity*, not contents, so two
/// groups over the same directory are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(u64);

impl GroupId {
    /// Allocates the next group identity.
    pub fn next() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Deduplicated metadata for one logical path across the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInfo {
    /// Entry size in bytes.
    pub size: u64,
    /// Deletion marker from the winning container.
    pub deleted: bool,
    /// Name of the container whose info won.
    pub container: String,
}

struct Slot {
    package: Box<dyn Package>,
    listfile: Listfile,
}

/// An ordered set of containers plus their cached listfiles.
///
/// Containers are tried in load order; for both [`extract_file`] and
/// [`reference_info`] the first container carrying the path wins. The group
/// is immutable once constructed and shared read-only across workers.
///
/// [`extract_file`]: PackageGroup::extract_file
/// [`reference_info`]: PackageGroup::reference_info
pub struct PackageGroup {
    id: GroupId,
    slots: Vec<Slot>,
}

impl PackageGroup {
    /// Wraps an ordered set of containers, reading each entry list exactly
    /// once to populate the cached listfiles.
    pub fn from_packages(packages: Vec<Box<dyn Package>>) -> Result<Self, PackageError> {
        let id = GroupId::next();
        let mut slots = Vec::with_capacity(packages.len());
        for package in packages {
            let raw = package.entry_list()?;
            let listfile = Listfile::new(package.name(), raw);
            debug!(
                %id,
                container = package.name(),
                entries = listfile.len(),
                "cached container listfile"
            );
            slots.push(Slot { package, listfile });
        }
        Ok(Self { id, slots })
    }

    /// Group identity.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Number of containers.
    pub fn container_count(&self) -> usize {
        self.slots.len()
    }

    /// Container name by index.
    pub fn container_name(&self, container: usize) -> Option<&str> {
        self.slots.get(container).map(|s| s.package.name())
    }

    /// Cached listfile by container index. `None` means the index does not
    /// refer to a loaded container, which callers treat as an internal
    /// invariant violation.
    pub fn listfile(&self, container: usize) -> Option<&Listfile> {
        self.slots.get(container).map(|s| &s.listfile)
    }

    /// Best-effort extraction: containers are tried in load order and the
    /// first hit wins.
    pub fn extract_file(&self, path: &str) -> Result<Option<Bytes>, PackageError> {
        for slot in &self.slots {
            if !slot.listfile.contains(path) {
                continue;
            }
            if let Some(data) = slot.package.extract(path)? {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    /// Extraction from one specific container (hard-reference extraction).
    pub fn extract_from(
        &self,
        container: usize,
        path: &str,
    ) -> Result<Option<Bytes>, PackageError> {
        match self.slots.get(container) {
            Some(slot) => slot.package.extract(path),
            None => Ok(None),
        }
    }

    /// Size/deletion metadata for one logical path.
    ///
    /// Policy: first-loaded container wins, the same priority used for
    /// content extraction and the virtual-reference primary.
    pub fn reference_info(&self, path: &str) -> Option<ReferenceInfo> {
        for slot in &self.slots {
            if !slot.listfile.contains(path) {
                continue;
            }
            if let Some(info) = slot.package.entry_info(path) {
                return Some(ReferenceInfo {
                    size: info.size,
                    deleted: info.deleted,
                    container: slot.package.name().to_string(),
                });
            }
        }
        None
    }
}

impl fmt::Debug for PackageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageGroup")
            .field("id", &self.id)
            .field(
                "containers",
                &self
                    .slots
                    .iter()
                    .map(|s| s.package.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryPackage;
    use super::*;

    fn two_container_group() -> PackageGroup {
        let a = MemoryPackage::new(
            "A.arc",
            &[
                ("Models\\x.m2", b"a-model"),
                ("Textures\\y.blp", b"a-texture"),
            ],
        );
        let b = MemoryPackage::new(
            "B.arc",
            &[
                ("Textures\\y.blp", b"b-texture"),
                ("Sounds\\z.wav", b"b-sound"),
            ],
        );
        PackageGroup::from_packages(vec![Box::new(a), Box::new(b)]).unwrap()
    }

    #[test]
    fn test_group_identity_is_unique() {
        let g1 = two_container_group();
        let g2 = two_container_group();
        assert_ne!(g1.id(), g2.id());
    }

    #[test]
    fn test_extract_first_container_wins() {
        let group = two_container_group();
        let data = group.extract_file("Textures\\y.blp").unwrap().unwrap();
        assert_eq!(&data[..], b"a-texture");
    }

    #[test]
    fn test_extract_falls_through_to_later_containers() {
        let group = two_container_group();
        let data = group.extract_file("Sounds\\z.wav").unwrap().unwrap();
        assert_eq!(&data[..], b"b-sound");
    }

    #[test]
    fn test_extract_not_found_is_explicit() {
        let group = two_container_group();
        assert!(group.extract_file("Missing\\none.blp").unwrap().is_none());
    }

    #[test]
    fn test_extract_from_specific_container() {
        let group = two_container_group();
        let data = group.extract_from(1, "Textures\\y.blp").unwrap().unwrap();
        assert_eq!(&data[..], b"b-texture");
        assert!(group.extract_from(9, "Textures\\y.blp").unwrap().is_none());
    }

    #[test]
    fn test_reference_info_first_container_wins() {
        let group = two_container_group();
        let info = group.reference_info("Textures\\y.blp").unwrap();
        assert_eq!(info.container, "A.arc");
        assert_eq!(info.size, b"a-texture".len() as u64);
        assert!(!info.deleted);
        assert!(group.reference_info("Missing\\none.blp").is_none());
    }

    #[test]
    fn test_listfile_access() {
        let group = two_container_group();
        assert_eq!(group.container_count(), 2);
        assert_eq!(group.container_name(0), Some("A.arc"));
        assert_eq!(group.listfile(0).unwrap().len(), 2);
        assert!(group.listfile(5).is_none());
    }
}
