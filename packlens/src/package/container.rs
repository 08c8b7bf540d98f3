//! The container capability boundary and the directory-backed container.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

/// Errors raised at the container boundary.
#[derive(Debug, Error)]
pub enum PackageError {
    /// I/O failure reading a container or one of its entries.
    #[error("I/O error in container `{container}` at {path}: {source}")]
    Io {
        container: String,
        path: PathBuf,
        source: io::Error,
    },

    /// The path given to [`DirPackage::open`] is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Size and deletion metadata for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry size in bytes.
    pub size: u64,
    /// Deletion marker: the entry exists in the listing but its content has
    /// been voided by a patch container.
    pub deleted: bool,
}

/// An archive container bundling many named entries.
///
/// Entry paths use backslash separators, the archive formats' native
/// convention. `entry_list` is called exactly once per container, at group
/// construction, to populate the cached listfile; everything afterwards goes
/// through the listfile.
pub trait Package: Send + Sync {
    /// Container name, unique within its group (e.g. `A.arc`).
    fn name(&self) -> &str;

    /// All entry paths in this container, in the container's listing order.
    fn entry_list(&self) -> Result<Vec<String>, PackageError>;

    /// Extracts one entry's bytes. `Ok(None)` means not found; that is an
    /// explicit result, not an error.
    fn extract(&self, path: &str) -> Result<Option<Bytes>, PackageError>;

    /// Size/deletion metadata for one entry, if present.
    fn entry_info(&self, path: &str) -> Option<EntryInfo>;
}

/// A loose directory tree presented as a container.
///
/// Every file under the root becomes an entry named by its relative path
/// with backslash separators, e.g. `Textures\foo.blp`.
#[derive(Debug)]
pub struct DirPackage {
    name: String,
    root: PathBuf,
}

impl DirPackage {
    /// Opens a directory as a container. The container name defaults to the
    /// directory's file name.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PackageError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(PackageError::NotADirectory(root));
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Ok(Self { name, root })
    }

    /// Opens a directory as a container under an explicit name (used when
    /// containers are discovered in subdirectories, e.g. `expansion/art`).
    pub fn open_named(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Result<Self, PackageError> {
        let mut pkg = Self::open(root)?;
        pkg.name = name.into();
        Ok(pkg)
    }

    fn io_err(&self, path: &Path, source: io::Error) -> PackageError {
        PackageError::Io {
            container: self.name.clone(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Maps an entry path to the on-disk path.
    fn fs_path(&self, entry: &str) -> PathBuf {
        let mut p = self.root.clone();
        for segment in entry.split('\\').filter(|s| !s.is_empty()) {
            p.push(segment);
        }
        p
    }

    fn walk(&self, dir: &Path, rel: &str, out: &mut Vec<String>) -> Result<(), PackageError> {
        let entries = fs::read_dir(dir).map_err(|e| self.io_err(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| self.io_err(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| self.io_err(&path, e))?;
            if file_type.is_dir() {
                let child_rel = format!("{}{}\\", rel, name);
                self.walk(&path, &child_rel, out)?;
            } else if file_type.is_file() {
                out.push(format!("{}{}", rel, name));
            }
        }
        Ok(())
    }
}

impl Package for DirPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn entry_list(&self) -> Result<Vec<String>, PackageError> {
        let mut entries = Vec::new();
        self.walk(&self.root, "", &mut entries)?;
        // read_dir order is arbitrary; the listfile contract wants entries
        // sharing a prefix contiguous.
        entries.sort_by_key(|e| e.to_ascii_lowercase());
        Ok(entries)
    }

    fn extract(&self, path: &str) -> Result<Option<Bytes>, PackageError> {
        let fs_path = self.fs_path(path);
        match fs::read(&fs_path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(&fs_path, e)),
        }
    }

    fn entry_info(&self, path: &str) -> Option<EntryInfo> {
        let meta = fs::metadata(self.fs_path(path)).ok()?;
        meta.is_file().then_some(EntryInfo {
            size: meta.len(),
            deleted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, DirPackage) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("Textures")).unwrap();
        fs::write(temp.path().join("Textures/foo.blp"), b"foo-bytes").unwrap();
        fs::write(temp.path().join("top.txt"), b"top").unwrap();
        let pkg = DirPackage::open(temp.path()).unwrap();
        (temp, pkg)
    }

    #[test]
    fn test_open_rejects_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("x.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            DirPackage::open(&file),
            Err(PackageError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_entry_list_uses_backslashes() {
        let (_temp, pkg) = fixture();
        let entries = pkg.entry_list().unwrap();
        assert_eq!(entries, vec!["Textures\\foo.blp", "top.txt"]);
    }

    #[test]
    fn test_entry_list_is_sorted_case_insensitively() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("Models")).unwrap();
        fs::write(temp.path().join("zeta.txt"), b"z").unwrap();
        fs::write(temp.path().join("Alpha.txt"), b"a").unwrap();
        fs::write(temp.path().join("Models/x.m2"), b"m").unwrap();

        let pkg = DirPackage::open(temp.path()).unwrap();
        // Sorted by folded form, so the listfile's sort invariant holds
        // without a repair pass.
        assert_eq!(
            pkg.entry_list().unwrap(),
            vec!["Alpha.txt", "Models\\x.m2", "zeta.txt"]
        );
    }

    #[test]
    fn test_extract_found_and_not_found() {
        let (_temp, pkg) = fixture();
        let data = pkg.extract("Textures\\foo.blp").unwrap().unwrap();
        assert_eq!(&data[..], b"foo-bytes");
        assert!(pkg.extract("Textures\\missing.blp").unwrap().is_none());
    }

    #[test]
    fn test_entry_info() {
        let (_temp, pkg) = fixture();
        let info = pkg.entry_info("Textures\\foo.blp").unwrap();
        assert_eq!(info.size, 9);
        assert!(!info.deleted);
        assert!(pkg.entry_info("Textures\\").is_none());
    }
}
