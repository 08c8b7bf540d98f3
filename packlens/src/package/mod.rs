//! Archive container boundary and the package group façade.
//!
//! Container parsing is an external concern: anything that can report an
//! ordered entry list and extract a named entry can participate via the
//! [`Package`] trait. This crate ships one implementation, [`DirPackage`],
//! which presents a loose directory tree as a container so that the CLI and
//! tests have a real package without any archive-format code.
//!
//! A [`PackageGroup`] owns the ordered set of containers representing one
//! logical game installation, plus a per-container cached [`Listfile`]. Load
//! order determines priority: the first container to carry a path wins for
//! both content extraction and metadata lookup, matching the virtual
//! reference primary semantics.

mod container;
mod group;
mod listfile;

pub use container::{DirPackage, EntryInfo, Package, PackageError};
pub use group::{GroupId, PackageGroup, ReferenceInfo};
pub use listfile::Listfile;

#[cfg(test)]
pub(crate) use group::testing;
