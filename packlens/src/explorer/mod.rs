//! The explorer: background enumeration of the virtual file tree.
//!
//! The explorer incrementally and concurrently expands the merged tree, one
//! reference's immediate children at a time, without ever blocking the
//! consumer thread. A reference is never enumerated twice, and a child is
//! never published before its parent's existence is known.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Explorer                            │
//! │                                                              │
//! │  submit_work ──► state check (arena, atomic)                 │
//! │        │  NotEnumerated            Enumerating               │
//! │        ▼                                ▼                    │
//! │   work queue (FIFO)                wait queue                │
//! │        │                                │ parent Enumerated  │
//! │        ▼                                │ (resubmission loop)│
//! │   dispatch loop ──► worker pool ◄───────┘                    │
//! │        │                 │                                   │
//! │        │                 ▼                                   │
//! │        │        enumerate children, fold into virtual tree   │
//! │        │                 │                                   │
//! │        ▼                 ▼                                   │
//! │   (poll tick)     discovered buffer ──► drain_discovered()   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two long-lived polling loops (dispatch and resubmission) run as tokio
//! tasks; per-reference expansion runs on a bounded worker pool guarded by a
//! semaphore. Shutdown is cooperative via a cancellation token: workers
//! check it at the top of each unit of work, and [`Explorer::stop`] joins
//! the loops and drains the pool before returning, which is what makes a
//! reload safe to sequence.

mod builder;
mod mapper;
mod worker;

use thiserror::Error;

use crate::reference::RefId;

pub use builder::{Explorer, ExplorerConfig};
pub use mapper::VirtualMapper;

/// Errors raised by enumeration.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// A hard reference points at a container with no cached listfile.
    ///
    /// Every hard reference must point to an already-loaded container, so
    /// this is an internal invariant violation, not a recoverable I/O
    /// failure. It halts only the offending unit of work.
    #[error("no cached listfile for container `{container}`; every hard reference must point to a loaded container")]
    MissingListfile { container: String },
}

/// One discovered hard child, as observed by the consumer.
///
/// Workers append all children found in a single enumeration pass as one
/// contiguous block, so ordering within one parent is deterministic;
/// ordering between different parents' blocks is whichever worker finished
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    /// The newly discovered hard reference.
    pub reference: RefId,
    /// The virtual reference it folded into.
    pub virtual_ref: RefId,
    /// True if the hard reference was appended to an existing virtual
    /// reference as an override; false if it became a new virtual's primary.
    pub merged: bool,
}
