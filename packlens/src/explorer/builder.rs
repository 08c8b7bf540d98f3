//! The explorer engine: queues, polling loops, and the bounded worker pool.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::node::NodeStore;
use crate::package::PackageGroup;
use crate::reference::{RefArena, RefId, SubmitDisposition};

use super::{worker, Discovery, VirtualMapper};

/// Default polling interval for the dispatch and resubmission loops.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Explorer configuration.
#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    /// Maximum number of concurrently running enumeration workers.
    pub worker_count: usize,

    /// Delay between scans of the work and wait queues.
    pub poll_interval: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        // Listfile scans are short and CPU-bound; a small multiple of the
        // available cores keeps the pool busy without thrashing.
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(8)
            .min(32);
        Self {
            worker_count,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Shared state between the explorer handle, its loops, and its workers.
pub(super) struct Inner {
    pub(super) group: Arc<PackageGroup>,
    pub(super) store: Arc<NodeStore>,
    pub(super) arena: Arc<RefArena>,
    pub(super) mapper: VirtualMapper,
    pub(super) config: ExplorerConfig,

    /// FIFO queue of claimed references awaiting a worker.
    pub(super) work: Mutex<VecDeque<RefId>>,
    /// References submitted while mid-flight; resubmitted once their parent
    /// is enumerated.
    pub(super) wait: Mutex<Vec<RefId>>,
    /// Consumer-polled buffer; workers append one contiguous block per
    /// enumeration pass.
    pub(super) discovered: Mutex<Vec<Discovery>>,

    pub(super) pool: Arc<Semaphore>,
    pub(super) cancel: CancellationToken,
    pub(super) in_flight: AtomicUsize,
}

impl Inner {
    /// Idempotent enqueue. The state transition and the queue append are
    /// driven by the arena's atomic claim, so duplicate submissions either
    /// park on the wait queue or no-op.
    pub(super) fn submit(&self, id: RefId) {
        match self.arena.try_begin_enumeration(id) {
            SubmitDisposition::Begin => {
                self.work.lock().push_back(id);
                debug!(reference = %id, "queued for enumeration");
            }
            SubmitDisposition::Busy => {
                let mut wait = self.wait.lock();
                if !wait.contains(&id) {
                    wait.push(id);
                    debug!(reference = %id, "parked on wait queue");
                }
            }
            SubmitDisposition::Done => {}
        }
    }
}

/// The background enumeration engine for one package group session.
///
/// Construct with [`Explorer::new`], then [`start`] it from within a tokio
/// runtime. The consumer submits references with [`submit_work`] and polls
/// [`drain_discovered`] at its own cadence; it never blocks on worker
/// completion.
///
/// [`start`]: Explorer::start
/// [`submit_work`]: Explorer::submit_work
/// [`drain_discovered`]: Explorer::drain_discovered
pub struct Explorer {
    inner: Arc<Inner>,
    loops: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl Explorer {
    /// Creates an explorer over an already-built group, store, arena, and
    /// mapper (the composition root seeds the arena before handing it over).
    pub fn new(
        group: Arc<PackageGroup>,
        store: Arc<NodeStore>,
        arena: Arc<RefArena>,
        mapper: VirtualMapper,
        config: ExplorerConfig,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.worker_count));
        Self {
            inner: Arc::new(Inner {
                group,
                store,
                arena,
                mapper,
                config,
                work: Mutex::new(VecDeque::new()),
                wait: Mutex::new(Vec::new()),
                discovered: Mutex::new(Vec::new()),
                pool,
                cancel: CancellationToken::new(),
                in_flight: AtomicUsize::new(0),
            }),
            loops: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the dispatch and resubmission loops. Must be called from
    /// within a tokio runtime. Calling it more than once is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut loops = self.loops.lock();
        loops.push(tokio::spawn(dispatch_loop(Arc::clone(&self.inner))));
        loops.push(tokio::spawn(resubmission_loop(Arc::clone(&self.inner))));
        info!(
            workers = self.inner.config.worker_count,
            poll_ms = self.inner.config.poll_interval.as_millis() as u64,
            "explorer started"
        );
    }

    /// Stops the engine: signals cancellation, joins both loops, then drains
    /// the worker pool so no worker is still running against this session's
    /// state when this returns. Required sequencing before any reload.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.loops.lock());
        for handle in handles {
            let _ = handle.await;
        }

        // Holding every permit means every in-flight worker has finished its
        // current (bounded, short) unit of work.
        let total = self.inner.config.worker_count as u32;
        if let Ok(permits) = self.inner.pool.clone().acquire_many_owned(total).await {
            drop(permits);
        }

        info!("explorer stopped");
    }

    /// Idempotent enqueue of a reference for enumeration. See
    /// [`Inner::submit`] for dispatch rules.
    pub fn submit_work(&self, id: RefId) {
        self.inner.submit(id);
    }

    /// Drains the discovered buffer. Every discovered reference is observed
    /// exactly once, parent before child within each subtree.
    pub fn drain_discovered(&self) -> Vec<Discovery> {
        std::mem::take(&mut *self.inner.discovered.lock())
    }

    /// True when no work is queued, parked, or running.
    pub fn is_idle(&self) -> bool {
        self.inner.work.lock().is_empty()
            && self.inner.wait.lock().is_empty()
            && self.inner.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Number of references in the work queue.
    pub fn pending_work(&self) -> usize {
        self.inner.work.lock().len()
    }

    /// Number of references parked on the wait queue.
    pub fn pending_wait(&self) -> usize {
        self.inner.wait.lock().len()
    }

    /// Lookup of the virtual reference merging all hard references at a
    /// logical path.
    pub fn virtual_for(&self, path: &str) -> Option<RefId> {
        self.inner.mapper.virtual_for(path)
    }

    /// Records a path → virtual mapping (first writer wins).
    pub fn add_virtual_mapping(&self, path: &str, virtual_ref: RefId) -> bool {
        self.inner.mapper.add_mapping(path, virtual_ref)
    }

    /// The shared reference arena.
    pub fn arena(&self) -> &Arc<RefArena> {
        &self.inner.arena
    }

    /// The owning package group.
    pub fn group(&self) -> &Arc<PackageGroup> {
        &self.inner.group
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("group", &self.inner.group.id())
            .field("pending_work", &self.pending_work())
            .field("pending_wait", &self.pending_wait())
            .field("references", &self.inner.arena.len())
            .finish()
    }
}

/// Dispatch loop: pops the head of the FIFO work queue and hands it to the
/// bounded worker pool without waiting for completion. The group and store
/// are loaded before the explorer exists, so the queue check is the only
/// gate.
async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            _ = tokio::time::sleep(inner.config.poll_interval) => {}
        }

        loop {
            let Some(id) = inner.work.lock().pop_front() else {
                break;
            };

            // Counted as in-flight from the moment it leaves the queue, so
            // idleness checks never observe a gap between pop and spawn.
            inner.in_flight.fetch_add(1, Ordering::SeqCst);
            let permit = tokio::select! {
                biased;
                _ = inner.cancel.cancelled() => {
                    inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
                permit = inner.pool.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                        return;
                    }
                },
            };
            let task_inner = Arc::clone(&inner);
            tokio::spawn(async move {
                if let Err(e) = worker::enumerate(&task_inner, id).await {
                    error!(reference = %id, error = %e, "enumeration failed");
                }
                task_inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                drop(permit);
            });
        }
    }
    debug!("dispatch loop exited");
}

/// Resubmission loop: re-submits wait-queue entries once their parent has
/// finished enumerating. This resolves the race where a child was requested
/// while its parent was still mid-flight: the child cannot be safely
/// expanded until the parent's own children (itself included) are fully
/// known.
async fn resubmission_loop(inner: Arc<Inner>) {
    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            _ = tokio::time::sleep(inner.config.poll_interval) => {}
        }

        let ready: Vec<RefId> = {
            let mut wait = inner.wait.lock();
            let mut ready = Vec::new();
            wait.retain(|&id| {
                if inner.arena.parent_enumerated(id) {
                    ready.push(id);
                    false
                } else {
                    true
                }
            });
            ready
        };

        for id in ready {
            inner.submit(id);
        }
    }
    debug!("resubmission loop exited");
}
