//! Pending-file queue, running-worker set, and the concurrency cap.

use std::collections::VecDeque;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use rustc_hash::FxHashMap;

use crate::file::File;
use crate::wait_graph::WaitGraph;
use crate::worker::WorkerId;

/// Bookkeeping the coordinator keeps per running worker. `cancel_timer` is
/// the sending half of the long-compilation timer's wakeup channel (see
/// `coordinator::arm_timer`): sending on it, or simply dropping the
/// `WorkerRecord`, wakes the timer thread immediately instead of letting it
/// sleep out the rest of `long_compilation_threshold`. `timer_done` guards
/// `on_long_compilation` itself against a `LongTimeout` event that was
/// already in flight at the moment of cancellation — it makes the callback
/// idempotent, it does not keep the thread alive.
pub struct WorkerRecord {
    pub id: WorkerId,
    pub file: File,
    pub handle: JoinHandle<()>,
    pub timer_done: bool,
    pub cancel_timer: Sender<()>,
}

/// The concurrency cap `C = max(hardware_parallelism, 2)`,
/// or an explicit override for deterministic tests.
pub fn default_cap() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .max(2)
}

/// Pending queue + running set + wait-graph + cap, all single-threaded
/// state owned by the coordinator.
pub struct Scheduler {
    pending: VecDeque<File>,
    running: FxHashMap<WorkerId, WorkerRecord>,
    wait: WaitGraph,
    cap: usize,
}

impl Scheduler {
    pub fn new(cap: usize) -> Self {
        Scheduler {
            pending: VecDeque::new(),
            running: FxHashMap::default(),
            wait: WaitGraph::new(),
            cap,
        }
    }

    pub fn enqueue_all(&mut self, files: impl IntoIterator<Item = File>) {
        self.pending.extend(files);
    }

    /// Workers currently doing CPU work, i.e. not suspended.
    pub fn active(&self) -> usize {
        self.running.len().saturating_sub(self.wait.len())
    }

    /// Whether another file can be admitted right now.
    pub fn can_admit(&self) -> bool {
        self.active() < self.cap && !self.pending.is_empty()
    }

    pub fn pop_pending(&mut self) -> Option<File> {
        self.pending.pop_front()
    }

    pub fn insert_running(&mut self, record: WorkerRecord) {
        self.running.insert(record.id, record);
    }

    pub fn remove_running(&mut self, id: WorkerId) -> Option<WorkerRecord> {
        self.running.remove(&id)
    }

    pub fn running_record_mut(&mut self, id: WorkerId) -> Option<&mut WorkerRecord> {
        self.running.get_mut(&id)
    }

    pub fn wait(&self) -> &WaitGraph {
        &self.wait
    }

    pub fn wait_mut(&mut self) -> &mut WaitGraph {
        &mut self.wait
    }

    /// `pending` empty and `running` empty: the batch succeeded.
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty()
    }

    /// `pending` empty and every running worker is suspended: a stall.
    pub fn is_stalled(&self) -> bool {
        !self.running.is_empty() && self.pending.is_empty() && self.wait.len() == self.running.len()
    }

    /// Snapshot of `(id, file)` for every still-running worker, without
    /// consuming the scheduler.
    pub fn running_files(&self) -> Vec<(WorkerId, File)> {
        self.running
            .iter()
            .map(|(&id, record)| (id, record.file.clone()))
            .collect()
    }

    /// Drop every running worker's record. The `JoinHandle`s are dropped
    /// without joining: the OS threads are detached, not killed. See
    /// `coordinator::terminate_remaining`.
    pub fn detach_all_running(&mut self) {
        self.running.clear();
    }
}
