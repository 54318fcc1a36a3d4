//! The single-threaded event loop: the coordinator itself.
//!
//! Every byte of mutable batch state — the scheduler, the wait-graph,
//! the result log — is owned here and mutated only from inside [`run`].
//! There are no locks: cross-thread communication happens exclusively
//! over the channels in [`crate::protocol`].

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::error::{CoordinatorError, DeadlockedFile};
use crate::file::File;
use crate::options::CompileOptions;
use crate::protocol::{Event, ExitOutcome, WaitReply, WorkerEvent};
use crate::result_log::ResultLog;
use crate::scheduler::{Scheduler, WorkerRecord};
use crate::symbol::{DefinitionKind, Symbol};
use crate::wait_graph::WaitEntry;
use crate::worker::{self, Backend, WorkerId};

/// Run one batch to completion: spawn workers up to the cap, dispatch
/// events until the queue drains and every worker has exited, release
/// stalled workers or declare deadlock as needed.
///
/// Returns the modules successfully compiled, in the order their
/// `module_available` events were logged.
pub fn run(
    files: Vec<File>,
    dest: Option<PathBuf>,
    backend: Arc<dyn Backend>,
    options: &CompileOptions,
) -> Result<Vec<Symbol>, CoordinatorError> {
    let cap = options.cap_or_default();
    let mut scheduler = Scheduler::new(cap);
    scheduler.enqueue_all(files);
    let mut log = ResultLog::new();
    let (tx, rx) = unbounded::<Event>();

    loop {
        admit_pending(&mut scheduler, &dest, &backend, &tx, options.threshold());

        if scheduler.is_finished() {
            info!("batch finished: {} module(s) compiled", log.modules_in_order().len());
            return Ok(log.modules_in_order());
        }

        if scheduler.is_stalled() {
            if let Some(err) = resolve_stall(&mut scheduler) {
                return Err(err);
            }
            continue;
        }

        let event = match rx.recv() {
            Ok(event) => event,
            Err(_) => {
                // Every worker handle (and its mailbox clone) is gone with
                // nothing left to report; nothing further can happen.
                return Ok(log.modules_in_order());
            }
        };

        if let Some(outcome) = dispatch(event, &mut scheduler, &mut log, options) {
            return outcome;
        }
    }
}

/// Spawn new workers from `pending` while the cap allows it.
fn admit_pending(
    scheduler: &mut Scheduler,
    dest: &Option<PathBuf>,
    backend: &Arc<dyn Backend>,
    tx: &Sender<Event>,
    threshold: Duration,
) {
    while scheduler.can_admit() {
        let Some(file) = scheduler.pop_pending() else {
            break;
        };
        let id = WorkerId::next();
        debug!(?id, %file, "spawning worker");
        let handle = worker::spawn(id, file.clone(), dest.clone(), Arc::clone(backend), tx.clone());
        let cancel_timer = arm_timer(id, threshold, tx.clone());
        scheduler.insert_running(WorkerRecord {
            id,
            file,
            handle,
            timer_done: false,
            cancel_timer,
        });
    }
}

/// Arm the once-only long-compilation timer for a newly spawned worker.
///
/// Returns the cancel handle: sending on it (or dropping it) wakes the
/// timer thread immediately via `recv_timeout` instead of leaving it
/// asleep for the rest of `threshold`, so a batch that completes well
/// before the threshold doesn't leak a sleeping thread per worker.
fn arm_timer(worker: WorkerId, threshold: Duration, tx: Sender<Event>) -> Sender<()> {
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(threshold) {
            let _ = tx.send(Event::LongTimeout { worker });
        }
    });
    cancel_tx
}

/// Handle one coordinator event to completion.
/// Returns `Some(result)` when the batch must terminate.
fn dispatch(
    event: Event,
    scheduler: &mut Scheduler,
    log: &mut ResultLog,
    options: &CompileOptions,
) -> Option<Result<Vec<Symbol>, CoordinatorError>> {
    match event {
        Event::LongTimeout { worker } => {
            handle_long_timeout(worker, scheduler, options);
            None
        }
        Event::Worker(WorkerEvent::StructAvailable { worker: _, symbol }) => {
            handle_definition_available(symbol, DefinitionKind::Struct, scheduler, log);
            None
        }
        Event::Worker(WorkerEvent::ModuleAvailable {
            worker,
            symbol,
            file,
            bytecode,
            ack,
        }) => {
            if let Some(cb) = &options.on_module_compiled {
                cb(&file, &symbol, &bytecode);
            }
            let _ = ack.send(());
            if let Some(record) = scheduler.running_record_mut(worker) {
                record.timer_done = true;
                let _ = record.cancel_timer.send(());
            }
            handle_definition_available(symbol, DefinitionKind::Module, scheduler, log);
            None
        }
        Event::Worker(WorkerEvent::Waiting {
            worker,
            kind,
            on,
            defining,
            reply,
        }) => {
            if log.satisfies(kind, &on) {
                let _ = reply.send(WaitReply::Found);
            } else {
                scheduler.wait_mut().suspend(WaitEntry {
                    id: worker,
                    reply,
                    kind,
                    waiting_on: on,
                    defining,
                });
            }
            None
        }
        Event::Worker(WorkerEvent::Exited { worker, outcome }) => handle_exit(worker, outcome, scheduler, options),
    }
}

fn handle_definition_available(
    symbol: Symbol,
    kind: DefinitionKind,
    scheduler: &mut Scheduler,
    log: &mut ResultLog,
) {
    log.append(kind, symbol.clone());
    for entry in scheduler.wait_mut().release_matching(&symbol, kind) {
        let _ = entry.reply.send(WaitReply::Found);
    }
}

fn handle_long_timeout(worker: WorkerId, scheduler: &mut Scheduler, options: &CompileOptions) {
    let Some(record) = scheduler.running_record_mut(worker) else {
        // Worker already gone; this firing raced its exit. Drained.
        return;
    };
    if record.timer_done {
        return;
    }
    record.timer_done = true;
    if let Some(cb) = &options.on_long_compilation {
        cb(&record.file);
    }
}

fn handle_exit(
    worker: WorkerId,
    outcome: ExitOutcome,
    scheduler: &mut Scheduler,
    options: &CompileOptions,
) -> Option<Result<Vec<Symbol>, CoordinatorError>> {
    match outcome {
        ExitOutcome::Shutdown { file } => {
            if let Some(cb) = &options.on_file_done {
                cb(&file);
            }
            scheduler.wait_mut().remove(worker);
            if let Some(record) = scheduler.remove_running(worker) {
                let _ = record.cancel_timer.send(());
                let _ = record.handle.join();
            }
            None
        }
        ExitOutcome::Failure { file, failure } => {
            warn!(%file, "worker failed: {}", failure.reason);
            scheduler.wait_mut().remove(worker);
            scheduler.remove_running(worker);
            terminate_remaining(scheduler);
            Some(Err(CoordinatorError::BackendFailed { file, failure }))
        }
    }
}

/// Stall resolution. Releases every entry with no definer waiting on it
/// with `not_found` and returns `None` if any were found; returns
/// `Some(deadlock error)` only when every suspended worker is blocked in
/// a cycle and none can be released.
fn resolve_stall(scheduler: &mut Scheduler) -> Option<CoordinatorError> {
    if scheduler.wait().is_cyclic_closed() {
        let entries = deadlocked_files(scheduler);
        warn!("deadlock across {} file(s)", entries.len());
        terminate_remaining(scheduler);
        return Some(CoordinatorError::Deadlock { entries });
    }

    for id in scheduler.wait().no_definer_entries() {
        if let Some(entry) = scheduler.wait_mut().remove(id) {
            let _ = entry.reply.send(WaitReply::NotFound);
        }
    }
    None
}

fn deadlocked_files(scheduler: &Scheduler) -> Vec<DeadlockedFile> {
    let mut out = Vec::new();
    for (id, file) in scheduler.running_files() {
        if let Some(entry) = scheduler.wait().entry(id) {
            out.push(DeadlockedFile {
                file,
                symbol: entry.waiting_on.clone(),
            });
        }
    }
    out
}

/// Best-effort termination of every still-running worker. Safe Rust cannot
/// preempt a thread mid-computation; this unblocks the two documented
/// suspension points (the `waiting` reply and the `module_available`
/// ack) so any worker currently *at* one wakes up and observes
/// `not_found`/a dropped ack, and detaches the rest. A worker that is
/// actively, uninterruptibly running the back-end is only actually
/// reaped when the host process exits.
fn terminate_remaining(scheduler: &mut Scheduler) {
    for entry in scheduler.wait_mut().drain() {
        let _ = entry.reply.send(WaitReply::NotFound);
    }
    scheduler.detach_all_running();
}


#[cfg(test)]
mod proptests;
