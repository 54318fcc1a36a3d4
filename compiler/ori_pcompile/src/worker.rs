//! The worker: a one-shot task that compiles exactly one file.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

use crate::error::BackendFailure;
use crate::file::File;
use crate::protocol::{Event, ExitOutcome, WaitReply, WorkerEvent};
use crate::symbol::{Symbol, WaitKind};

/// A unique, stable handle for a running worker. Used as the key across
/// every table the coordinator keeps.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct WorkerId(u64);

impl WorkerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        WorkerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The external compiler back-end.
///
/// `ori_pcompile` never implements this itself — it only calls into it
/// from an isolated worker task and reacts to the events `ctx` is asked
/// to send. Implementations need not be `panic`-safe: an unwinding panic
/// is caught by the worker wrapper and reported as a `Failure` exit, same
/// as a returned `Err`.
pub trait Backend: Send + Sync {
    /// Compile `file`, writing artifacts under `dest` if given. Whenever
    /// the back-end hits a reference to an undefined symbol or finishes
    /// defining one, it must go through `ctx` so the coordinator can see
    /// it — this is the on-demand loader hook.
    fn compile(
        &self,
        file: &File,
        dest: Option<&Path>,
        ctx: &mut WorkerContext<'_>,
    ) -> Result<(), BackendFailure>;
}

/// The channel a worker uses to talk to the coordinator, handed to
/// [`Backend::compile`] for the duration of one file's compilation.
pub struct WorkerContext<'a> {
    id: WorkerId,
    mailbox: &'a Sender<Event>,
}

impl<'a> WorkerContext<'a> {
    pub(crate) fn new(id: WorkerId, mailbox: &'a Sender<Event>) -> Self {
        WorkerContext { id, mailbox }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.id
    }

    /// `waiting(kind, on, defining)`: block until the coordinator replies
    /// `found` or `not_found`.
    ///
    /// Returns `Err` only if the coordinator's receiver has already been
    /// dropped (the batch is tearing down); the back-end should treat
    /// that the same as `NotFound` and unwind quickly.
    pub fn wait_for(
        &mut self,
        kind: WaitKind,
        on: Symbol,
        defining: Option<Symbol>,
    ) -> WaitReply {
        let (reply_tx, reply_rx) = bounded(1);
        let sent = self.mailbox.send(Event::Worker(WorkerEvent::Waiting {
            worker: self.id,
            kind,
            on,
            defining,
            reply: reply_tx,
        }));
        if sent.is_err() {
            return WaitReply::NotFound;
        }
        reply_rx.recv().unwrap_or(WaitReply::NotFound)
    }

    /// `module_available(S, file, bytecode)`: block until the coordinator
    /// acks, guaranteeing the symbol is logged before any other worker
    /// can be released against it.
    pub fn module_available(&mut self, file: File, symbol: Symbol, bytecode: Vec<u8>) {
        let (ack_tx, ack_rx) = bounded(1);
        let sent = self.mailbox.send(Event::Worker(WorkerEvent::ModuleAvailable {
            worker: self.id,
            symbol,
            file,
            bytecode,
            ack: ack_tx,
        }));
        if sent.is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// `struct_available(S)`: fire-and-forget, no ack required.
    pub fn struct_available(&mut self, symbol: Symbol) {
        let _ = self
            .mailbox
            .send(Event::Worker(WorkerEvent::StructAvailable {
                worker: self.id,
                symbol,
            }));
    }
}

/// Spawn a worker thread compiling `file`, wired to send its terminal
/// event on `mailbox`. Isolation + failure containment: an unwinding panic
/// inside `backend.compile` is caught here and converted into exactly the
/// same `Failure` exit a returned `Err` would produce, so one worker's
/// crash never brings down the coordinator or its peers.
pub fn spawn(
    id: WorkerId,
    file: File,
    dest: Option<std::path::PathBuf>,
    backend: std::sync::Arc<dyn Backend>,
    mailbox: Sender<Event>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let result = {
            let mailbox_ref = &mailbox;
            panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = WorkerContext::new(id, mailbox_ref);
                backend.compile(&file, dest.as_deref(), &mut ctx)
            }))
        };

        let outcome = match result {
            Ok(Ok(())) => ExitOutcome::Shutdown { file: file.clone() },
            Ok(Err(failure)) => ExitOutcome::Failure {
                file: file.clone(),
                failure,
            },
            Err(panic) => ExitOutcome::Failure {
                file: file.clone(),
                failure: BackendFailure {
                    kind: "panic".to_string(),
                    reason: panic_message(&panic),
                    stack: Vec::new(),
                },
            },
        };

        let _ = mailbox.send(Event::Worker(WorkerEvent::Exited {
            worker: id,
            outcome,
        }));
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}
