//! The worker↔coordinator wire protocol.
//!
//! Everything the coordinator's event loop consumes — worker-originated
//! events and timer firings alike — is funneled through one tagged
//! [`Event`] enum on one mailbox. This stream must never be partitioned
//! across multiple channels: doing so would break the single point of
//! ordering the event loop relies on.

use crossbeam_channel::Sender;

use crate::error::BackendFailure;
use crate::file::File;
use crate::symbol::{Symbol, WaitKind};
use crate::worker::WorkerId;

/// The coordinator's answer to a `waiting` request.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum WaitReply {
    /// The symbol is now defined; retry the lookup.
    Found,
    /// No running worker will ever define it; proceed and let the
    /// back-end raise its own undefined-symbol error.
    NotFound,
}

/// How a worker's isolated task ended.
#[derive(Debug)]
pub enum ExitOutcome {
    /// Clean exit after the file finished compiling.
    Shutdown { file: File },
    /// An uncaught error (or panic) in the back-end.
    Failure { file: File, failure: BackendFailure },
}

/// Messages a worker sends toward the coordinator.
#[derive(Debug)]
pub enum WorkerEvent {
    /// `struct_available(S)` — no ack required.
    StructAvailable { worker: WorkerId, symbol: Symbol },

    /// `module_available(S, file, bytecode)` — the worker blocks on `ack`
    /// until the coordinator replies, the source of the scheme's
    /// back-pressure.
    ModuleAvailable {
        worker: WorkerId,
        symbol: Symbol,
        file: File,
        bytecode: Vec<u8>,
        ack: Sender<()>,
    },

    /// `waiting(kind, on, defining)` — the worker blocks on `reply`.
    Waiting {
        worker: WorkerId,
        kind: WaitKind,
        on: Symbol,
        defining: Option<Symbol>,
        reply: Sender<WaitReply>,
    },

    /// Supervised termination notice.
    Exited {
        worker: WorkerId,
        outcome: ExitOutcome,
    },
}

/// Everything that can land in the coordinator's single mailbox.
#[derive(Debug)]
pub enum Event {
    Worker(WorkerEvent),
    /// `long_compilation_threshold` elapsed for `worker`. Armed once per spawn, never re-armed.
    LongTimeout { worker: WorkerId },
}

