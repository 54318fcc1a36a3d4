//! Parallel compilation coordinator.
//!
//! Compiles a set of files concurrently, resolving cross-file symbol
//! dependencies as they're discovered rather than requiring a
//! pre-computed dependency graph. Modeled on an on-demand, worker-per-file
//! compilation strategy: each file runs on its own thread, blocking only
//! when it references a symbol another file hasn't defined yet. A single
//! coordinator thread owns all shared state and serializes every decision
//! through one event loop, so nothing in this crate needs a lock.
//!
//! ```
//! use ori_pcompile::{files, Backend, BackendFailure, CompileOptions, File, WorkerContext};
//! use std::path::Path;
//!
//! struct NoOpBackend;
//!
//! impl Backend for NoOpBackend {
//!     fn compile(
//!         &self,
//!         file: &File,
//!         _dest: Option<&Path>,
//!         ctx: &mut WorkerContext<'_>,
//!     ) -> Result<(), BackendFailure> {
//!         ctx.module_available(file.clone(), file.path().display().to_string().into(), Vec::new());
//!         Ok(())
//!     }
//! }
//!
//! let result = files(
//!     vec![File::new("a.src")],
//!     std::sync::Arc::new(NoOpBackend),
//!     CompileOptions::new(),
//! );
//! assert!(result.is_ok());
//! ```

mod coordinator;
mod error;
mod file;
mod options;
mod protocol;
mod result_log;
mod scheduler;
mod symbol;
mod wait_graph;
mod worker;

use std::path::Path;
use std::sync::Arc;

pub use error::{BackendFailure, CoordinatorError, DeadlockedFile, StackFrame};
pub use file::File;
pub use options::{CompileOptions, DEFAULT_LONG_COMPILATION_THRESHOLD};
pub use protocol::WaitReply;
pub use symbol::{DefinitionKind, Symbol, WaitKind};
pub use worker::{Backend, WorkerContext, WorkerId};

/// Compile `files` concurrently. Returns the modules that were
/// successfully compiled, in the order they were logged, or the first
/// fatal error (a back-end failure or a deadlock) encountered.
///
/// Artifacts are not written to disk; back-ends that need a destination
/// directory should use [`files_to_path`].
pub fn files(
    files: Vec<File>,
    backend: Arc<dyn Backend>,
    options: CompileOptions,
) -> Result<Vec<Symbol>, CoordinatorError> {
    run(files, None, backend, options)
}

/// Like [`files`], but passes `dest` through to the back-end as the
/// directory compiled artifacts should be written under.
pub fn files_to_path(
    files: Vec<File>,
    dest: &Path,
    backend: Arc<dyn Backend>,
    options: CompileOptions,
) -> Result<Vec<Symbol>, CoordinatorError> {
    run(files, Some(dest.to_path_buf()), backend, options)
}

fn run(
    files: Vec<File>,
    dest: Option<std::path::PathBuf>,
    backend: Arc<dyn Backend>,
    options: CompileOptions,
) -> Result<Vec<Symbol>, CoordinatorError> {
    let warnings_as_errors = options.warnings_as_errors;
    let warnings = options.warnings.clone();

    let result = coordinator::run(files, dest, backend, &options)?;

    if warnings_as_errors {
        if let Some(registry) = warnings {
            if !registry().is_empty() {
                return Err(CoordinatorError::WarningsAsErrors);
            }
        }
    }

    Ok(result)
}
