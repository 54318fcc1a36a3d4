//! Fatal-error and deadlock diagnostics.

use std::fmt;

use crate::file::File;
use crate::symbol::Symbol;

/// One captured stack frame, as reported by a worker's back-end.
///
/// The back-end owns the notion of "module" here (a source/runtime module
/// name, not a `Symbol`) — it is whatever the back-end's stack traces are
/// tagged with, used purely to prune internal frames below.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StackFrame {
    pub module: String,
    pub description: String,
}

impl StackFrame {
    pub fn new(module: impl Into<String>, description: impl Into<String>) -> Self {
        StackFrame {
            module: module.into(),
            description: description.into(),
        }
    }
}

/// Strip leading frames belonging to the back-end's own internal modules.
/// Non-internal frames are kept in order.
pub fn prune_stack(stack: &[StackFrame], internal_modules: &[&str]) -> &[StackFrame] {
    let first_external = stack
        .iter()
        .position(|frame| !internal_modules.contains(&frame.module.as_str()))
        .unwrap_or(stack.len());
    &stack[first_external..]
}

/// A worker's abnormal termination: `kind`, a human-readable `reason`, and
/// a captured backtrace.
#[derive(Clone, Debug)]
pub struct BackendFailure {
    pub kind: String,
    pub reason: String,
    pub stack: Vec<StackFrame>,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.kind, self.reason)?;
        for frame in &self.stack {
            writeln!(f, "    at {} ({})", frame.description, frame.module)?;
        }
        Ok(())
    }
}

/// A file left suspended at deadlock, with the symbol it was blocked on.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct DeadlockedFile {
    pub file: File,
    pub symbol: Symbol,
}

/// Why a batch failed to produce a result.
#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    /// A worker's back-end raised an uncaught error.
    #[error("compilation error on file {file}")]
    BackendFailed { file: File, failure: BackendFailure },

    /// Every suspended worker is waiting on a symbol some other suspended
    /// worker is defining; no forward progress is possible.
    #[error("deadlock detected across {} file(s)", .entries.len())]
    Deadlock { entries: Vec<DeadlockedFile> },

    /// The batch compiled successfully, but the warnings-as-errors policy
    /// tripped on the post-batch warnings registry.
    #[error("warnings were reported and warnings-as-errors is enabled")]
    WarningsAsErrors,
}

impl CoordinatorError {
    /// Render the diagnostic a caller should print to standard error:
    /// the per-file error header and pruned stack, or the deadlock table.
    pub fn render(&self, relative_to: &std::path::Path) -> String {
        match self {
            CoordinatorError::BackendFailed { file, failure } => format!(
                "== Compilation error on file {} ==\n{failure}",
                file.display_relative_to(relative_to)
            ),
            CoordinatorError::Deadlock { entries } => render_deadlock(entries, relative_to),
            CoordinatorError::WarningsAsErrors => {
                "warnings were reported; failing due to warnings-as-errors".to_string()
            }
        }
    }
}

/// Render the deadlock summary table: `file => symbol`, right-aligned on
/// the longest file path.
fn render_deadlock(entries: &[DeadlockedFile], relative_to: &std::path::Path) -> String {
    let rendered: Vec<(String, &Symbol)> = entries
        .iter()
        .map(|e| (e.file.display_relative_to(relative_to), &e.symbol))
        .collect();
    let width = rendered.iter().map(|(f, _)| f.len()).max().unwrap_or(0);

    let mut out = String::from("deadlock: the following files are waiting on each other:\n");
    for (file, symbol) in &rendered {
        out.push_str(&format!("  {file:>width$} => {symbol}\n"));
    }
    out
}
