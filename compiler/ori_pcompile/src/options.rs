//! Public configuration surface.

use std::sync::Arc;
use std::time::Duration;

use crate::file::File;
use crate::symbol::Symbol;

type FileCallback = Arc<dyn Fn(&File) + Send + Sync>;
type ModuleCallback = Arc<dyn Fn(&File, &Symbol, &[u8]) + Send + Sync>;
type WarningsRegistry = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Default long-compilation threshold.
pub const DEFAULT_LONG_COMPILATION_THRESHOLD: Duration = Duration::from_millis(5000);

/// Options accepted by [`crate::files`] and [`crate::files_to_path`].
///
/// Plain public fields plus a `Default` impl and a couple of `with_*`
/// convenience constructors, not a procedural builder.
#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Called once per successfully compiled file after the worker exits
    /// cleanly.
    pub on_file_done: Option<FileCallback>,

    /// Called if a worker is still running `long_compilation_threshold`
    /// ms after its spawn. Invoked at most once per worker.
    pub on_long_compilation: Option<FileCallback>,

    /// Called inline while the coordinator holds the worker waiting for
    /// the `module_available` ack; should be fast.
    pub on_module_compiled: Option<ModuleCallback>,

    /// How long a worker may run before `on_long_compilation` fires.
    /// Defaults to 5000 ms.
    pub long_compilation_threshold: Option<Duration>,

    /// Override for the concurrency cap `C`. `None` means
    /// `max(hardware_parallelism, 2)`.
    pub cap: Option<usize>,

    /// Consulted once after a successful batch; if it returns any
    /// warnings and `warnings_as_errors` is set, the batch still exits
    /// non-zero. The registry itself is owned by the caller — this is
    /// just the hook.
    pub warnings: Option<WarningsRegistry>,
    pub warnings_as_errors: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_file_done(mut self, f: impl Fn(&File) + Send + Sync + 'static) -> Self {
        self.on_file_done = Some(Arc::new(f));
        self
    }

    pub fn with_on_long_compilation(mut self, f: impl Fn(&File) + Send + Sync + 'static) -> Self {
        self.on_long_compilation = Some(Arc::new(f));
        self
    }

    pub fn with_on_module_compiled(
        mut self,
        f: impl Fn(&File, &Symbol, &[u8]) + Send + Sync + 'static,
    ) -> Self {
        self.on_module_compiled = Some(Arc::new(f));
        self
    }

    pub fn with_long_compilation_threshold(mut self, threshold: Duration) -> Self {
        self.long_compilation_threshold = Some(threshold);
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn with_warnings_as_errors(
        mut self,
        registry: impl Fn() -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.warnings = Some(Arc::new(registry));
        self.warnings_as_errors = true;
        self
    }

    pub(crate) fn threshold(&self) -> Duration {
        self.long_compilation_threshold
            .unwrap_or(DEFAULT_LONG_COMPILATION_THRESHOLD)
    }

    pub(crate) fn cap_or_default(&self) -> usize {
        self.cap.unwrap_or_else(crate::scheduler::default_cap)
    }
}
