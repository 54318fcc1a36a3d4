//! Randomized-DAG invariant checks, filling the gap `DESIGN.md` calls
//! out: P1 (concurrency cap), P2 (no duplicate log entries), and P4
//! (release safety) over batches shaped by `proptest` rather than the
//! hand-picked scenarios in `tests.rs`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::*;
use crate::error::BackendFailure;
use crate::symbol::WaitKind;
use crate::worker::WorkerContext;

/// One node in a generated dependency DAG: the module it defines, and the
/// (strictly lower-indexed) modules it must observe as defined first.
/// Indices-only-point-backward is what keeps the generated graph acyclic.
struct DagNode {
    defines: Symbol,
    depends_on: Vec<Symbol>,
}

/// A backend driving a whole generated DAG. Every `wait_for` call that
/// comes back `NotFound` is treated as a hard failure: in an acyclic
/// batch where every referenced symbol belongs to some file in the set,
/// a `NotFound` can only mean the coordinator released a wait before the
/// symbol was actually logged — a P4 violation.
struct DagBackend {
    nodes: Vec<DagNode>,
    active: Arc<AtomicUsize>,
    peak_active: Arc<AtomicUsize>,
}

impl DagBackend {
    fn node_for<'a>(&'a self, file: &File) -> &'a DagNode {
        let index: usize = file
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix('f'))
            .and_then(|s| s.parse().ok())
            .expect("file names are f<index>.src");
        &self.nodes[index]
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Backend for DagBackend {
    fn compile(
        &self,
        file: &File,
        _dest: Option<&Path>,
        ctx: &mut WorkerContext<'_>,
    ) -> Result<(), BackendFailure> {
        let node = self.node_for(file);
        self.enter();

        for dep in &node.depends_on {
            self.leave();
            let reply = ctx.wait_for(WaitKind::Module, dep.clone(), Some(node.defines.clone()));
            self.enter();
            if reply == WaitReply::NotFound {
                self.leave();
                return Err(BackendFailure {
                    kind: "release_safety_violation".to_string(),
                    reason: format!("{} was released not_found for a symbol every file defines", dep),
                    stack: Vec::new(),
                });
            }
        }

        self.leave();
        ctx.module_available(file.clone(), node.defines.clone(), Vec::new());
        Ok(())
    }
}

/// Build a random acyclic dependency graph of `n` nodes: node `i` may
/// depend on any subset of `0..i`, derived from one `usize` of
/// randomness per node so the strategy stays a flat `Vec` shape instead
/// of a nested `prop_flat_map` chain.
fn dag_nodes(n: usize, seeds: &[usize]) -> Vec<DagNode> {
    (0..n)
        .map(|i| {
            let seed = seeds[i];
            let mut depends_on = Vec::new();
            if i > 0 {
                // Up to two candidate predecessors per node, picked
                // deterministically from the seed; duplicates collapse
                // naturally since `depends_on` is deref'd through a set
                // of distinct symbols anyway.
                for slot in 0..2 {
                    let candidate = (seed.rotate_left(slot as u32 * 7)) % i;
                    let symbol = Symbol::new(format!("m{candidate}"));
                    if !depends_on.contains(&symbol) {
                        depends_on.push(symbol);
                    }
                }
            }
            DagNode {
                defines: Symbol::new(format!("m{i}")),
                depends_on,
            }
        })
        .collect()
}

/// A deterministic shuffle of `0..n`, so the batch isn't always submitted
/// in already-sorted dependency order.
fn shuffled_order(n: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut state = seed | 1;
    for i in (1..order.len()).rev() {
        // xorshift64*, good enough for a reproducible shuffle in a test.
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state as usize) % (i + 1);
        order.swap(i, j);
    }
    order
}

proptest! {
    /// P1 + P2 + P4: a generated DAG of up to 10 files always compiles to
    /// exactly one module per node, with no file ever seeing its
    /// dependency released `not_found`, and the scheduler never running
    /// more than `cap` workers actively (unsuspended) at once.
    #[test]
    fn dag_batches_compile_fully_within_the_cap(
        n in 2usize..10,
        seeds in proptest::collection::vec(0usize..10_000, 10),
        cap in 1usize..4,
        order_seed in any::<u64>(),
    ) {
        let nodes = dag_nodes(n, &seeds[..n]);
        let files: Vec<File> = shuffled_order(n, order_seed)
            .into_iter()
            .map(|i| File::new(format!("f{i}.src")))
            .collect();

        let active = Arc::new(AtomicUsize::new(0));
        let peak_active = Arc::new(AtomicUsize::new(0));
        let backend = Arc::new(DagBackend {
            nodes,
            active: Arc::clone(&active),
            peak_active: Arc::clone(&peak_active),
        });

        let options = CompileOptions::new()
            .with_cap(cap)
            .with_long_compilation_threshold(Duration::from_secs(60));

        let result = run(files, None, backend, &options);
        let modules = result.expect("an acyclic batch with every dependency present must succeed");

        prop_assert_eq!(modules.len(), n);
        let unique: HashSet<&str> = modules.iter().map(Symbol::as_str).collect();
        prop_assert_eq!(unique.len(), n);

        prop_assert!(
            peak_active.load(Ordering::SeqCst) <= cap,
            "observed {} actively running workers against a cap of {cap}",
            peak_active.load(Ordering::SeqCst),
        );
        prop_assert_eq!(active.load(Ordering::SeqCst), 0);
    }
}
