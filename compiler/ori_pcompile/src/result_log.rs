//! Append-only log of symbols defined over the course of a batch.

use rustc_hash::FxHashSet;

use crate::symbol::{DefinitionKind, Symbol};

/// One completed definition, tagged with its strength.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct LogEntry {
    pub kind: DefinitionKind,
    pub symbol: Symbol,
}

/// Append-only, order-preserving log of `{kind, symbol}` entries.
///
/// Entries are unique by `{kind, symbol}`; emission order is the order of
/// coordinator events, which is what callers rely on when projecting the
/// final module list.
#[derive(Default)]
pub struct ResultLog {
    entries: Vec<LogEntry>,
    seen: FxHashSet<(DefinitionKind, Symbol)>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns `false` (and does nothing) if this exact
    /// `{kind, symbol}` pair was already logged.
    pub fn append(&mut self, kind: DefinitionKind, symbol: Symbol) -> bool {
        if !self.seen.insert((kind, symbol.clone())) {
            return false;
        }
        self.entries.push(LogEntry { kind, symbol });
        true
    }

    /// Whether the log already contains an entry satisfying a wait of
    /// `wait_kind` on `symbol`.
    pub fn satisfies(&self, wait_kind: crate::symbol::WaitKind, symbol: &Symbol) -> bool {
        self.entries
            .iter()
            .any(|e| &e.symbol == symbol && wait_kind.satisfied_by(e.kind))
    }

    /// The final projection: modules only, in log order.
    pub fn modules_in_order(&self) -> Vec<Symbol> {
        self.entries
            .iter()
            .filter(|e| e.kind == DefinitionKind::Module)
            .map(|e| e.symbol.clone())
            .collect()
    }
}
