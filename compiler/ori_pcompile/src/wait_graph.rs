//! The wait-graph: suspended workers, what they wait on, and what (if
//! anything) they are themselves in the middle of defining.
//!
//! Both lookups — by [`WorkerId`] and by the symbol being waited on — are
//! hot, so two indices are maintained over the same entries. Every
//! mutating operation keeps them strictly in sync.

use crossbeam_channel::Sender;
use rustc_hash::FxHashMap;

use crate::protocol::WaitReply;
use crate::symbol::{DefinitionKind, Symbol, WaitKind};
use crate::worker::WorkerId;

/// One suspended worker.
pub struct WaitEntry {
    pub id: WorkerId,
    pub reply: Sender<WaitReply>,
    pub kind: WaitKind,
    pub waiting_on: Symbol,
    pub defining: Option<Symbol>,
}

#[derive(Default)]
pub struct WaitGraph {
    by_id: FxHashMap<WorkerId, WaitEntry>,
    by_symbol: FxHashMap<Symbol, Vec<WorkerId>>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn entry(&self, id: WorkerId) -> Option<&WaitEntry> {
        self.by_id.get(&id)
    }

    /// Remove and return every suspended entry.
    pub fn drain(&mut self) -> Vec<WaitEntry> {
        self.by_symbol.clear();
        self.by_id.drain().map(|(_, entry)| entry).collect()
    }

    /// Insert a new wait entry. Panics if `entry.id` already has one — a
    /// worker can only be suspended on one symbol at a time, and the
    /// coordinator must never call `suspend` twice for the same worker
    /// without an intervening `remove`.
    pub fn suspend(&mut self, entry: WaitEntry) {
        let id = entry.id;
        self.by_symbol.entry(entry.waiting_on.clone()).or_default().push(id);
        let previous = self.by_id.insert(id, entry);
        assert!(
            previous.is_none(),
            "worker {id:?} suspended twice without an intervening release"
        );
    }

    /// Pop every entry waiting on `symbol` whose `kind` is satisfied by a
    /// definition of `definition_kind`.
    pub fn release_matching(
        &mut self,
        symbol: &Symbol,
        definition_kind: DefinitionKind,
    ) -> Vec<WaitEntry> {
        let Some(ids) = self.by_symbol.remove(symbol) else {
            return Vec::new();
        };

        let mut released = Vec::new();
        let mut kept = Vec::new();
        for id in ids {
            let satisfied = self
                .by_id
                .get(&id)
                .is_some_and(|e| e.kind.satisfied_by(definition_kind));
            if satisfied {
                if let Some(entry) = self.by_id.remove(&id) {
                    released.push(entry);
                }
            } else {
                kept.push(id);
            }
        }
        if !kept.is_empty() {
            self.by_symbol.insert(symbol.clone(), kept);
        }
        released
    }

    /// Drop any entry for `id`. Idempotent.
    pub fn remove(&mut self, id: WorkerId) -> Option<WaitEntry> {
        let entry = self.by_id.remove(&id)?;
        if let Some(ids) = self.by_symbol.get_mut(&entry.waiting_on) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                self.by_symbol.remove(&entry.waiting_on);
            }
        }
        Some(entry)
    }

    /// Entries whose `waiting_on` symbol is not the `defining` symbol of
    /// any other entry currently in the graph — safe to release with
    /// `not_found`.
    pub fn no_definer_entries(&self) -> Vec<WorkerId> {
        let defined: rustc_hash::FxHashSet<&Symbol> = self
            .by_id
            .values()
            .filter_map(|e| e.defining.as_ref())
            .collect();

        self.by_id
            .values()
            .filter(|e| !defined.contains(&e.waiting_on))
            .map(|e| e.id)
            .collect()
    }

    /// True iff the graph is non-empty and every waiting worker is
    /// blocked on a symbol some other waiting worker is defining.
    pub fn is_cyclic_closed(&self) -> bool {
        !self.is_empty() && self.no_definer_entries().is_empty()
    }
}

#[cfg(test)]
mod tests;
