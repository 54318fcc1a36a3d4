use super::*;
use crossbeam_channel::bounded;

fn entry(id: WorkerId, kind: WaitKind, waiting_on: &str, defining: Option<&str>) -> WaitEntry {
    let (tx, _rx) = bounded(1);
    WaitEntry {
        id,
        reply: tx,
        kind,
        waiting_on: waiting_on.into(),
        defining: defining.map(Symbol::from),
    }
}

#[test]
fn suspend_then_release_matching_module_satisfies_both_kinds() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    let b = WorkerId::next();
    graph.suspend(entry(a, WaitKind::Module, "X", None));
    graph.suspend(entry(b, WaitKind::Struct, "X", None));

    let released = graph.release_matching(&"X".into(), DefinitionKind::Module);
    let released_ids: Vec<_> = released.iter().map(|e| e.id).collect();
    assert_eq!(released_ids.len(), 2);
    assert!(released_ids.contains(&a));
    assert!(released_ids.contains(&b));
    assert!(graph.is_empty());
}

#[test]
fn struct_definition_only_releases_struct_waiters() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    let b = WorkerId::next();
    graph.suspend(entry(a, WaitKind::Module, "X", None));
    graph.suspend(entry(b, WaitKind::Struct, "X", None));

    let released = graph.release_matching(&"X".into(), DefinitionKind::Struct);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].id, b);
    assert!(graph.contains(a));
    assert!(!graph.contains(b));
}

#[test]
fn remove_is_idempotent() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    graph.suspend(entry(a, WaitKind::Module, "X", None));
    assert!(graph.remove(a).is_some());
    assert!(graph.remove(a).is_none());
    assert!(graph.is_empty());
}

#[test]
#[should_panic(expected = "suspended twice")]
fn suspend_twice_without_release_is_an_invariant_violation() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    graph.suspend(entry(a, WaitKind::Module, "X", None));
    graph.suspend(entry(a, WaitKind::Module, "Y", None));
}

#[test]
fn no_definer_entries_excludes_symbols_under_active_definition() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    let b = WorkerId::next();
    // a waits on Y, which b is defining — a is not safe to release.
    graph.suspend(entry(a, WaitKind::Module, "Y", Some("X")));
    graph.suspend(entry(b, WaitKind::Module, "X", Some("Y")));

    assert!(graph.no_definer_entries().is_empty());
    assert!(graph.is_cyclic_closed());
}

#[test]
fn no_definer_entries_includes_waits_on_undefined_symbols() {
    let mut graph = WaitGraph::new();
    let a = WorkerId::next();
    graph.suspend(entry(a, WaitKind::Module, "NeverDefined", Some("M")));

    let safe = graph.no_definer_entries();
    assert_eq!(safe, vec![a]);
    assert!(!graph.is_cyclic_closed());
}

#[test]
fn empty_graph_is_not_cyclic_closed() {
    let graph = WaitGraph::new();
    assert!(!graph.is_cyclic_closed());
}
