use super::*;

#[test]
fn module_definition_satisfies_both_wait_kinds() {
    assert!(WaitKind::Module.satisfied_by(DefinitionKind::Module));
    assert!(WaitKind::Struct.satisfied_by(DefinitionKind::Module));
}

#[test]
fn struct_definition_only_satisfies_struct_wait() {
    assert!(WaitKind::Struct.satisfied_by(DefinitionKind::Struct));
    assert!(!WaitKind::Module.satisfied_by(DefinitionKind::Struct));
}

#[test]
fn symbols_compare_by_name() {
    let a = Symbol::new("Foo");
    let b: Symbol = "Foo".into();
    let c: Symbol = "Bar".into();
    assert_eq!(a, b);
    assert_ne!(a, c);
}
