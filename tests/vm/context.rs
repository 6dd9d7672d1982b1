//! Isolation-context behavior.

use classbox_classfile::{ClassBuilder, ClassFile, CodeBuf, opcode};
use classbox_foundation::ErrorKind;
use classbox_vm::{ConsoleSink, ExecutionContext, Interpreter, LoadedClass, Value};

fn class_named(name: &str) -> Vec<u8> {
    let mut b = ClassBuilder::new(name);
    let mut code = CodeBuf::new(1, 1);
    code.op(opcode::RETURN);
    b.main_method(code);
    b.emit()
}

fn loaded(name: &str) -> LoadedClass {
    LoadedClass::from_class_file(ClassFile::parse(&class_named(name)).unwrap()).unwrap()
}

#[test]
fn colliding_names_in_one_context_are_rejected() {
    let mut ctx = ExecutionContext::new();
    ctx.define(loaded("Demo")).unwrap();
    let err = ctx.define(loaded("Demo")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Load { .. }));
}

#[test]
fn colliding_names_across_contexts_are_fine() {
    let mut first = ExecutionContext::new();
    let mut second = ExecutionContext::new();
    first.define(loaded("Demo")).unwrap();
    second.define(loaded("Demo")).unwrap();
    assert_eq!(first.class_count(), 1);
    assert_eq!(second.class_count(), 1);
}

#[test]
fn static_state_never_crosses_contexts() {
    let mut first = ExecutionContext::new();
    let mut second = ExecutionContext::new();
    first.define(loaded("Demo")).unwrap();
    second.define(loaded("Demo")).unwrap();
    first.set_static("Demo", "count", Value::Int(99));
    assert!(second.get_static("Demo", "count").is_none());
}

#[test]
fn fresh_interpreters_have_fresh_contexts() {
    let bytes = class_named("Demo");
    let sink_a = ConsoleSink::new();
    let sink_b = ConsoleSink::new();
    let mut a = Interpreter::new(sink_a.handle());
    let mut b = Interpreter::new(sink_b.handle());
    a.load(&bytes).unwrap();
    // The same declared name loads cleanly into an unrelated interpreter.
    b.load(&bytes).unwrap();
    assert_eq!(a.context().class_count(), 1);
    assert_eq!(b.context().class_count(), 1);
}

#[test]
fn discarding_contexts_never_fails() {
    for _ in 0..100 {
        let mut ctx = ExecutionContext::new();
        ctx.define(loaded("Demo")).unwrap();
        ctx.set_static("Demo", "x", Value::Int(1));
        drop(ctx);
    }
}
