//! Hot-reload isolation: colliding names, fresh static state.

use classbox_classfile::{ClassBuilder, CodeBuf, opcode};
use classbox_runtime::Executor;

/// A `Demo` class printing `text`.
fn demo_printing(text: &str) -> Vec<u8> {
    let mut b = ClassBuilder::new("Demo");
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let constant = b.pool().string(text);
    let println = b
        .pool()
        .methodref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let mut code = CodeBuf::new(2, 1);
    code.op_index(opcode::GETSTATIC, out);
    code.ldc(constant);
    code.op_index(opcode::INVOKEVIRTUAL, println);
    code.op(opcode::RETURN);
    b.main_method(code);
    b.emit()
}

/// A `Counter` class whose initializer seeds a static, and whose main
/// increments and prints it. Prints `2` on a fresh context; would print a
/// higher number if static state leaked between executions.
fn counter_class() -> Vec<u8> {
    let mut b = ClassBuilder::new("Counter");
    b.add_static_field("count", "I");
    let count = b.pool().fieldref("Counter", "count", "I");
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let println = b.pool().methodref("java/io/PrintStream", "println", "(I)V");

    let mut clinit = CodeBuf::new(1, 0);
    clinit.op(opcode::ICONST_1);
    clinit.op_index(opcode::PUTSTATIC, count);
    clinit.op(opcode::RETURN);
    b.clinit(clinit);

    let mut main = CodeBuf::new(2, 1);
    main.op_index(opcode::GETSTATIC, count);
    main.op(opcode::ICONST_1);
    main.op(opcode::IADD);
    main.op_index(opcode::PUTSTATIC, count);
    main.op_index(opcode::GETSTATIC, out);
    main.op_index(opcode::GETSTATIC, count);
    main.op_index(opcode::INVOKEVIRTUAL, println);
    main.op(opcode::RETURN);
    b.main_method(main);
    b.emit()
}

#[test]
fn resubmitted_name_runs_the_new_body() {
    let executor = Executor::new();
    assert_eq!(executor.execute(&demo_printing("version one")).unwrap(), "version one\n");
    assert_eq!(executor.execute(&demo_printing("version two")).unwrap(), "version two\n");
    // And the old body again, proving nothing is sticky in either direction.
    assert_eq!(executor.execute(&demo_printing("version one")).unwrap(), "version one\n");
}

#[test]
fn static_state_resets_between_executions() {
    let executor = Executor::new();
    let bytes = counter_class();
    for _ in 0..3 {
        assert_eq!(executor.execute(&bytes).unwrap(), "2\n");
    }
}

#[test]
fn distinct_executors_are_equally_isolated() {
    let bytes = counter_class();
    assert_eq!(Executor::new().execute(&bytes).unwrap(), "2\n");
    assert_eq!(Executor::new().execute(&bytes).unwrap(), "2\n");
}
