//! Interpreter behavior against hand-assembled units.
//!
//! These units reference the capture console class directly, so no rewrite
//! pass is involved; the driver-level suites cover the redirected path.

use classbox_classfile::{ACC_STATIC, ClassBuilder, CodeBuf, opcode};
use classbox_foundation::ErrorKind;
use classbox_vm::{CONSOLE_CLASS, ConsoleSink, Interpreter};

fn run(bytes: &[u8]) -> (Result<(), classbox_foundation::Error>, String) {
    let sink = ConsoleSink::new();
    let mut interp = Interpreter::new(sink.handle());
    let class = interp.load(bytes).unwrap();
    let result = interp.run_main(&class);
    (result, sink.drain_to_string())
}

#[test]
fn fibonacci_via_static_recursion() {
    // static int fib(int n) { return n <= 1 ? n : fib(n-1) + fib(n-2); }
    let mut b = ClassBuilder::new("Fib");
    let out = b.pool().fieldref(CONSOLE_CLASS, "out", "Ljava/io/PrintStream;");
    let println = b.pool().methodref("java/io/PrintStream", "println", "(I)V");
    let fib = b.pool().methodref("Fib", "fib", "(I)I");

    let mut body = CodeBuf::new(4, 1);
    body.op(opcode::ILOAD_0);
    body.op(opcode::ICONST_1);
    let recurse = body.branch(opcode::IF_ICMPGT);
    body.op(opcode::ILOAD_0);
    body.op(opcode::IRETURN);
    body.patch_branch(recurse);
    body.op(opcode::ILOAD_0);
    body.op(opcode::ICONST_1);
    body.op(opcode::ISUB);
    body.op_index(opcode::INVOKESTATIC, fib);
    body.op(opcode::ILOAD_0);
    body.op(opcode::ICONST_2);
    body.op(opcode::ISUB);
    body.op_index(opcode::INVOKESTATIC, fib);
    body.op(opcode::IADD);
    body.op(opcode::IRETURN);
    b.add_method("fib", "(I)I", ACC_STATIC, body);

    let mut main = CodeBuf::new(2, 1);
    main.op_index(opcode::GETSTATIC, out);
    main.op_u8(opcode::BIPUSH, 10);
    main.op_index(opcode::INVOKESTATIC, fib);
    main.op_index(opcode::INVOKEVIRTUAL, println);
    main.op(opcode::RETURN);
    b.main_method(main);

    let (result, output) = run(&b.emit());
    result.unwrap();
    assert_eq!(output, "55\n");
}

#[test]
fn output_order_is_preserved_across_calls() {
    // Helper prints "inner"; main prints around the call.
    let mut b = ClassBuilder::new("Order");
    let out = b.pool().fieldref(CONSOLE_CLASS, "out", "Ljava/io/PrintStream;");
    let println = b.pool().methodref(
        "java/io/PrintStream",
        "println",
        "(Ljava/lang/String;)V",
    );
    let helper = b.pool().methodref("Order", "helper", "()V");
    let first = b.pool().string("first");
    let inner = b.pool().string("inner");
    let last = b.pool().string("last");

    let mut helper_code = CodeBuf::new(2, 0);
    helper_code.op_index(opcode::GETSTATIC, out);
    helper_code.ldc(inner);
    helper_code.op_index(opcode::INVOKEVIRTUAL, println);
    helper_code.op(opcode::RETURN);
    b.add_method("helper", "()V", ACC_STATIC, helper_code);

    let mut main = CodeBuf::new(2, 1);
    main.op_index(opcode::GETSTATIC, out);
    main.ldc(first);
    main.op_index(opcode::INVOKEVIRTUAL, println);
    main.op_index(opcode::INVOKESTATIC, helper);
    main.op_index(opcode::GETSTATIC, out);
    main.ldc(last);
    main.op_index(opcode::INVOKEVIRTUAL, println);
    main.op(opcode::RETURN);
    b.main_method(main);

    let (result, output) = run(&b.emit());
    result.unwrap();
    assert_eq!(output, "first\ninner\nlast\n");
}

#[test]
fn clinit_output_is_captured_too() {
    let mut b = ClassBuilder::new("Eager");
    let out = b.pool().fieldref(CONSOLE_CLASS, "out", "Ljava/io/PrintStream;");
    let println = b.pool().methodref(
        "java/io/PrintStream",
        "println",
        "(Ljava/lang/String;)V",
    );
    let setup = b.pool().string("setting up");
    let ready = b.pool().string("ready");

    let mut clinit = CodeBuf::new(2, 0);
    clinit.op_index(opcode::GETSTATIC, out);
    clinit.ldc(setup);
    clinit.op_index(opcode::INVOKEVIRTUAL, println);
    clinit.op(opcode::RETURN);
    b.clinit(clinit);

    let mut main = CodeBuf::new(2, 1);
    main.op_index(opcode::GETSTATIC, out);
    main.ldc(ready);
    main.op_index(opcode::INVOKEVIRTUAL, println);
    main.op(opcode::RETURN);
    b.main_method(main);

    let (result, output) = run(&b.emit());
    result.unwrap();
    assert_eq!(output, "setting up\nready\n");
}

#[test]
fn deep_recursion_is_contained() {
    let mut b = ClassBuilder::new("Bottomless");
    let spin = b.pool().methodref("Bottomless", "spin", "()V");
    let mut body = CodeBuf::new(1, 0);
    body.op_index(opcode::INVOKESTATIC, spin);
    body.op(opcode::RETURN);
    b.add_method("spin", "()V", ACC_STATIC, body);
    let mut main = CodeBuf::new(1, 1);
    main.op_index(opcode::INVOKESTATIC, spin);
    main.op(opcode::RETURN);
    b.main_method(main);

    let (result, output) = run(&b.emit());
    let err = result.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Invocation { .. }));
    assert!(output.contains("java.lang.StackOverflowError"));
    // The trace names the recursive frame, not just main.
    assert!(output.contains("Bottomless.spin"));
}

#[test]
fn instruction_budget_stops_infinite_loops() {
    let mut b = ClassBuilder::new("Forever");
    let mut code = CodeBuf::new(1, 1);
    let top = code.pc();
    code.op(opcode::NOP);
    code.branch_to(opcode::GOTO, top);
    b.main_method(code);

    let sink = ConsoleSink::new();
    let mut interp = Interpreter::new(sink.handle());
    interp.set_instruction_budget(Some(1_000));
    let class = interp.load(&b.emit()).unwrap();
    let err = interp.run_main(&class).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::LimitExceeded(_)));
}
