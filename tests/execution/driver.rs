//! End-to-end driver behavior: rewrite, load, invoke, capture.

use classbox_classfile::{ACC_PUBLIC, ACC_STATIC, ClassBuilder, CodeBuf, opcode};
use classbox_foundation::ErrorKind;
use classbox_runtime::Executor;

/// A unit written against `java/lang/System`, printing `text`.
fn hello_class(text: &str) -> Vec<u8> {
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

#[test]
fn hello_world_returns_exactly_the_printed_line() {
    let output = Executor::new().execute(&hello_class("Hello, World!")).unwrap();
    assert_eq!(output, "Hello, World!\n");
}

#[test]
fn unit_without_console_calls_returns_empty_string() {
    let mut b = ClassBuilder::new("Quiet");
    let mut code = CodeBuf::new(1, 1);
    code.op(opcode::RETURN);
    b.main_method(code);
    let output = Executor::new().execute(&b.emit()).unwrap();
    assert_eq!(output, "");
}

#[test]
fn zero_occurrence_container_still_executes() {
    // The unit never names java/lang/System at all; the rewrite is a no-op
    // and execution proceeds.
    let mut b = ClassBuilder::new("NoConsole");
    let mut code = CodeBuf::new(2, 2);
    code.op(opcode::ICONST_2);
    code.op(opcode::ICONST_3);
    code.op(opcode::IMUL);
    code.op(opcode::ISTORE_1);
    code.op(opcode::RETURN);
    b.main_method(code);
    let bytes = b.emit();

    let executor = Executor::new();
    assert_eq!(executor.patch(&bytes).unwrap().replaced, 0);
    assert_eq!(executor.execute(&bytes).unwrap(), "");
}

#[test]
fn throwing_unit_yields_diagnostic_and_typed_failure() {
    let mut b = ClassBuilder::new("Boom");
    let exception = b.pool().class("java/lang/IllegalStateException");
    let init = b.pool().methodref(
        "java/lang/IllegalStateException",
        "<init>",
        "(Ljava/lang/String;)V",
    );
    let message = b.pool().string("went sideways");
    let mut code = CodeBuf::new(3, 1);
    code.op_index(opcode::NEW, exception);
    code.op(opcode::DUP);
    code.ldc(message);
    code.op_index(opcode::INVOKESPECIAL, init);
    code.op(opcode::ATHROW);
    b.main_method(code);

    let err = Executor::new().execute(&b.emit()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Invocation { .. }));
    let diagnostic = err.captured_output().unwrap();
    assert!(!diagnostic.is_empty());
    assert!(diagnostic.contains("java.lang.IllegalStateException: went sideways"));
}

#[test]
fn partial_output_survives_a_late_failure() {
    let mut b = ClassBuilder::new("Partway");
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let text = b.pool().string("progress: 50%");
    let println = b
        .pool()
        .methodref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let mut code = CodeBuf::new(2, 1);
    code.op_index(opcode::GETSTATIC, out);
    code.ldc(text);
    code.op_index(opcode::INVOKEVIRTUAL, println);
    code.op(opcode::ICONST_1);
    code.op(opcode::ICONST_0);
    code.op(opcode::IDIV);
    code.op(opcode::POP);
    code.op(opcode::RETURN);
    b.main_method(code);

    let err = Executor::new().execute(&b.emit()).unwrap_err();
    let output = err.captured_output().unwrap();
    assert!(output.starts_with("progress: 50%\n"));
    assert!(output.contains("java.lang.ArithmeticException: / by zero"));
}

#[test]
fn entry_point_shapes_are_enforced() {
    let make = |build: &dyn Fn(&mut ClassBuilder)| {
        let mut b = ClassBuilder::new("Shape");
        build(&mut b);
        Executor::new().execute(&b.emit()).unwrap_err()
    };
    let returning = || {
        let mut code = CodeBuf::new(1, 1);
        code.op(opcode::RETURN);
        code
    };

    // No main at all.
    let err = make(&|b| b.add_method("start", "()V", ACC_PUBLIC | ACC_STATIC, returning()));
    assert!(matches!(err.kind, ErrorKind::EntryPoint { .. }));

    // Wrong signature.
    let err = make(&|b| b.add_method("main", "(I)V", ACC_PUBLIC | ACC_STATIC, returning()));
    assert!(format!("{err}").contains("wrong signature"));

    // Not static.
    let err = make(&|b| {
        b.add_method("main", "([Ljava/lang/String;)V", ACC_PUBLIC, returning());
    });
    assert!(format!("{err}").contains("not static"));

    // Not public.
    let err = make(&|b| {
        b.add_method("main", "([Ljava/lang/String;)V", ACC_STATIC, returning());
    });
    assert!(format!("{err}").contains("not public"));
}

#[test]
fn rewrite_failures_abort_before_any_output() {
    let err = Executor::new()
        .with_redirect("not an identifier", "classbox/Console")
        .execute(&hello_class("x"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Redirection { .. }));
    assert_eq!(err.captured_output(), None);
}

#[test]
fn patch_alone_never_executes() {
    // A unit that would throw on execution patches cleanly.
    let mut b = ClassBuilder::new("Latent");
    let exception = b.pool().class("java/lang/RuntimeException");
    let init = b
        .pool()
        .methodref("java/lang/RuntimeException", "<init>", "()V");
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let mut code = CodeBuf::new(2, 1);
    code.op_index(opcode::GETSTATIC, out);
    code.op(opcode::POP);
    code.op_index(opcode::NEW, exception);
    code.op(opcode::DUP);
    code.op_index(opcode::INVOKESPECIAL, init);
    code.op(opcode::ATHROW);
    b.main_method(code);

    let patched = Executor::new().patch(&b.emit()).unwrap();
    assert_eq!(patched.replaced, 1);
}
