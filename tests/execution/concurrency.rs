//! Concurrent executions must never interleave or cross-contaminate output.

use std::sync::Arc;
use std::thread;

use classbox_classfile::{ClassBuilder, CodeBuf, opcode};
use classbox_runtime::Executor;

fn unit_printing_lines(class_name: &str, token: &str, lines: i8) -> Vec<u8> {
    let mut b = ClassBuilder::new(class_name);
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let constant = b.pool().string(token);
    let println = b
        .pool()
        .methodref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let mut code = CodeBuf::new(2, 2);
    code.op_u8(opcode::BIPUSH, lines as u8);
    code.op(opcode::ISTORE_1);
    let top = code.pc();
    code.op(opcode::ILOAD_1);
    let done = code.branch(opcode::IFLE);
    code.op_index(opcode::GETSTATIC, out);
    code.ldc(constant);
    code.op_index(opcode::INVOKEVIRTUAL, println);
    code.iinc(1, -1);
    code.branch_to(opcode::GOTO, top);
    code.patch_branch(done);
    code.op(opcode::RETURN);
    b.main_method(code);
    b.emit()
}

#[test]
fn parallel_executions_keep_their_output_apart() {
    let executor = Arc::new(Executor::new());
    let lines = 50i8;

    let handles: Vec<_> = ["alpha", "bravo", "charlie", "delta"]
        .into_iter()
        .map(|token| {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                let bytes = unit_printing_lines("Worker", token, lines);
                let output = executor.execute(&bytes).unwrap();
                (token, output)
            })
        })
        .collect();

    for handle in handles {
        let (token, output) = handle.join().unwrap();
        let expected = format!("{token}\n").repeat(lines as usize);
        assert_eq!(output, expected, "contaminated output for {token}");
    }
}

#[test]
fn repeated_parallel_rounds_stay_clean() {
    let executor = Arc::new(Executor::new());
    for round in 0..10 {
        let a = {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                executor
                    .execute(&unit_printing_lines("Demo", &format!("a{round}"), 5))
                    .unwrap()
            })
        };
        let b = {
            let executor = Arc::clone(&executor);
            thread::spawn(move || {
                executor
                    .execute(&unit_printing_lines("Demo", &format!("b{round}"), 5))
                    .unwrap()
            })
        };
        let out_a = a.join().unwrap();
        let out_b = b.join().unwrap();
        assert_eq!(out_a, format!("a{round}\n").repeat(5));
        assert_eq!(out_b, format!("b{round}\n").repeat(5));
    }
}
