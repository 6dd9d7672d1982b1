//! Container and constant-pool parsing tests.

use classbox_classfile::{ClassBuilder, ClassFile, CodeBuf, opcode};

fn subject() -> Vec<u8> {
    let mut b = ClassBuilder::new("it/Subject");
    let out = b
        .pool()
        .fieldref("java/lang/System", "out", "Ljava/io/PrintStream;");
    let text = b.pool().string("héllo → 世界");
    let println = b
        .pool()
        .methodref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    b.pool().integer(-42);
    b.pool().long(1 << 40);
    let mut code = CodeBuf::new(2, 1);
    code.op_index(opcode::GETSTATIC, out);
    code.ldc(text);
    code.op_index(opcode::INVOKEVIRTUAL, println);
    code.op(opcode::RETURN);
    b.main_method(code);
    b.emit()
}

#[test]
fn parses_every_section() {
    let cf = ClassFile::parse(&subject()).unwrap();
    assert_eq!(cf.this_class_name().unwrap(), "it/Subject");
    assert_eq!(cf.super_class_name().unwrap(), Some("java/lang/Object"));
    assert!(cf.fields.is_empty());
    assert_eq!(cf.methods.len(), 1);
    assert!(cf.attributes.is_empty());
}

#[test]
fn non_ascii_text_survives_the_pool() {
    let cf = ClassFile::parse(&subject()).unwrap();
    assert_eq!(cf.pool.count_utf8("héllo → 世界"), 1);
}

#[test]
fn member_references_resolve() {
    let cf = ClassFile::parse(&subject()).unwrap();
    let mut found_out = false;
    let mut found_println = false;
    for index in 1..cf.pool.count() {
        if let Ok((class, name, descriptor)) = cf.pool.member_ref(index) {
            found_out |= class == "java/lang/System"
                && name == "out"
                && descriptor == "Ljava/io/PrintStream;";
            found_println |= class == "java/io/PrintStream" && name == "println";
        }
    }
    assert!(found_out);
    assert!(found_println);
}

#[test]
fn truncation_anywhere_is_malformed_not_a_panic() {
    let bytes = subject();
    for cut in 0..bytes.len() {
        assert!(ClassFile::parse(&bytes[..cut]).is_err(), "cut at {cut}");
    }
}

#[test]
fn bad_magic_is_rejected_up_front() {
    let mut bytes = subject();
    bytes[3] = 0xBF;
    let err = ClassFile::parse(&bytes).unwrap_err();
    assert!(format!("{err}").contains("bad magic"));
}
