//! Constant-rewriter properties.

use classbox_classfile::{ClassBuilder, ClassFile, CodeBuf, opcode, rewrite_identifier};

const FROM: &str = "java/lang/System";
const TO: &str = "classbox/Console";

fn printing_class() -> Vec<u8> {
    let mut b = ClassBuilder::new("it/Printer");
    let out = b.pool().fieldref(FROM, "out", "Ljava/io/PrintStream;");
    let text = b.pool().string("token");
    let println = b
        .pool()
        .methodref("java/io/PrintStream", "println", "(Ljava/lang/String;)V");
    let mut code = CodeBuf::new(2, 1);
    code.op_index(opcode::GETSTATIC, out);
    code.ldc(text);
    code.op_index(opcode::INVOKEVIRTUAL, println);
    code.op(opcode::RETURN);
    b.main_method(code);
    b.emit()
}

#[test]
fn single_occurrence_swaps_completely() {
    let original = printing_class();
    let result = rewrite_identifier(&original, FROM, TO).unwrap();
    assert_eq!(result.replaced, 1);

    let cf = ClassFile::parse(&result.bytes).unwrap();
    assert_eq!(cf.pool.count_utf8(FROM), 0);
    assert_eq!(cf.pool.count_utf8(TO), 1);
}

#[test]
fn unrelated_content_is_untouched_modulo_offsets() {
    let original = printing_class();
    let result = rewrite_identifier(&original, FROM, "S").unwrap();

    let before = ClassFile::parse(&original).unwrap();
    let after = ClassFile::parse(&result.bytes).unwrap();

    // Every non-matching decoded entry survives with identical content.
    let mut before_texts: Vec<_> = before
        .pool
        .utf8_entries()
        .map(|(_, text, _)| text.to_string())
        .filter(|t| t != FROM)
        .collect();
    let mut after_texts: Vec<_> = after
        .pool
        .utf8_entries()
        .map(|(_, text, _)| text.to_string())
        .filter(|t| t != "S")
        .collect();
    before_texts.sort();
    after_texts.sort();
    assert_eq!(before_texts, after_texts);

    // The trailing region is byte-identical, merely shifted.
    let shift = original.len() - result.bytes.len();
    assert_eq!(shift, FROM.len() - 1);
    assert_eq!(
        &original[original.len() - 40..],
        &result.bytes[result.bytes.len() - 40..],
    );
}

#[test]
fn equal_length_mapping_inverts_exactly() {
    assert_eq!(FROM.len(), TO.len());
    let original = printing_class();
    let there = rewrite_identifier(&original, FROM, TO).unwrap();
    let back = rewrite_identifier(&there.bytes, TO, FROM).unwrap();
    assert_eq!(back.bytes, original);
}

#[test]
fn growth_and_shrink_both_stay_structurally_valid() {
    let original = printing_class();
    for replacement in ["S", "a/very/long/replacement/identifier/Console"] {
        let result = rewrite_identifier(&original, FROM, replacement).unwrap();
        let cf = ClassFile::parse(&result.bytes).unwrap();
        assert_eq!(cf.pool.count_utf8(replacement), 1, "for {replacement}");
        assert_eq!(cf.this_class_name().unwrap(), "it/Printer");
    }
}

#[test]
fn zero_matches_returns_byte_identical_container() {
    let original = printing_class();
    let result = rewrite_identifier(&original, "absent/Identifier", TO).unwrap();
    assert_eq!(result.replaced, 0);
    assert_eq!(result.bytes, original);
}

#[test]
fn prefix_and_substring_identifiers_are_not_matches() {
    let mut b = ClassBuilder::new("it/Substrings");
    b.pool().class("java/lang/SystemColor");
    b.pool().string("java/lang/Sys");
    b.pool().class(FROM);
    let mut code = CodeBuf::new(1, 1);
    code.op(opcode::RETURN);
    b.main_method(code);
    let original = b.emit();

    let result = rewrite_identifier(&original, FROM, TO).unwrap();
    assert_eq!(result.replaced, 1);
    let cf = ClassFile::parse(&result.bytes).unwrap();
    assert_eq!(cf.pool.count_utf8("java/lang/SystemColor"), 1);
    assert_eq!(cf.pool.count_utf8("java/lang/Sys"), 1);
    assert_eq!(cf.pool.count_utf8(FROM), 0);
}

#[test]
fn garbage_input_is_a_typed_failure() {
    assert!(rewrite_identifier(&[0xCA, 0xFE], FROM, TO).is_err());
    assert!(rewrite_identifier(b"", FROM, TO).is_err());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn identifier() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,8}(/[A-Za-z][A-Za-z0-9]{0,10}){0,3}".prop_map(|s| s)
    }

    proptest! {
        #[test]
        fn any_replacement_keeps_the_container_parseable(to in identifier()) {
            let original = printing_class();
            let result = rewrite_identifier(&original, FROM, &to).unwrap();
            let cf = ClassFile::parse(&result.bytes).unwrap();
            prop_assert_eq!(cf.pool.count_utf8(FROM), 0);
            prop_assert!(cf.pool.count_utf8(&to) >= 1);
        }

        #[test]
        fn rewriting_an_absent_identifier_is_the_identity(from in identifier()) {
            let original = printing_class();
            prop_assume!(ClassFile::parse(&original).unwrap().pool.count_utf8(&from) == 0);
            let result = rewrite_identifier(&original, &from, TO).unwrap();
            prop_assert_eq!(result.replaced, 0);
            prop_assert_eq!(result.bytes, original);
        }
    }
}
