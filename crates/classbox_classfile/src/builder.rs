//! Programmatic class-file assembly.
//!
//! The builder exists so tests and benchmarks can synthesize small, valid
//! class files without a Java toolchain: a constant-pool builder with entry
//! deduplication, a bytecode buffer with branch patching, and a class
//! emitter that serializes the standard container layout.

#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use crate::classfile::{ACC_PUBLIC, ACC_STATIC, ACC_SUPER, ExceptionHandler};
use crate::mutf8;
use crate::opcode;
use crate::pool::TAG_UTF8;
use crate::writer::ByteWriter;
use crate::MAGIC;

const TAG_INTEGER: u8 = 3;
const TAG_LONG: u8 = 5;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_NAME_AND_TYPE: u8 = 12;

/// A constant-pool entry under construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Item {
    Utf8(String),
    Integer(i32),
    Long(i64),
    Class(u16),
    Str(u16),
    NameAndType(u16, u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
}

/// Constant-pool builder with entry deduplication.
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    /// Slot 0 is unused; `Long` entries own a trailing `None` shadow slot.
    slots: Vec<Option<Item>>,
    dedup: HashMap<Item, u16>,
}

impl PoolBuilder {
    fn new() -> Self {
        Self {
            slots: vec![None],
            dedup: HashMap::new(),
        }
    }

    fn add(&mut self, item: Item) -> u16 {
        if let Some(&index) = self.dedup.get(&item) {
            return index;
        }
        let index = self.slots.len() as u16;
        let wide = matches!(item, Item::Long(_));
        self.dedup.insert(item.clone(), index);
        self.slots.push(Some(item));
        if wide {
            self.slots.push(None);
        }
        index
    }

    /// Interns a `Utf8` entry.
    pub fn utf8(&mut self, text: &str) -> u16 {
        self.add(Item::Utf8(text.to_string()))
    }

    /// Interns an `Integer` entry.
    pub fn integer(&mut self, v: i32) -> u16 {
        self.add(Item::Integer(v))
    }

    /// Interns a `Long` entry (occupies two slots).
    pub fn long(&mut self, v: i64) -> u16 {
        self.add(Item::Long(v))
    }

    /// Interns a `Class` entry for an internal name.
    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.add(Item::Class(name_index))
    }

    /// Interns a `String` literal entry.
    pub fn string(&mut self, text: &str) -> u16 {
        let content = self.utf8(text);
        self.add(Item::Str(content))
    }

    /// Interns a `NameAndType` entry.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.add(Item::NameAndType(name_index, descriptor_index))
    }

    /// Interns a `Fieldref` entry.
    pub fn fieldref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.add(Item::Fieldref(class_index, nat))
    }

    /// Interns a `Methodref` entry.
    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        self.add(Item::Methodref(class_index, nat))
    }

    /// Declared pool count (slots, including the unused slot 0).
    #[must_use]
    pub fn count(&self) -> u16 {
        self.slots.len() as u16
    }

    fn emit(&self, w: &mut ByteWriter) {
        w.u16(self.count());
        for slot in &self.slots[1..] {
            let Some(item) = slot else { continue };
            match item {
                Item::Utf8(text) => {
                    let encoded = mutf8::encode(text);
                    w.u8(TAG_UTF8);
                    w.u16(encoded.len() as u16);
                    w.bytes(&encoded);
                }
                Item::Integer(v) => {
                    w.u8(TAG_INTEGER);
                    w.u32(*v as u32);
                }
                Item::Long(v) => {
                    w.u8(TAG_LONG);
                    w.u64(*v as u64);
                }
                Item::Class(name) => {
                    w.u8(TAG_CLASS);
                    w.u16(*name);
                }
                Item::Str(content) => {
                    w.u8(TAG_STRING);
                    w.u16(*content);
                }
                Item::NameAndType(name, descriptor) => {
                    w.u8(TAG_NAME_AND_TYPE);
                    w.u16(*name);
                    w.u16(*descriptor);
                }
                Item::Fieldref(class, nat) => {
                    w.u8(TAG_FIELDREF);
                    w.u16(*class);
                    w.u16(*nat);
                }
                Item::Methodref(class, nat) => {
                    w.u8(TAG_METHODREF);
                    w.u16(*class);
                    w.u16(*nat);
                }
            }
        }
    }
}

/// Bytecode buffer for one method body.
#[derive(Clone, Debug)]
pub struct CodeBuf {
    bytes: Vec<u8>,
    max_stack: u16,
    max_locals: u16,
    handlers: Vec<ExceptionHandler>,
}

impl CodeBuf {
    /// Creates a buffer with the given operand-stack and local-slot limits.
    #[must_use]
    pub fn new(max_stack: u16, max_locals: u16) -> Self {
        Self {
            bytes: Vec::new(),
            max_stack,
            max_locals,
            handlers: Vec::new(),
        }
    }

    /// Current program counter (offset of the next instruction).
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.bytes.len() as u16
    }

    /// Emits a bare instruction.
    pub fn op(&mut self, op: u8) {
        self.bytes.push(op);
    }

    /// Emits an instruction with a one-byte operand (`bipush`, `ldc`, ...).
    pub fn op_u8(&mut self, op: u8, operand: u8) {
        self.bytes.push(op);
        self.bytes.push(operand);
    }

    /// Emits an instruction with a two-byte operand (`getstatic`,
    /// `invokevirtual`, `sipush`, ...).
    pub fn op_index(&mut self, op: u8, operand: u16) {
        self.bytes.push(op);
        self.bytes.extend_from_slice(&operand.to_be_bytes());
    }

    /// Emits `ldc` or `ldc_w` depending on the index width.
    pub fn ldc(&mut self, index: u16) {
        if let Ok(narrow) = u8::try_from(index) {
            self.op_u8(opcode::LDC, narrow);
        } else {
            self.op_index(opcode::LDC_W, index);
        }
    }

    /// Emits `iinc slot, delta`.
    pub fn iinc(&mut self, slot: u8, delta: i8) {
        self.bytes.push(opcode::IINC);
        self.bytes.push(slot);
        self.bytes.push(delta as u8);
    }

    /// Emits a forward branch with a placeholder offset.
    ///
    /// Returns the branch site to pass to [`CodeBuf::patch_branch`].
    pub fn branch(&mut self, op: u8) -> usize {
        let site = self.bytes.len();
        self.bytes.push(op);
        self.bytes.extend_from_slice(&[0, 0]);
        site
    }

    /// Resolves a forward branch to jump to the current pc.
    ///
    /// # Panics
    /// Panics if the offset does not fit in `i16`.
    pub fn patch_branch(&mut self, site: usize) {
        let offset = i16::try_from(self.bytes.len() as i64 - site as i64)
            .expect("branch offset out of range");
        self.bytes[site + 1..site + 3].copy_from_slice(&offset.to_be_bytes());
    }

    /// Emits a backward branch targeting an already-emitted pc.
    ///
    /// # Panics
    /// Panics if the offset does not fit in `i16`.
    pub fn branch_to(&mut self, op: u8, target_pc: u16) {
        let offset = i16::try_from(i64::from(target_pc) - self.bytes.len() as i64)
            .expect("branch offset out of range");
        self.bytes.push(op);
        self.bytes.extend_from_slice(&offset.to_be_bytes());
    }

    /// Registers an exception handler over `[start_pc, end_pc)`.
    pub fn handler(&mut self, start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) {
        self.handlers.push(ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }
}

struct BuiltMethod {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    code: Option<CodeBuf>,
}

struct BuiltField {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
}

/// Assembles one class file.
pub struct ClassBuilder {
    pool: PoolBuilder,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    fields: Vec<BuiltField>,
    methods: Vec<BuiltMethod>,
    code_attribute_name: Option<u16>,
}

impl ClassBuilder {
    /// Starts a public class with the given internal name, extending
    /// `java/lang/Object`.
    #[must_use]
    pub fn new(class_name: &str) -> Self {
        let mut pool = PoolBuilder::new();
        let this_class = pool.class(class_name);
        let super_class = pool.class("java/lang/Object");
        Self {
            pool,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_class,
            super_class,
            fields: Vec::new(),
            methods: Vec::new(),
            code_attribute_name: None,
        }
    }

    /// Direct access to the constant pool, for interning operands.
    pub fn pool(&mut self) -> &mut PoolBuilder {
        &mut self.pool
    }

    /// Replaces the super class.
    pub fn super_class(&mut self, name: &str) {
        self.super_class = self.pool.class(name);
    }

    /// Declares a field with explicit access flags.
    pub fn add_field(&mut self, name: &str, descriptor: &str, access_flags: u16) {
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        self.fields.push(BuiltField {
            access_flags,
            name_index,
            descriptor_index,
        });
    }

    /// Declares a `static` field.
    pub fn add_static_field(&mut self, name: &str, descriptor: &str) {
        self.add_field(name, descriptor, ACC_STATIC);
    }

    /// Declares a method with a body.
    pub fn add_method(&mut self, name: &str, descriptor: &str, access_flags: u16, code: CodeBuf) {
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        if self.code_attribute_name.is_none() {
            self.code_attribute_name = Some(self.pool.utf8("Code"));
        }
        self.methods.push(BuiltMethod {
            access_flags,
            name_index,
            descriptor_index,
            code: Some(code),
        });
    }

    /// Declares a bodiless method (used to synthesize invalid entry points).
    pub fn add_bodiless_method(&mut self, name: &str, descriptor: &str, access_flags: u16) {
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        self.methods.push(BuiltMethod {
            access_flags,
            name_index,
            descriptor_index,
            code: None,
        });
    }

    /// Declares the conventional entry point: `public static main` taking a
    /// string array.
    pub fn main_method(&mut self, code: CodeBuf) {
        self.add_method(
            "main",
            "([Ljava/lang/String;)V",
            ACC_PUBLIC | ACC_STATIC,
            code,
        );
    }

    /// Declares the static initializer.
    pub fn clinit(&mut self, code: CodeBuf) {
        self.add_method("<clinit>", "()V", ACC_STATIC, code);
    }

    /// Serializes the class file.
    #[must_use]
    pub fn emit(self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.u32(MAGIC);
        w.u16(0); // minor_version
        w.u16(52); // major_version: the 8th format revision
        self.pool.emit(&mut w);
        w.u16(self.access_flags);
        w.u16(self.this_class);
        w.u16(self.super_class);
        w.u16(0); // interfaces

        w.u16(self.fields.len() as u16);
        for field in &self.fields {
            w.u16(field.access_flags);
            w.u16(field.name_index);
            w.u16(field.descriptor_index);
            w.u16(0); // attributes
        }

        w.u16(self.methods.len() as u16);
        for method in &self.methods {
            w.u16(method.access_flags);
            w.u16(method.name_index);
            w.u16(method.descriptor_index);
            match &method.code {
                None => w.u16(0),
                Some(code) => {
                    w.u16(1);
                    w.u16(self.code_attribute_name.expect("Code name interned"));
                    let length = 2 + 2 + 4 + code.bytes.len() + 2 + 8 * code.handlers.len() + 2;
                    w.u32(length as u32);
                    w.u16(code.max_stack);
                    w.u16(code.max_locals);
                    w.u32(code.bytes.len() as u32);
                    w.bytes(&code.bytes);
                    w.u16(code.handlers.len() as u16);
                    for handler in &code.handlers {
                        w.u16(handler.start_pc);
                        w.u16(handler.end_pc);
                        w.u16(handler.handler_pc);
                        w.u16(handler.catch_type);
                    }
                    w.u16(0); // nested attributes
                }
            }
        }

        w.u16(0); // class attributes
        w.into_bytes()
    }
}
