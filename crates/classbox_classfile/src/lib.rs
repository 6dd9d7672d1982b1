//! Class-file parsing, constant-pool rewriting, and fixture assembly.
//!
//! This crate provides:
//! - [`ByteReader`] / [`ByteWriter`] - Bounds-checked big-endian cursors
//! - [`mutf8`] - Modified UTF-8 decoding and encoding
//! - [`ConstantPool`] / [`Constant`] - Typed constant-pool model with byte spans
//! - [`ClassFile`] - Full container parse (fields, methods, `Code`)
//! - [`rewrite`] - The constant rewriter (`rewrite_identifier`)
//! - [`ClassBuilder`] - Programmatic class-file assembly for tests and benches

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod builder;
mod classfile;
pub mod mutf8;
pub mod opcode;
mod pool;
mod reader;
mod rewrite;
mod writer;

pub use builder::{ClassBuilder, CodeBuf, PoolBuilder};
pub use classfile::{
    ACC_ABSTRACT, ACC_FINAL, ACC_NATIVE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC,
    ACC_SUPER, AttributeInfo, ClassFile, Code, ExceptionHandler, MemberInfo,
};
pub use pool::{Constant, ConstantPool};
pub use reader::ByteReader;
pub use rewrite::{Rewrite, rewrite_identifier};
pub use writer::ByteWriter;

/// Class-file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;
