//! Capture sink, isolated execution contexts, and bytecode interpreter.
//!
//! This crate provides:
//! - [`ConsoleSink`] / [`ConsoleHandle`] - Per-execution output capture
//! - [`ExecutionContext`] - Isolation arena for loaded classes and statics
//! - [`LoadedClass`] / [`Method`] - Runtime views over parsed class files
//! - [`Interpreter`] - The bytecode interpreter driving one execution

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod class;
mod context;
mod interp;
mod sink;
mod value;

pub use class::{ENTRY_DESCRIPTOR, ENTRY_NAME, FieldDecl, LoadedClass, Method};
pub use context::ExecutionContext;
pub use interp::{DEFAULT_MAX_CALL_DEPTH, Interpreter};
pub use sink::{CONSOLE_CLASS, ConsoleHandle, ConsoleSink};
pub use value::{Throwable, Value};
