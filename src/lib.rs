//! Classbox - in-process sandbox for untrusted class files
//!
//! This crate re-exports all layers of the Classbox system for convenient
//! access. For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: classbox_runtime    — Execution driver, tracing, CLI
//! Layer 2: classbox_vm         — Capture sink, isolation contexts, interpreter
//! Layer 1: classbox_classfile  — Container parsing, constant rewriting, assembly
//! Layer 0: classbox_foundation — Error types, class-name utilities
//! ```

pub use classbox_classfile as classfile;
pub use classbox_foundation as foundation;
pub use classbox_runtime as runtime;
pub use classbox_vm as vm;
