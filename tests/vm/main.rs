//! Integration tests for Layer 2: capture sink, contexts, interpreter.

mod context;
mod interp;
