//! Execution driver, tracing, and CLI for Classbox.
//!
//! This crate provides:
//! - [`Executor`] - The end-to-end driver: rewrite, load in isolation,
//!   invoke, collect captured output
//! - [`Tracer`] / [`TraceEvent`] - Execution observability
//! - The `classbox` binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod executor;
mod trace;

pub use executor::Executor;
pub use trace::{TraceEvent, TraceRecord, Tracer};
