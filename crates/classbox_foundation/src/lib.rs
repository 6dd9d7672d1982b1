//! Error types and class-name utilities for Classbox.
//!
//! This crate provides:
//! - [`Error`] / [`ErrorKind`] - Typed failures for every execution stage
//! - [`Result`] - Result alias used across the workspace
//! - Binary class-name helpers ([`to_internal_name`], [`to_dotted_name`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod name;

pub use error::{Error, ErrorKind, ExecutionLimit, Result};
pub use name::{is_valid_internal_name, simple_name, to_dotted_name, to_internal_name};
