//! Per-execution output capture.
//!
//! The sink is the destination the constant rewriter points untrusted units
//! at: after rewriting, a unit's `getstatic` on the console class resolves to
//! the execution's capture stream instead of any real console. One sink is
//! created per execution, so concurrent executions can never interleave into
//! a shared buffer.

use std::cell::RefCell;
use std::rc::Rc;

/// Internal name of the substitute console class.
///
/// The execution driver rewrites `java/lang/System` references to this name;
/// the interpreter resolves its `out` and `err` fields to the capture stream.
pub const CONSOLE_CLASS: &str = "classbox/Console";

/// A cheap, clonable handle onto one execution's capture buffer.
#[derive(Clone, Debug, Default)]
pub struct ConsoleHandle {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl ConsoleHandle {
    /// Appends raw bytes.
    pub fn write_bytes(&self, bytes: &[u8]) {
        self.buffer.borrow_mut().extend_from_slice(bytes);
    }

    /// Appends UTF-8 text.
    pub fn write_str(&self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Appends text followed by a line terminator.
    pub fn write_line(&self, text: &str) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.extend_from_slice(text.as_bytes());
        buffer.push(b'\n');
    }

    /// Returns everything captured so far without clearing the buffer.
    ///
    /// Partial output stays retrievable even if the invocation later fails.
    #[must_use]
    pub fn drain_to_string(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }

    /// Number of captured bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.borrow().len()
    }

    /// Returns true if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }

    /// Clears the buffer.
    pub fn reset(&self) {
        self.buffer.borrow_mut().clear();
    }
}

/// One execution's capture buffer.
///
/// Owns the buffer; [`ConsoleSink::handle`] hands out aliases for the
/// interpreter to write through.
#[derive(Clone, Debug, Default)]
pub struct ConsoleSink {
    handle: ConsoleHandle,
}

impl ConsoleSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a writing handle sharing this sink's buffer.
    #[must_use]
    pub fn handle(&self) -> ConsoleHandle {
        self.handle.clone()
    }

    /// Returns everything captured so far without clearing the buffer.
    #[must_use]
    pub fn drain_to_string(&self) -> String {
        self.handle.drain_to_string()
    }

    /// Number of captured bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    /// Returns true if nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Clears the buffer.
    pub fn reset(&self) {
        self.handle.reset();
    }
}
