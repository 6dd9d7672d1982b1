//! The execution driver.
//!
//! [`Executor::execute`] runs one untrusted class file end to end: create a
//! fresh capture sink, rewrite the unit's console-identifier reference to
//! point at the sink's class, load the patched unit into a fresh isolation
//! context, invoke its entry point with a null argument array, and return
//! everything captured. Every call builds its own sink and context, so an
//! `Executor` can be shared freely across threads without executions
//! interleaving their output.

use classbox_classfile::{Rewrite, rewrite_identifier};
use classbox_foundation::{Error, Result, is_valid_internal_name};
use classbox_vm::{CONSOLE_CLASS, ConsoleSink, DEFAULT_MAX_CALL_DEPTH, Interpreter};

use crate::trace::{TraceEvent, Tracer};

/// Internal name of the console class untrusted units are written against.
const DEFAULT_REDIRECT_FROM: &str = "java/lang/System";

/// Drives sandboxed executions of untrusted class files.
#[derive(Clone, Debug)]
pub struct Executor {
    redirect_from: String,
    redirect_to: String,
    max_call_depth: usize,
    instruction_budget: Option<u64>,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            redirect_from: DEFAULT_REDIRECT_FROM.to_string(),
            redirect_to: CONSOLE_CLASS.to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            instruction_budget: None,
        }
    }
}

impl Executor {
    /// Creates an executor with the default redirection
    /// (`java/lang/System` to the capture console) and limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the redirected identifier pair.
    #[must_use]
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirect_from = from.into();
        self.redirect_to = to.into();
        self
    }

    /// Overrides the interpreter call-depth bound.
    #[must_use]
    pub fn with_max_call_depth(mut self, limit: usize) -> Self {
        self.max_call_depth = limit;
        self
    }

    /// Sets an opt-in instruction budget; `None` means unbounded.
    #[must_use]
    pub fn with_instruction_budget(mut self, limit: Option<u64>) -> Self {
        self.instruction_budget = limit;
        self
    }

    /// The identifier being redirected away from.
    #[must_use]
    pub fn redirect_from(&self) -> &str {
        &self.redirect_from
    }

    /// The identifier console references are redirected to.
    #[must_use]
    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }

    /// Rewrites a container's console references without executing it.
    ///
    /// A result with `replaced == 0` means the unit never names the console
    /// class; executing it is still valid, it will simply capture nothing.
    ///
    /// # Errors
    /// Malformed-class errors for unparseable containers, redirection errors
    /// for invalid identifiers or a consistency violation.
    pub fn patch(&self, container: &[u8]) -> Result<Rewrite> {
        for name in [&self.redirect_from, &self.redirect_to] {
            if !is_valid_internal_name(name) {
                return Err(Error::redirection(format!(
                    "invalid redirect identifier \"{name}\""
                )));
            }
        }
        rewrite_identifier(container, &self.redirect_from, &self.redirect_to)
    }

    /// Runs one unit and returns everything it printed.
    ///
    /// # Errors
    /// All of [`Executor::patch`]'s errors, plus load errors, entry-point
    /// errors, and invocation errors. Invocation errors carry the captured
    /// output (diagnostic trace included) so partial output stays
    /// inspectable.
    pub fn execute(&self, container: &[u8]) -> Result<String> {
        self.run(container, &mut Tracer::disabled())
    }

    /// Like [`Executor::execute`], recording driver events into `tracer`.
    ///
    /// # Errors
    /// See [`Executor::execute`].
    pub fn execute_traced(&self, container: &[u8], tracer: &mut Tracer) -> Result<String> {
        self.run(container, tracer)
    }

    fn run(&self, container: &[u8], tracer: &mut Tracer) -> Result<String> {
        // One sink per call; concurrent executions never share a buffer.
        let sink = ConsoleSink::new();

        let patched = self.patch(container)?;
        tracer.record(TraceEvent::RewriteApplied {
            from: self.redirect_from.clone(),
            to: self.redirect_to.clone(),
            replaced: patched.replaced,
        });

        let mut interp = Interpreter::new(sink.handle());
        interp.set_console_class(self.redirect_to.clone());
        interp.set_max_call_depth(self.max_call_depth);
        interp.set_instruction_budget(self.instruction_budget);

        let class = interp.load(&patched.bytes)?;
        tracer.record(TraceEvent::ClassLoaded {
            class: class.name().to_string(),
        });

        if class.entry_point().is_ok() {
            tracer.record(TraceEvent::EntryInvoked {
                class: class.name().to_string(),
            });
        }
        let result = interp.run_main(&class);
        tracer.record(TraceEvent::ExecutionFinished {
            ok: result.is_ok(),
            captured_bytes: sink.len(),
        });
        result?;
        Ok(sink.drain_to_string())
    }
}
