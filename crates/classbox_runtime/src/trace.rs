//! Execution tracing.
//!
//! A disabled tracer costs one branch per event; the CLI enables it behind
//! `--trace` to show what the driver did to a unit before and during its
//! execution.

/// Events recorded while driving one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// The console identifier was rewritten in the container.
    RewriteApplied {
        /// Identifier that was redirected.
        from: String,
        /// Identifier it now points at.
        to: String,
        /// Number of constant entries replaced.
        replaced: usize,
    },
    /// A class was admitted into the execution context.
    ClassLoaded {
        /// Internal name of the class.
        class: String,
    },
    /// The entry point was located and invoked.
    EntryInvoked {
        /// Internal name of the entry class.
        class: String,
    },
    /// The execution finished.
    ExecutionFinished {
        /// Whether the invocation completed without error.
        ok: bool,
        /// Bytes sitting in the capture buffer at the end.
        captured_bytes: usize,
    },
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RewriteApplied { from, to, replaced } => {
                write!(f, "rewrite {from} -> {to} ({replaced} entries)")
            }
            Self::ClassLoaded { class } => write!(f, "loaded {class}"),
            Self::EntryInvoked { class } => write!(f, "invoked {class}.main"),
            Self::ExecutionFinished { ok, captured_bytes } => {
                let status = if *ok { "ok" } else { "failed" };
                write!(f, "finished {status}, {captured_bytes} bytes captured")
            }
        }
    }
}

/// A recorded event with its sequence number.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Sequence number, monotonically increasing per tracer.
    pub id: u64,
    /// The event.
    pub event: TraceEvent,
}

/// Collects [`TraceEvent`]s for one or more executions.
#[derive(Clone, Debug)]
pub struct Tracer {
    enabled: bool,
    records: Vec<TraceRecord>,
    next_id: u64,
}

impl Tracer {
    /// Creates a tracer that discards all events.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            records: Vec::new(),
            next_id: 0,
        }
    }

    /// Creates a tracer that records events.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            records: Vec::new(),
            next_id: 0,
        }
    }

    /// Returns true if events are being recorded.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records an event (no-op when disabled).
    pub fn record(&mut self, event: TraceEvent) {
        if !self.enabled {
            return;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(TraceRecord { id, event });
    }

    /// The recorded events, oldest first.
    #[must_use]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Clears recorded events without resetting sequence numbers.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}
