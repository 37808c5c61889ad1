//! Diagnostics for the transfer session.
//!
//! The original implementation routed everything through global logging
//! macros keyed off a session pointer. Here the logger is an explicit value
//! carried inside the session record: components borrow it, verbosity
//! gating lives on it, and tests can swap the sink for an in-memory buffer.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Severity of a single diagnostic line.
///
/// `Info` carries a verbosity level in `1..=4`; the line is only rendered
/// when the logger's configured verbosity is at least that level. Errors
/// and warnings are always rendered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Fatal or per-file error.
    Error,
    /// Recoverable oddity worth surfacing.
    Warning,
    /// Progress chatter, gated by verbosity level.
    Info(u8),
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
            Self::Info(_) => f.write_str("info"),
        }
    }
}

/// A rendered diagnostic: severity plus the message text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    severity: Severity,
    text: String,
}

impl Message {
    /// Creates a message with the given severity.
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    /// Returns the message severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info(_) => f.write_str(&self.text),
            severity => write!(f, "oxsync {severity}: {}", self.text),
        }
    }
}

/// Maximum meaningful verbosity; `-v` occurrences beyond this are clamped.
pub const MAX_VERBOSITY: u8 = 4;

/// Verbosity-gated sink for [`Message`] values.
///
/// Cloning is cheap and clones share the underlying writer, so the session
/// can hand the logger to every component without threading lifetimes
/// through the call graph. The writer is locked per message; lines are
/// never interleaved mid-render.
#[derive(Clone)]
pub struct Logger {
    verbosity: u8,
    sink: Arc<Mutex<dyn Write + Send>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates a logger writing to standard error.
    #[must_use]
    pub fn stderr(verbosity: u8) -> Self {
        Self::with_sink(verbosity, io::stderr())
    }

    /// Creates a logger writing to an arbitrary sink; used by tests.
    #[must_use]
    pub fn with_sink<W: Write + Send + 'static>(verbosity: u8, sink: W) -> Self {
        Self {
            verbosity: verbosity.min(MAX_VERBOSITY),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Returns the configured verbosity (0–4).
    #[must_use]
    pub const fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Writes a message if its severity passes the verbosity gate.
    pub fn write(&self, message: &Message) {
        let pass = match message.severity() {
            Severity::Error | Severity::Warning => true,
            Severity::Info(level) => level <= self.verbosity,
        };
        if !pass {
            return;
        }
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{message}");
        }
    }

    /// Logs an error line.
    pub fn error(&self, text: impl Into<String>) {
        self.write(&Message::new(Severity::Error, text));
    }

    /// Logs a warning line.
    pub fn warning(&self, text: impl Into<String>) {
        self.write(&Message::new(Severity::Warning, text));
    }

    /// Logs an informational line at the given verbosity level.
    pub fn info(&self, level: u8, text: impl Into<String>) {
        self.write(&Message::new(Severity::Info(level), text));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stderr(0)
    }
}
