//! Diagnostic sink passed into reader/writer constructors.
//!
//! The original tool kept a process-wide console handle for colored
//! warnings and a file-flush callback. That global state is replaced here
//! with an explicit sink object: callers choose where diagnostics go, and
//! nothing in this crate reaches for a global.

use std::fmt;

/// A single diagnostic emitted while reading or writing a container.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    /// Region stack active when the diagnostic was emitted, innermost last.
    pub region_stack: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.region_stack.is_empty() {
            write!(f, " (in {})", self.region_stack.join(" > "))?;
        }
        Ok(())
    }
}

/// Receives non-fatal diagnostics from readers and writers.
///
/// Fatal errors are always returned as `Result::Err`; this sink is only for
/// `UnknownSection`/`TruncatedString`-class degradations and debug hex-dump
/// traces that should not abort the calling codec.
pub trait Diagnostics {
    fn report(&mut self, diag: Diagnostic);
}

/// Writes every diagnostic to `stderr` via the [`log`] crate at `warn`
/// level. This is the default sink used when a caller does not supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn report(&mut self, diag: Diagnostic) {
        log::warn!("{diag}");
    }
}

/// Collects diagnostics into a `Vec` instead of emitting them immediately.
/// Useful for tests and for frontends that want to render their own
/// notification list.
#[derive(Debug, Default, Clone)]
pub struct CollectingDiagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }
}

/// Discards every diagnostic. Useful for round-trip tests that only care
/// about the final bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn report(&mut self, _diag: Diagnostic) {}
}
