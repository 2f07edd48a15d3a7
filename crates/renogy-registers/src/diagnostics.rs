use core::fmt;
use tracing::{debug, warn};

/// Data-quality conditions reported while decoding. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// One or more fields did not fit in the payload and were skipped.
    PartialParse {
        model: String,
        actual_len: usize,
        required_len: usize,
        skipped: usize,
    },
    UnsupportedModel { model: String },
}

impl Diagnostic {
    pub fn model(&self) -> &str {
        match self {
            Diagnostic::PartialParse { model, .. } | Diagnostic::UnsupportedModel { model } => model,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PartialParse {
                model,
                actual_len,
                required_len,
                skipped,
            } => write!(
                f,
                "{model}: unexpected data length ({actual_len} of {required_len} bytes), partial parsing attempted, {skipped} field(s) skipped"
            ),
            Diagnostic::UnsupportedModel { model } => write!(f, "unsupported model: {model}"),
        }
    }
}

/// Receives diagnostics from the decoder. Shared across threads.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diag: &Diagnostic);

    /// Called once per successful schema lookup with the number of decoded fields.
    fn decoded(&self, _model: &str, _fields: usize) {}
}

/// Logs diagnostics through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diag: &Diagnostic) {
        warn!(model = diag.model(), "{diag}");
    }

    fn decoded(&self, model: &str, fields: usize) {
        debug!(model, fields, "payload decoded");
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn report(&self, diag: &Diagnostic) {
        (**self).report(diag)
    }

    fn decoded(&self, model: &str, fields: usize) {
        (**self).decoded(model, fields)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn report(&self, diag: &Diagnostic) {
        (**self).report(diag)
    }

    fn decoded(&self, model: &str, fields: usize) {
        (**self).decoded(model, fields)
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    seen: std::sync::Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        match self.seen.lock() {
            Ok(mut v) => std::mem::take(&mut *v),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diag: &Diagnostic) {
        match self.seen.lock() {
            Ok(mut v) => v.push(diag.clone()),
            Err(poisoned) => poisoned.into_inner().push(diag.clone()),
        }
    }
}
