use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Trace => write!(f, "trace"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Receiver for diagnostics from the compiler and the binary layer.
///
/// Passed in by the caller rather than reached through a global logger, so
/// hosts can collect, filter or forward as they see fit.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);

    fn trace(&mut self, message: String) {
        self.report(Diagnostic {
            severity: Severity::Trace,
            message,
        });
    }

    fn info(&mut self, message: String) {
        self.report(Diagnostic {
            severity: Severity::Info,
            message,
        });
    }

    fn warning(&mut self, message: String) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    fn error(&mut self, message: String) {
        self.report(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }
}

/// Default sink: forwards everything to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Trace => log::trace!("{}", diagnostic.message),
            Severity::Info => log::info!("{}", diagnostic.message),
            Severity::Warning => log::warn!("{}", diagnostic.message),
            Severity::Error => log::error!("{}", diagnostic.message),
        }
    }
}

/// Collecting sink, used by tests and by hosts that surface diagnostics
/// through their own UI.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

impl DiagnosticSink for CollectSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
