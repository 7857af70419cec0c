// src/engine/diagnostic.rs

//! Diagnostics collected while a run is in progress.
//!
//! Step failures do not unwind across worker threads; they are recorded
//! here and the run's outcome is decided once every step has finished.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::step::StepName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        })
    }
}

/// A single note, warning or error recorded during a run.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    step: Option<StepName>,
    cause: Option<Arc<anyhow::Error>>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            step: None,
            cause: None,
        }
    }

    /// Error diagnostic for a step whose body returned `Err` or panicked.
    pub fn step_failure(step: &str, cause: anyhow::Error) -> Self {
        Self {
            severity: Severity::Error,
            message: format!("step '{step}' failed"),
            step: Some(step.to_string()),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn with_step(mut self, step: impl Into<StepName>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn step(&self) -> Option<&str> {
        self.step.as_deref()
    }

    pub fn cause(&self) -> Option<&Arc<anyhow::Error>> {
        self.cause.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause:#}")?;
        }
        Ok(())
    }
}

/// Append-only diagnostics list shared by all workers of a run.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub(crate) fn push(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    pub(crate) fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }
}
