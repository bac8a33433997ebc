use std::fmt;

use tracing::{error, warn};

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    /// A path segment does not match the expected folder, or is empty.
    InvalidPath,
    /// A folder is missing and creation was disallowed.
    FolderNotFound,
    /// A corpus path names a namespace with no mounted root.
    UnknownNamespace,
    /// A forced reload is discarding unsaved changes.
    DiscardingChanges,
}

/// An observable report from path resolution or document reloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    /// The path or document name the report is about.
    pub path: String,
    pub message: String,
}

impl Event for Diagnostic {}

impl Diagnostic {
    pub(crate) fn error(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic { level: DiagnosticLevel::Error, code, path: path.into(), message: message.into() }
    }

    pub(crate) fn warning(code: DiagnosticCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic { level: DiagnosticLevel::Warning, code, path: path.into(), message: message.into() }
    }

    /// Mirrors the diagnostic into the tracing log.
    pub(crate) fn trace(&self) {
        match self.level {
            DiagnosticLevel::Error => error!(code = ?self.code, path = %self.path, "{}", self.message),
            DiagnosticLevel::Warning => warn!(code = ?self.code, path = %self.path, "{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
        };
        write!(f, "{level}: {} ({})", self.message, self.path)
    }
}
