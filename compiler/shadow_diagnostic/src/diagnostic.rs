//! The diagnostic value type.

use std::fmt;

use shadow_ir::Span;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One reported problem: code, severity, location, message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    /// Optional secondary notes, printed indented under the main line.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's fixed severity.
    pub fn new(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: code.severity(),
            span,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as `file:line:col: severity: message [CODE]`.
    pub fn render(&self, file: &str, source: &str) -> String {
        let (line, col) = self.span.line_col(source);
        let mut out = format!(
            "{file}:{line}:{col}: {}: {} [{}]",
            self.severity, self.message, self.code
        );
        for note in &self.notes {
            out.push_str("\n    note: ");
            out.push_str(note);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_includes_location_and_code() {
        let diag = Diagnostic::new(
            ErrorCode::DeadCode,
            Span::new(8, 10),
            "unreachable statement",
        );
        let rendered = diag.render("Hello.shadow", "class A\n{ }\n");
        assert_eq!(
            rendered,
            "Hello.shadow:2:1: warning: unreachable statement [DEAD_CODE]"
        );
    }

    #[test]
    fn severity_comes_from_code() {
        let diag = Diagnostic::new(ErrorCode::NoMatchingMethod, Span::DUMMY, "no match");
        assert!(diag.is_error());
    }
}
