//! Reporter: accumulates diagnostics across a compilation phase.
//!
//! Phases add diagnostics as they find them, in whatever order the walk
//! visits the tree; at the end of the phase the driver calls
//! [`Reporter::print_and_report`], which sorts into source order, prints,
//! and says whether the phase failed.

use shadow_ir::Span;

use crate::{Diagnostic, ErrorCode, ExitStatus, Severity};

/// Stop collecting errors past this many; warnings are never limited.
const DEFAULT_ERROR_LIMIT: usize = 100;

/// Accumulator for one compilation's diagnostics.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    /// First fatal code seen, for exit-status selection.
    first_error: Option<ErrorCode>,
    suppressed: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully built diagnostic.
    pub fn add(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => {
                if self.error_count >= DEFAULT_ERROR_LIMIT {
                    self.suppressed += 1;
                    return;
                }
                self.error_count += 1;
                if self.first_error.is_none() {
                    self.first_error = Some(diag.code);
                }
            }
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.diagnostics.push(diag);
    }

    /// Shorthand for [`Reporter::add`] with [`Diagnostic::new`].
    pub fn report(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        self.add(Diagnostic::new(code, span, message));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The exit status the compilation should end with: the status of the
    /// first fatal diagnostic, or `Success` when only warnings were seen.
    pub fn exit_status(&self) -> ExitStatus {
        match self.first_error {
            Some(code) => code.exit_status(),
            None => ExitStatus::Success,
        }
    }

    /// Sort into source order, print everything to stderr, and return the
    /// exit status. Called once per phase boundary.
    pub fn print_and_report(&mut self, file: &str, source: &str) -> ExitStatus {
        self.diagnostics
            .sort_by_key(|d| (d.span.start, d.span.end, d.severity != Severity::Error));
        for diag in &self.diagnostics {
            eprintln!("{}", diag.render(file, source));
        }
        if self.suppressed > 0 {
            eprintln!(
                "{}: too many errors; {} more not shown",
                file, self.suppressed
            );
        }
        self.exit_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn warnings_do_not_fail_the_phase() {
        let mut reporter = Reporter::new();
        reporter.report(ErrorCode::UnusedField, Span::DUMMY, "field `x` never used");
        assert!(!reporter.has_errors());
        assert_eq!(reporter.exit_status(), ExitStatus::Success);
        assert_eq!(reporter.warning_count(), 1);
    }

    #[test]
    fn first_fatal_code_selects_exit_status() {
        let mut reporter = Reporter::new();
        reporter.report(ErrorCode::DeadCode, Span::new(5, 6), "unreachable");
        reporter.report(ErrorCode::NotASubtype, Span::new(1, 2), "int is not String");
        reporter.report(ErrorCode::ToolFailure, Span::new(3, 4), "llc exited 1");
        assert_eq!(reporter.exit_status(), ExitStatus::TypeCheckError);
        assert_eq!(reporter.error_count(), 2);
    }

    #[test]
    fn error_limit_suppresses_overflow() {
        let mut reporter = Reporter::new();
        for i in 0..(DEFAULT_ERROR_LIMIT + 7) {
            reporter.report(
                ErrorCode::UnresolvedName,
                Span::new(i as u32, i as u32 + 1),
                format!("name{i}"),
            );
        }
        assert_eq!(reporter.error_count(), DEFAULT_ERROR_LIMIT);
        assert_eq!(reporter.diagnostics().len(), DEFAULT_ERROR_LIMIT);
    }
}
