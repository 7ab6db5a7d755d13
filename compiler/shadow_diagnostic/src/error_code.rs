//! Error codes and process exit statuses.

use std::fmt;

use crate::Severity;

/// Every diagnostic the compiler can produce.
///
/// Codes are grouped by the phase that raises them; [`ErrorCode::severity`]
/// gives the fixed severity of each code (flow codes are the only warnings).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Parse (fatal to the unit)
    ParseError,

    // Type check
    UnresolvedName,
    NotASubtype,
    AmbiguousOverload,
    DuplicateDeclaration,
    IllegalCast,
    BadGenericArity,
    FieldNotInitialized,
    NoMatchingMethod,
    MissingReturn,

    // Flow warnings
    DeadCode,
    UnusedField,
    UnusedMethod,

    // Compile
    InvalidIr,
    ToolFailure,

    // Configuration
    MissingLlvm,
    LlvmVersionTooLow,
    MissingImport,
    BadConfiguration,

    // IO
    FileNotFound,
    UnreadableDirectory,
}

impl ErrorCode {
    /// Fixed severity of this code.
    pub fn severity(self) -> Severity {
        match self {
            ErrorCode::DeadCode | ErrorCode::UnusedField | ErrorCode::UnusedMethod => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Stable name used in rendered diagnostics and test expectations.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::UnresolvedName => "UNRESOLVED_NAME",
            ErrorCode::NotASubtype => "NOT_A_SUBTYPE",
            ErrorCode::AmbiguousOverload => "AMBIGUOUS_OVERLOAD",
            ErrorCode::DuplicateDeclaration => "DUPLICATE_DECLARATION",
            ErrorCode::IllegalCast => "ILLEGAL_CAST",
            ErrorCode::BadGenericArity => "BAD_GENERIC_ARITY",
            ErrorCode::FieldNotInitialized => "FIELD_NOT_INITIALIZED",
            ErrorCode::NoMatchingMethod => "NO_MATCHING_METHOD",
            ErrorCode::MissingReturn => "MISSING_RETURN",
            ErrorCode::DeadCode => "DEAD_CODE",
            ErrorCode::UnusedField => "UNUSED_FIELD",
            ErrorCode::UnusedMethod => "UNUSED_METHOD",
            ErrorCode::InvalidIr => "INVALID_IR",
            ErrorCode::ToolFailure => "TOOL_FAILURE",
            ErrorCode::MissingLlvm => "MISSING_LLVM",
            ErrorCode::LlvmVersionTooLow => "LLVM_VERSION_TOO_LOW",
            ErrorCode::MissingImport => "MISSING_IMPORT",
            ErrorCode::BadConfiguration => "BAD_CONFIGURATION",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::UnreadableDirectory => "UNREADABLE_DIRECTORY",
        }
    }

    /// The exit status a fatal diagnostic of this code maps to.
    pub fn exit_status(self) -> ExitStatus {
        match self {
            ErrorCode::ParseError => ExitStatus::ParseError,
            ErrorCode::UnresolvedName
            | ErrorCode::NotASubtype
            | ErrorCode::AmbiguousOverload
            | ErrorCode::DuplicateDeclaration
            | ErrorCode::IllegalCast
            | ErrorCode::BadGenericArity
            | ErrorCode::FieldNotInitialized
            | ErrorCode::NoMatchingMethod
            | ErrorCode::MissingReturn => ExitStatus::TypeCheckError,
            ErrorCode::DeadCode | ErrorCode::UnusedField | ErrorCode::UnusedMethod => {
                ExitStatus::Success
            }
            ErrorCode::InvalidIr | ErrorCode::ToolFailure => ExitStatus::CompileError,
            ErrorCode::MissingLlvm
            | ErrorCode::LlvmVersionTooLow
            | ErrorCode::MissingImport
            | ErrorCode::BadConfiguration => ExitStatus::ConfigurationError,
            ErrorCode::FileNotFound | ErrorCode::UnreadableDirectory => ExitStatus::FileNotFound,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Documented process exit statuses.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExitStatus {
    Success,
    FileNotFound,
    ParseError,
    TypeCheckError,
    CompileError,
    CommandLineError,
    ConfigurationError,
}

impl ExitStatus {
    /// The value handed to `std::process::exit`.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::FileNotFound => -1,
            ExitStatus::ParseError => -2,
            ExitStatus::TypeCheckError => -3,
            ExitStatus::CompileError => -4,
            ExitStatus::CommandLineError => -5,
            ExitStatus::ConfigurationError => -6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_codes_are_warnings() {
        assert_eq!(ErrorCode::DeadCode.severity(), Severity::Warning);
        assert_eq!(ErrorCode::UnusedField.severity(), Severity::Warning);
        assert_eq!(ErrorCode::NotASubtype.severity(), Severity::Error);
    }

    #[test]
    fn exit_codes_match_documentation() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::FileNotFound.code(), -1);
        assert_eq!(ExitStatus::ParseError.code(), -2);
        assert_eq!(ExitStatus::TypeCheckError.code(), -3);
        assert_eq!(ExitStatus::CompileError.code(), -4);
        assert_eq!(ExitStatus::CommandLineError.code(), -5);
        assert_eq!(ExitStatus::ConfigurationError.code(), -6);
    }
}
