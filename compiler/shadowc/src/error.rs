//! Driver errors and their exit statuses.

use std::path::PathBuf;

use shadow_diagnostic::ExitStatus;

use crate::cli::CliError;

/// Hard failures of the driver itself; compile diagnostics flow through
/// the [`Reporter`](shadow_diagnostic::Reporter) instead.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{0}")]
    Cli(#[from] CliError),

    #[error("source file `{path}` not found")]
    SourceNotFound { path: PathBuf },

    #[error("configuration file `{path}` not found")]
    MissingConfig { path: PathBuf },

    #[error("configuration file `{path}` is invalid: {detail}")]
    BadConfiguration { path: PathBuf, detail: String },

    #[error("`{tool}` not found or not executable")]
    MissingTool { tool: PathBuf },

    #[error("LLVM version {found} is older than the required {required}")]
    LlvmTooOld { found: u32, required: u32 },

    #[error("`{tool}` exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("the front end is not linked into this build")]
    FrontEndUnavailable,

    #[error("compilation failed")]
    CompileFailed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// The documented exit status for this failure.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DriverError::Cli(_) => ExitStatus::CommandLineError,
            DriverError::SourceNotFound { .. } | DriverError::Io(_) => ExitStatus::FileNotFound,
            DriverError::MissingConfig { .. }
            | DriverError::BadConfiguration { .. }
            | DriverError::MissingTool { .. }
            | DriverError::LlvmTooOld { .. }
            | DriverError::FrontEndUnavailable => ExitStatus::ConfigurationError,
            DriverError::ToolFailed { .. } | DriverError::CompileFailed => {
                ExitStatus::CompileError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_statuses_follow_the_documented_mapping() {
        assert_eq!(
            DriverError::Cli(CliError::NoSource).exit_status().code(),
            -5
        );
        assert_eq!(
            DriverError::SourceNotFound {
                path: PathBuf::from("A.shadow")
            }
            .exit_status()
            .code(),
            -1
        );
        assert_eq!(
            DriverError::LlvmTooOld {
                found: 5,
                required: 6
            }
            .exit_status()
            .code(),
            -6
        );
        assert_eq!(
            DriverError::ToolFailed {
                tool: "llc".to_string(),
                status: 1,
                stderr: String::new()
            }
            .exit_status()
            .code(),
            -4
        );
    }
}
