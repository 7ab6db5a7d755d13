//! External toolchain: `llc` assembly and `clang` linkage.
//!
//! Each spawn blocks the compiler until the child exits, with stderr
//! piped for the failure report. A failed assembly deletes the partial
//! object before returning.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::error::DriverError;

/// Handle to the configured external tools.
pub struct Toolchain<'a> {
    config: &'a Config,
}

impl<'a> Toolchain<'a> {
    pub fn new(config: &'a Config) -> Self {
        Toolchain { config }
    }

    /// Probe `llc --version` and enforce the platform minimum.
    pub fn check_llvm_version(&self) -> Result<u32, DriverError> {
        let output = Command::new(&self.config.llc)
            .arg("--version")
            .output()
            .map_err(|_| DriverError::MissingTool {
                tool: self.config.llc.clone(),
            })?;
        let text = String::from_utf8_lossy(&output.stdout).to_string();
        let found = parse_llvm_version(&text).ok_or_else(|| DriverError::BadConfiguration {
            path: self.config.llc.clone(),
            detail: "could not parse `llc --version` output".to_string(),
        })?;
        if found < self.config.minimum_llvm {
            return Err(DriverError::LlvmTooOld {
                found,
                required: self.config.minimum_llvm,
            });
        }
        Ok(found)
    }

    /// Assemble one `.ll` into an object file.
    pub fn assemble(&self, ll: &Path, object: &Path) -> Result<(), DriverError> {
        tracing::debug!(input = %ll.display(), output = %object.display(), "llc");
        let output = Command::new(&self.config.llc)
            .arg("-filetype=obj")
            .arg(ll)
            .arg("-o")
            .arg(object)
            .output()
            .map_err(|_| DriverError::MissingTool {
                tool: self.config.llc.clone(),
            })?;
        if !output.status.success() {
            // Never leave a truncated object for the next build to trust.
            let _ = std::fs::remove_file(object);
            return Err(DriverError::ToolFailed {
                tool: "llc".to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }

    /// Link objects into the final executable.
    pub fn link(&self, objects: &[PathBuf], executable: &Path) -> Result<(), DriverError> {
        tracing::debug!(output = %executable.display(), count = objects.len(), "clang");
        let output = Command::new(&self.config.clang)
            .args(objects)
            .arg("-o")
            .arg(executable)
            .output()
            .map_err(|_| DriverError::MissingTool {
                tool: self.config.clang.clone(),
            })?;
        if !output.status.success() {
            let _ = std::fs::remove_file(executable);
            return Err(DriverError::ToolFailed {
                tool: "clang".to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

/// `artifact` is current when it exists and is no older than `source`.
pub fn up_to_date(source: &Path, artifact: &Path) -> bool {
    let Ok(source_meta) = std::fs::metadata(source) else {
        return false;
    };
    let Ok(artifact_meta) = std::fs::metadata(artifact) else {
        return false;
    };
    match (source_meta.modified(), artifact_meta.modified()) {
        (Ok(src), Ok(art)) => art >= src,
        _ => false,
    }
}

/// Extract the major version from `llc --version` output.
fn parse_llvm_version(text: &str) -> Option<u32> {
    let marker = "LLVM version ";
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn version_parsing_handles_common_layouts() {
        assert_eq!(
            parse_llvm_version("LLVM (http://llvm.org/):\n  LLVM version 6.0.1\n"),
            Some(6)
        );
        assert_eq!(parse_llvm_version("LLVM version 14.0.6"), Some(14));
        assert_eq!(parse_llvm_version("no version here"), None);
    }

    #[test]
    fn timestamps_gate_recompilation() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("A.shadow");
        let object = dir.path().join("A.o");
        std::fs::write(&source, "class A { }").unwrap();
        // Object missing: stale.
        assert!(!up_to_date(&source, &object));
        std::fs::write(&object, "o").unwrap();
        // Object written after the source: current.
        assert!(up_to_date(&source, &object));
        // Source missing entirely: stale.
        assert!(!up_to_date(&dir.path().join("gone.shadow"), &object));
    }
}
