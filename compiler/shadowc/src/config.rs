//! Compiler configuration.
//!
//! An immutable value resolved once at startup from, in order: the
//! `--config` flag, the `SHADOW_SYSTEM_CONFIG` environment variable, and
//! the OS-selected default next to the running executable. The emitted
//! ABI derives from it, so nothing mutates it afterwards.
//!
//! The on-disk format is a small XML file:
//!
//! ```xml
//! <shadow>
//!   <llc>/usr/bin/llc</llc>
//!   <clang>/usr/bin/clang</clang>
//!   <import>/usr/lib/shadow/standard</import>
//! </shadow>
//! ```

use std::path::{Path, PathBuf};

use crate::error::DriverError;

/// Environment variable overriding the system configuration path.
pub const SYSTEM_CONFIG_ENV: &str = "SHADOW_SYSTEM_CONFIG";

/// Minimum LLVM major version per platform.
pub fn minimum_llvm_version() -> u32 {
    if cfg!(windows) {
        10
    } else {
        6
    }
}

/// The default configuration file name for this OS.
pub fn default_config_name() -> &'static str {
    if cfg!(windows) {
        "windows_system.xml"
    } else {
        "linux_system.xml"
    }
}

/// Resolved, immutable compiler configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub llc: PathBuf,
    pub clang: PathBuf,
    /// System import directories, search order preserved.
    pub imports: Vec<PathBuf>,
    pub minimum_llvm: u32,
}

impl Config {
    /// Resolve the configuration file path: explicit flag, environment
    /// override, then the platform default beside the executable.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, DriverError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(SYSTEM_CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let exe = std::env::current_exe().map_err(DriverError::Io)?;
        let beside = exe
            .parent()
            .map(|dir| dir.join(default_config_name()))
            .unwrap_or_else(|| PathBuf::from(default_config_name()));
        Ok(beside)
    }

    /// Load and parse a configuration file.
    pub fn load(path: &Path) -> Result<Config, DriverError> {
        let text = std::fs::read_to_string(path).map_err(|_| DriverError::MissingConfig {
            path: path.to_path_buf(),
        })?;
        Self::parse(&text, path)
    }

    /// Parse the XML text. The format is flat, so a tag scan is enough.
    pub fn parse(text: &str, origin: &Path) -> Result<Config, DriverError> {
        let llc = tag_value(text, "llc");
        let clang = tag_value(text, "clang");
        let imports: Vec<PathBuf> = tag_values(text, "import")
            .into_iter()
            .map(PathBuf::from)
            .collect();

        let (Some(llc), Some(clang)) = (llc, clang) else {
            return Err(DriverError::BadConfiguration {
                path: origin.to_path_buf(),
                detail: "both <llc> and <clang> must be set".to_string(),
            });
        };

        Ok(Config {
            llc: PathBuf::from(llc),
            clang: PathBuf::from(clang),
            imports,
            minimum_llvm: minimum_llvm_version(),
        })
    }
}

/// First occurrence of `<tag>value</tag>`.
fn tag_value(text: &str, tag: &str) -> Option<String> {
    tag_values(text, tag).into_iter().next()
}

/// Every occurrence of `<tag>value</tag>`, in order.
fn tag_values(text: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        let Some(end) = after.find(&close) else {
            break;
        };
        out.push(after[..end].trim().to_string());
        rest = &after[end + close.len()..];
    }
    out
}
