//! Command-line parsing.
//!
//! One positional `.shadow` source plus long flags; anything unrecognized
//! is a command-line error (exit status −5).

use std::path::PathBuf;

/// Parsed command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// The main source file.
    pub source: Option<PathBuf>,
    /// `--config FILE`: explicit configuration file.
    pub config: Option<PathBuf>,
    /// `--check`: type-check only, no TAC or LLVM.
    pub check: bool,
    /// `--compile`: emit objects but do not link.
    pub compile_only: bool,
    /// `--no-link`: alias kept for build scripts.
    pub no_link: bool,
    /// `--force-recompile`: ignore timestamps.
    pub force_recompile: bool,
    /// `--human-readable`: keep the `.ll` next to the `.o`.
    pub human_readable: bool,
    pub help: bool,
    pub information: bool,
}

/// A command-line problem, reported before anything else runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CliError {
    UnknownFlag(String),
    MissingValue(&'static str),
    ExtraSource(String),
    NoSource,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::UnknownFlag(flag) => write!(f, "unknown option `{flag}`"),
            CliError::MissingValue(flag) => write!(f, "option `{flag}` requires a value"),
            CliError::ExtraSource(path) => {
                write!(f, "unexpected extra source file `{path}`")
            }
            CliError::NoSource => write!(f, "no source file given"),
        }
    }
}

impl std::error::Error for CliError {}

impl CliOptions {
    /// Parse everything after the program name.
    pub fn parse<I, S>(args: I) -> Result<CliOptions, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut options = CliOptions::default();
        let mut iter = args.into_iter().map(Into::into);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => match iter.next() {
                    Some(value) => options.config = Some(PathBuf::from(value)),
                    None => return Err(CliError::MissingValue("--config")),
                },
                "--check" => options.check = true,
                "--compile" => options.compile_only = true,
                "--no-link" => options.no_link = true,
                "--force-recompile" => options.force_recompile = true,
                "--human-readable" => options.human_readable = true,
                "--help" | "-h" => options.help = true,
                "--information" => options.information = true,
                flag if flag.starts_with('-') => {
                    return Err(CliError::UnknownFlag(flag.to_string()))
                }
                source => {
                    if options.source.is_some() {
                        return Err(CliError::ExtraSource(source.to_string()));
                    }
                    options.source = Some(PathBuf::from(source));
                }
            }
        }
        if options.source.is_none() && !options.help && !options.information {
            return Err(CliError::NoSource);
        }
        Ok(options)
    }
}

pub const USAGE: &str = "\
Usage: shadowc [options] <file.shadow>

Options:
  --config FILE       use FILE as the system configuration
  --check             type-check only, produce no output
  --compile           compile to object files without linking
  --no-link           same as --compile
  --force-recompile   ignore cached artifacts
  --human-readable    keep the emitted .ll files
  --help              print this message
  --information       print version and configuration details
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flags_and_positional_source() {
        let options = CliOptions::parse([
            "--check",
            "--human-readable",
            "Hello.shadow",
        ])
        .unwrap();
        assert!(options.check);
        assert!(options.human_readable);
        assert_eq!(options.source, Some(PathBuf::from("Hello.shadow")));
    }

    #[test]
    fn config_takes_a_value() {
        let options = CliOptions::parse(["--config", "my.xml", "A.shadow"]).unwrap();
        assert_eq!(options.config, Some(PathBuf::from("my.xml")));
        assert_eq!(
            CliOptions::parse(["A.shadow", "--config"]),
            Err(CliError::MissingValue("--config"))
        );
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert_eq!(
            CliOptions::parse(["--verbose", "A.shadow"]),
            Err(CliError::UnknownFlag("--verbose".to_string()))
        );
    }

    #[test]
    fn one_source_only() {
        assert_eq!(
            CliOptions::parse(["A.shadow", "B.shadow"]),
            Err(CliError::ExtraSource("B.shadow".to_string()))
        );
        assert_eq!(CliOptions::parse::<[&str; 0], &str>([]), Err(CliError::NoSource));
    }

    #[test]
    fn help_needs_no_source() {
        let options = CliOptions::parse(["--help"]).unwrap();
        assert!(options.help);
    }
}
