//! The Shadow compiler driver.
//!
//! Glue between the front end, the middle end, and the external LLVM
//! toolchain:
//!
//! - [`cli`] — the command-line surface
//! - [`config`] — the immutable system configuration (XML + environment)
//! - [`driver`] — the pipeline: TAC, analyses, emission, caching
//! - [`tools`] — `llc`/`clang` invocation and version checks
//! - [`front`] — the interface the external front end fulfills

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod front;
pub mod tools;
pub mod tracing_setup;

#[cfg(test)]
mod tests;

pub use cli::{CliOptions, USAGE};
pub use config::Config;
pub use driver::{compile, order_modules, select_main, CheckedUnit};
pub use error::DriverError;
pub use front::{FrontEnd, UnlinkedFrontEnd};
