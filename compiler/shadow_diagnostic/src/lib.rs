//! Diagnostics and error reporting for the Shadow compiler.
//!
//! Every phase funnels problems through a [`Reporter`]:
//! - the front-end adds parse and type-check errors,
//! - the flow analyses add warnings (dead code, unused members),
//! - the driver maps the final tally to a process [`ExitStatus`].
//!
//! Diagnostics are accumulated, sorted into source order, and printed in one
//! batch at the end of each phase; a phase with at least one error-severity
//! diagnostic terminates the compilation of that unit.

mod diagnostic;
mod error_code;
mod reporter;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::{ErrorCode, ExitStatus};
pub use reporter::Reporter;
