//! The front-end interface.
//!
//! Lexing, parsing, and type checking live in their own crate and are
//! linked into the distributed compiler; the driver only depends on this
//! trait. A build without the front end (this repository's default)
//! reports a configuration error rather than pretending to parse.

use std::path::Path;

use crate::driver::CheckedUnit;
use crate::error::DriverError;

/// Produces checked compilation units from source paths.
pub trait FrontEnd {
    fn load(&mut self, source: &Path) -> Result<CheckedUnit, DriverError>;
}

/// Placeholder used when the front end is not linked in.
#[derive(Default)]
pub struct UnlinkedFrontEnd;

impl FrontEnd for UnlinkedFrontEnd {
    fn load(&mut self, _source: &Path) -> Result<CheckedUnit, DriverError> {
        Err(DriverError::FrontEndUnavailable)
    }
}
