//! Declaration modifier bitset.
//!
//! One set shared by types, fields, and methods. Not every flag is legal on
//! every declaration kind; the front-end enforces placement, the middle-end
//! only reads.

use bitflags::bitflags;

bitflags! {
    /// Modifiers attached to a type, field, or method declaration.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Modifiers: u32 {
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const PROTECTED = 1 << 2;
        const IMMUTABLE = 1 << 3;
        const NULLABLE  = 1 << 4;
        const READONLY  = 1 << 5;
        const CONSTANT  = 1 << 6;
        const GET       = 1 << 7;
        const SET       = 1 << 8;
        /// Declared in a `.native.ll` glue file; no body is compiled.
        const IMPORT    = 1 << 9;
        /// Visible to native glue; never reported as unused.
        const EXPORT    = 1 << 10;
        /// `@unused` annotation: suppress unused-field/unused-method warnings.
        const UNUSED    = 1 << 11;
    }
}

impl Modifiers {
    #[inline]
    pub fn is_nullable(self) -> bool {
        self.contains(Modifiers::NULLABLE)
    }

    #[inline]
    pub fn is_private(self) -> bool {
        self.contains(Modifiers::PRIVATE)
    }

    #[inline]
    pub fn is_constant(self) -> bool {
        self.contains(Modifiers::CONSTANT)
    }
}
