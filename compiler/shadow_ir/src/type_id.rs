//! Type pool index handle.
//!
//! `TypeId` is the canonical type representation throughout the compiler.
//! The pool that owns the entries lives in `shadow_types`; the handle lives
//! here so the AST, TAC, and diagnostics can all carry type annotations
//! without depending on the pool crate.
//!
//! # Design
//!
//! - 32-bit indices; equality is O(1) index comparison
//! - Primitive types and the always-referenced runtime classes occupy fixed
//!   indices, pre-interned at pool creation
//! - Instantiated generics are deduplicated at interning time, so handle
//!   equality is also instantiation identity

use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive types (indices 0-11) ===

    pub const BOOLEAN: Self = Self(0);
    pub const BYTE: Self = Self(1);
    pub const UBYTE: Self = Self(2);
    pub const SHORT: Self = Self(3);
    pub const USHORT: Self = Self(4);
    pub const INT: Self = Self(5);
    pub const UINT: Self = Self(6);
    pub const CODE: Self = Self(7);
    pub const LONG: Self = Self(8);
    pub const ULONG: Self = Self(9);
    pub const FLOAT: Self = Self(10);
    pub const DOUBLE: Self = Self(11);

    // === Always-referenced runtime classes (indices 12-20) ===
    // Pre-interned as skeletons; the front-end fills in their members.

    /// `shadow:standard@Object`, the root of the reference hierarchy.
    pub const OBJECT: Self = Self(12);
    /// `shadow:standard@Class`, the class-descriptor type.
    pub const CLASS: Self = Self(13);
    /// `shadow:standard@GenericClass`.
    pub const GENERIC_CLASS: Self = Self(14);
    /// `shadow:standard@String`.
    pub const STRING: Self = Self(15);
    /// `shadow:standard@Exception`.
    pub const EXCEPTION: Self = Self(16);
    /// `shadow:standard@Array`, base of all non-nullable arrays.
    pub const ARRAY: Self = Self(17);
    /// `shadow:standard@ArrayNullable`, base of all nullable arrays.
    pub const ARRAY_NULLABLE: Self = Self(18);
    /// The type of the `null` literal.
    pub const NULL: Self = Self(19);
    /// Placeholder produced while recovering from front-end errors.
    pub const UNKNOWN: Self = Self(20);

    /// First index handed out for dynamically interned types.
    pub const FIRST_DYNAMIC: u32 = 32;

    /// Sentinel for "no type" (absent extends, void-adjacent slots).
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Is this one of the twelve primitive types?
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 <= Self::DOUBLE.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeId(NONE)")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}
