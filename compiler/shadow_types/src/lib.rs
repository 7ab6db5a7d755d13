//! Type model for the Shadow compiler.
//!
//! All types live in a single [`TypePool`] and are referenced by
//! [`TypeId`](shadow_ir::TypeId) — the class ↔ method ↔ type-parameter ↔
//! outer-class graph is cyclic, so relationships are index edges, never
//! owning pointers.
//!
//! # Design
//!
//! - **Intern-and-deduplicate**: structural types (arrays, sequences,
//!   method signatures) and generic instantiations are interned, so handle
//!   equality is type equality including type arguments
//! - **Fixed primitive indices**: the twelve primitives and the
//!   always-referenced runtime classes are pre-interned at pool creation
//! - **Frozen after checking**: the front-end constructs and mutates
//!   entries; once TAC building starts the pool is frozen and later phases
//!   only read (structural interning stays available — it creates no class
//!   state)
//!
//! Operations are free-standing pool methods rather than methods on a type
//! object: [`TypePool::is_subtype`], [`TypePool::replace`],
//! [`TypePool::matching_method`], [`TypePool::all_interfaces`],
//! [`TypePool::is_recursively_parameterized`].

mod entry;
mod pool;
mod replace;
mod resolve;
mod subtype;

pub use entry::{FieldInfo, PrimitiveKind, TypeEntry, TypeVariant};
pub use pool::{TypePool, ARRAY_WIDTH};
pub use replace::ReplaceError;
pub use resolve::{MethodRef, ResolveError};
