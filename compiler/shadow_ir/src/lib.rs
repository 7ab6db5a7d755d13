//! Shadow IR - core data structures shared across the compiler.
//!
//! This crate contains the types every later phase agrees on:
//! - [`Span`] for source locations
//! - [`Name`] for interned identifiers, backed by [`StringInterner`]
//! - [`TypeId`] handles into the type pool (the pool itself lives in
//!   `shadow_types`; the handle lives here so the AST can be annotated
//!   without a dependency cycle)
//! - The checked AST ([`ast`]) that the external front-end hands to the
//!   TAC builder
//!
//! # Design Philosophy
//!
//! - **Intern everything**: strings become `Name(u32)`, types become
//!   `TypeId(u32)`
//! - **Flatten everything**: expressions and statements live in per-module
//!   arenas and reference each other by index, never by `Box`

pub mod ast;
mod interner;
mod modifiers;
mod name;
mod span;
mod type_id;

pub use ast::{
    BinaryOp, Body, CatchClause, Expr, ExprArena, ExprId, ExprKind, FieldDecl, LitValue,
    MethodDecl, MethodKind, ModuleDecl, ModuleKind, ParamDecl, Stmt, StmtId, StmtKind, UnaryOp,
};
pub use interner::StringInterner;
pub use modifiers::Modifiers;
pub use name::Name;
pub use span::Span;
pub use type_id::TypeId;
