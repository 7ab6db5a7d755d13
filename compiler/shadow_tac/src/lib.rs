//! Three-address-code IR for the Shadow compiler.
//!
//! This crate provides:
//!
//! - **TAC nodes** ([`NodeKind`], [`TacNode`]) — one operation per node,
//!   stored in a per-method arena and threaded into a doubly linked
//!   sequence; labels are nodes and branch targets are node ids
//! - **Blocks** ([`BlockArena`], [`LabelRole`]) — the nested lexical
//!   structure carrying break/continue/catch/cleanup labels and the
//!   cleanup phi; lookup walks parent links
//! - **Methods and modules** ([`TacMethod`], [`TacModule`]) — the
//!   containers later phases iterate
//! - **The builder** ([`build_module`]) — lowers a checked AST module,
//!   encoding the unwind paths and inserting reference-count operations
//!
//! # Invariants
//!
//! - every straight-line run begins with a `Label` and ends with a
//!   terminator
//! - a `Phi` sits immediately after its `Label`
//! - inside a cleanup-unwind region only `CleanupPad` terminators and
//!   their designated successors appear
//!
//! Blocks exist for the duration of the build; nodes keep a back-reference
//! to their block so the flow analyses and the emitter can consult labels
//! and cleanup flags afterwards.

mod block;
mod builder;
mod method;
mod node;

#[cfg(test)]
mod tests;

pub use block::{BlockArena, BlockFlags, BlockId, LabelAlreadySet, LabelRole};
pub use builder::{build_module, reference_closure};
pub use method::{Local, TacConstant, TacField, TacMethod, TacModule};
pub use node::{BranchKind, LocalId, NodeId, NodeKind, TacNode};
