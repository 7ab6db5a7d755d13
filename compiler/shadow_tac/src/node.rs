//! TAC nodes.
//!
//! Each method's code is a doubly linked sequence of typed nodes stored in
//! an arena; [`NodeId`] links replace owning pointers. Control flow is
//! fall-through except at terminators ([`NodeKind::is_terminator`]).
//! Labels are nodes; a branch target *is* the label's `NodeId`.

use shadow_ir::{BinaryOp, LitValue, Name, TypeId, UnaryOp};
use smallvec::SmallVec;
use shadow_types::MethodRef;

use crate::block::BlockId;

/// Index of a node within its method's arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a local slot within its method.
///
/// Parameters occupy the first slots (`this` first for instance methods).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct LocalId(u32);

impl LocalId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        LocalId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The three branch shapes.
#[derive(Clone, Debug)]
pub enum BranchKind {
    /// Fall to a single label.
    Unconditional { target: NodeId },
    /// Two-way on a boolean operand.
    Conditional {
        condition: NodeId,
        true_target: NodeId,
        false_target: NodeId,
    },
    /// Dispatch on a label-valued phi; used for the return edge out of a
    /// finally region.
    Indirect { phi: NodeId },
}

/// One TAC operation.
///
/// `Vec`-carrying variants keep their operand order; every `NodeId`
/// operand refers to an earlier node in the same method.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Jump target; identity is the node's own id.
    Label,
    Branch(BranchKind),
    /// `(value, predecessor label)` pairs. Sits immediately after its
    /// label.
    Phi {
        incoming: SmallVec<[(NodeId, NodeId); 2]>,
    },
    Literal(LitValue),
    /// Address of a local slot.
    VariableRef(LocalId),
    /// Address of an instance field.
    FieldRef { object: NodeId, field: Name },
    /// Address of an array element; one index per dimension.
    ArrayRef {
        array: NodeId,
        indices: SmallVec<[NodeId; 2]>,
    },
    /// A resolved method, for dispatch or direct call.
    MethodRef(MethodRef),
    /// Read through a `VariableRef`/`FieldRef`/`ArrayRef`.
    Load { source: NodeId },
    /// Write through a reference; `value` is the node producing the value.
    Store { target: NodeId, value: NodeId },
    Call {
        method: NodeId,
        args: Vec<NodeId>,
        /// Unwind destination when the call sits in a protected region;
        /// `None` lets the exception propagate to the caller.
        unwind: Option<NodeId>,
    },
    Return { values: SmallVec<[NodeId; 1]> },
    /// Convert `value` to the node's result type.
    Cast { value: NodeId },
    NewObject {
        class: TypeId,
        ctor: MethodRef,
        args: Vec<NodeId>,
        unwind: Option<NodeId>,
    },
    /// Array allocation; the node's type is the array type, `dims` the
    /// extent per dimension.
    NewArray {
        dims: SmallVec<[NodeId; 2]>,
        unwind: Option<NodeId>,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary { op: UnaryOp, operand: NodeId },
    Throw {
        exception: NodeId,
        unwind: Option<NodeId>,
    },
    /// Unwind entry of a `try`: filters into the catch handler labels in
    /// order, continuing to `unwind` when no pad matches.
    CatchSwitch {
        pads: SmallVec<[NodeId; 2]>,
        unwind: Option<NodeId>,
    },
    /// First node of a catch handler run: entered when the in-flight
    /// exception is a subtype of `exception_ty`. Produces the exception
    /// payload.
    CatchPad {
        exception_ty: TypeId,
        switch: NodeId,
    },
    /// Unwind entry of a finally region.
    CleanupPad,
    /// Continue unwinding out of the cleanup identified by `pad`.
    Resume { pad: NodeId },
    /// Itanium-style pad that materializes the exception payload at a
    /// catch handler.
    LandingPad,
    /// Runtime `__incrementRef` on an object reference.
    IncRef { value: NodeId },
    /// Runtime `__decrementRef` on an object reference.
    DecRef { value: NodeId },
    NoOp,
}

impl NodeKind {
    /// Nodes that end a straight-line run.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            NodeKind::Branch(_)
                | NodeKind::Return { .. }
                | NodeKind::Throw { .. }
                | NodeKind::Resume { .. }
                | NodeKind::CatchSwitch { .. }
        )
    }

    /// Direct successor labels of a terminator; unwind edges included.
    pub fn successors(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            NodeKind::Branch(BranchKind::Unconditional { target }) => {
                SmallVec::from_slice(&[*target])
            }
            NodeKind::Branch(BranchKind::Conditional {
                true_target,
                false_target,
                ..
            }) => SmallVec::from_slice(&[*true_target, *false_target]),
            // Successors of an indirect branch are resolved by the caller
            // from the phi's incoming destinations.
            NodeKind::Branch(BranchKind::Indirect { .. }) => SmallVec::new(),
            NodeKind::CatchSwitch { pads, unwind } => {
                let mut out: SmallVec<[NodeId; 4]> = pads.clone().into_iter().collect();
                if let Some(u) = unwind {
                    out.push(*u);
                }
                out
            }
            NodeKind::Throw { unwind, .. } => unwind.iter().copied().collect(),
            _ => SmallVec::new(),
        }
    }
}

/// One node in a method: kind, owning block, location, result type, and
/// its position in the doubly linked sequence.
#[derive(Clone, Debug)]
pub struct TacNode {
    pub kind: NodeKind,
    pub block: BlockId,
    pub span: shadow_ir::Span,
    /// Result type; [`TypeId::NONE`] for nodes that produce no value.
    pub ty: TypeId,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}
