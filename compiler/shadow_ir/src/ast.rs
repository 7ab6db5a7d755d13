//! The checked AST.
//!
//! This is the interface surface between the external front-end (lexer,
//! parser, type checker) and the middle-end. Every expression arrives
//! annotated with its resolved [`TypeId`]; calls and allocations arrive with
//! their overload already selected. The TAC builder consumes this tree and
//! never resolves names itself.
//!
//! Expressions and statements are flattened into a per-module
//! [`ExprArena`]; nodes reference children by [`ExprId`]/[`StmtId`].

use smallvec::SmallVec;

use crate::{Modifiers, Name, Span, TypeId};

/// Index of an expression within its module's [`ExprArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a statement within its module's [`ExprArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct StmtId(u32);

impl StmtId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Literal value, stored without nesting.
///
/// Floats are stored as raw bits so the node stays `Eq + Hash`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LitValue {
    Boolean(bool),
    /// Signed integer literals (`byte` through `long`); the expression's
    /// `TypeId` carries the width.
    Int(i64),
    /// Unsigned integer literals (`ubyte` through `ulong`).
    UInt(u64),
    /// `float`/`double` bits; width again from the annotation.
    Float(u64),
    /// A `code` (Unicode scalar) literal.
    Code(u32),
    Str(Name),
    Null,
}

/// Binary operators. Short-circuiting `and`/`or` are distinct variants
/// because the builder lowers them to branches, not to a single node.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    CondAnd,
    CondOr,
}

impl BinaryOp {
    /// Operators whose result is `boolean` regardless of operand type.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::CondAnd | BinaryOp::CondOr)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean `!`.
    Not,
    /// Bitwise complement `~`.
    Complement,
}

/// An expression node: kind, resolved type, source span.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    /// Resolved by the front-end type checker. [`TypeId::UNKNOWN`] only
    /// after front-end error recovery, which the middle-end never sees.
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Literal(LitValue),
    /// A local variable or parameter, by name.
    Var(Name),
    This,
    /// Instance field access `object.name`.
    Field { object: ExprId, name: Name },
    /// Array element access; one index per dimension.
    Index {
        array: ExprId,
        indices: SmallVec<[ExprId; 2]>,
    },
    /// A method call with its overload resolved: `owner` is the static type
    /// the method was found on, `overload` the index into that type's
    /// overload list for `method`. `object` is `None` for calls on `this`
    /// and for constant (static-like) invocations.
    Call {
        object: Option<ExprId>,
        owner: TypeId,
        method: Name,
        overload: u32,
        args: Vec<ExprId>,
    },
    /// `Class:create(args)`; `ctor` indexes the overloads of `create`.
    NewObject {
        class: TypeId,
        ctor: u32,
        args: Vec<ExprId>,
    },
    /// Array allocation; the expression's annotation is the array type,
    /// `dims` holds one extent per dimension.
    NewArray { dims: SmallVec<[ExprId; 2]> },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary { op: UnaryOp, operand: ExprId },
    /// Explicit cast; the target type is the expression's annotation.
    Cast { operand: ExprId },
}

/// A statement node.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Ordered statements of one lexical block.
#[derive(Clone, Debug, Default)]
pub struct Body(pub Vec<StmtId>);

#[derive(Clone, Debug)]
pub struct CatchClause {
    /// Declared exception class; entry is filtered by subtype check.
    pub ty: TypeId,
    pub name: Name,
    pub body: Body,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Expr(ExprId),
    /// Local declaration, optionally initialized.
    Local {
        name: Name,
        ty: TypeId,
        modifiers: Modifiers,
        init: Option<ExprId>,
    },
    /// Assignment into a `Var`, `Field`, or `Index` target expression.
    Assign { target: ExprId, value: ExprId },
    If {
        cond: ExprId,
        then_body: Body,
        else_body: Option<Body>,
    },
    While { cond: ExprId, body: Body },
    Break,
    Continue,
    /// Multi-value return; empty for void methods.
    Return { values: SmallVec<[ExprId; 1]> },
    Throw { value: ExprId },
    Try {
        body: Body,
        catches: Vec<CatchClause>,
        finally: Option<Body>,
    },
    /// Bare nested scope.
    Scope(Body),
}

/// Flattened storage for one module's expressions and statements.
#[derive(Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }
}

/// Whether a module is a class or an interface.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ModuleKind {
    Class,
    Interface,
}

/// What kind of callable a [`MethodDecl`] is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MethodKind {
    Method,
    /// `create`.
    Constructor,
    /// `destroy`; excluded from unused-method accounting.
    Destructor,
    /// Synthesized deep-copy method; excluded from usage accounting.
    Copy,
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeId,
    pub modifiers: Modifiers,
    /// Initializer expression, folded into every constructor's prologue.
    pub initializer: Option<ExprId>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: Name,
    pub ty: TypeId,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub name: Name,
    pub kind: MethodKind,
    pub modifiers: Modifiers,
    pub params: Vec<ParamDecl>,
    pub returns: SmallVec<[TypeId; 1]>,
    /// `None` for interface methods and imports.
    pub body: Option<Body>,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_void(&self) -> bool {
        self.returns.is_empty()
    }
}

/// One compilation module: a top-level class or interface, its members, and
/// the arena their bodies live in.
pub struct ModuleDecl {
    /// The pool entry for the declared type.
    pub ty: TypeId,
    pub kind: ModuleKind,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub arena: ExprArena,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_hands_out_sequential_ids() {
        let mut arena = ExprArena::new();
        let a = arena.alloc_expr(Expr {
            kind: ExprKind::Literal(LitValue::Int(1)),
            ty: TypeId::INT,
            span: Span::DUMMY,
        });
        let b = arena.alloc_expr(Expr {
            kind: ExprKind::Literal(LitValue::Int(2)),
            ty: TypeId::INT,
            span: Span::DUMMY,
        });
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert!(matches!(
            arena.expr(b).kind,
            ExprKind::Literal(LitValue::Int(2))
        ));
    }

    #[test]
    fn comparison_ops_classified() {
        assert!(BinaryOp::Le.is_comparison());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(BinaryOp::CondOr.is_short_circuit());
    }
}
