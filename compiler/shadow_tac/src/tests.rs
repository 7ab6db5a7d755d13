//! Builder tests: lower small checked ASTs and inspect the node sequence.

use shadow_ir::{
    Body, CatchClause, Expr, ExprArena, ExprId, ExprKind, FieldDecl, LitValue, MethodDecl,
    MethodKind, Modifiers, ModuleDecl, ModuleKind, Name, Span, Stmt, StmtId, StmtKind,
    StringInterner, TypeId,
};
use smallvec::smallvec;
use shadow_types::TypePool;

use crate::{build_module, BranchKind, NodeKind, TacMethod, TacModule};

struct Fixture {
    interner: StringInterner,
    pool: TypePool,
    arena: ExprArena,
    class: TypeId,
}

impl Fixture {
    fn new(class_name: &str) -> Self {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let name = interner.intern(class_name);
        let class = pool.new_class(name, name, Modifiers::PUBLIC, TypeId::OBJECT);
        Fixture {
            interner,
            pool,
            arena: ExprArena::new(),
            class,
        }
    }

    fn expr(&mut self, kind: ExprKind, ty: TypeId) -> ExprId {
        self.arena.alloc_expr(Expr {
            kind,
            ty,
            span: Span::DUMMY,
        })
    }

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.arena.alloc_stmt(Stmt {
            kind,
            span: Span::DUMMY,
        })
    }

    fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Literal(LitValue::Int(value)), TypeId::INT)
    }

    fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn build(mut self, fields: Vec<FieldDecl>, methods: Vec<MethodDecl>) -> TacModule {
        self.pool.freeze();
        let decl = ModuleDecl {
            ty: self.class,
            kind: ModuleKind::Class,
            fields,
            methods,
            arena: self.arena,
            span: Span::DUMMY,
        };
        build_module(&mut self.pool, &self.interner, &decl)
    }
}

/// Every run begins with a label and ends with a terminator, and phis sit
/// immediately after their labels.
fn assert_well_formed(method: &TacMethod) {
    let mut previous_was_terminator = true;
    let mut previous_was_label = false;
    for (id, node) in method.iter() {
        if previous_was_terminator {
            assert!(
                matches!(node.kind, NodeKind::Label),
                "run at {id:?} does not begin with a label: {:?}",
                node.kind
            );
        }
        if matches!(node.kind, NodeKind::Phi { .. }) {
            assert!(
                previous_was_label,
                "phi at {id:?} does not follow its label"
            );
        }
        previous_was_label = matches!(node.kind, NodeKind::Label);
        previous_was_terminator = node.kind.is_terminator();
    }
    assert!(
        previous_was_terminator,
        "method does not end with a terminator"
    );
}

#[test]
fn trivial_method_gets_entry_label_and_return() {
    let mut fx = Fixture::new("Five");
    let five = fx.int(5);
    let ret = fx.stmt(StmtKind::Return {
        values: smallvec![five],
    });
    let interner_probe = fx.name("five");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name: interner_probe,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![TypeId::INT],
            body: Some(Body(vec![ret])),
            span: Span::DUMMY,
        }],
    );

    // Synthesized create and destroy surround the declared method.
    assert_eq!(module.methods.len(), 3);
    let method = &module.methods[1];
    assert_well_formed(method);
    let kinds: Vec<&NodeKind> = method.iter().map(|(_, n)| &n.kind).collect();
    assert!(matches!(kinds[0], NodeKind::Label));
    assert!(matches!(kinds[1], NodeKind::Literal(LitValue::Int(5))));
    assert!(matches!(kinds[2], NodeKind::Return { .. }));
    // `this` is the implicit first parameter.
    assert_eq!(method.param_count, 1);
}

#[test]
fn if_without_else_merges_on_the_false_edge() {
    let mut fx = Fixture::new("Branchy");
    let cond = fx.expr(ExprKind::Literal(LitValue::Boolean(true)), TypeId::BOOLEAN);
    let body_expr = fx.int(1);
    let body_stmt = fx.stmt(StmtKind::Expr(body_expr));
    let if_stmt = fx.stmt(StmtKind::If {
        cond,
        then_body: Body(vec![body_stmt]),
        else_body: None,
    });
    let name = fx.name("maybe");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![if_stmt])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    let branch = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Branch(BranchKind::Conditional {
                true_target,
                false_target,
                ..
            }) => Some((*true_target, *false_target)),
            _ => None,
        })
        .expect("conditional branch");
    // Both targets are placed labels.
    assert!(matches!(method.node(branch.0).kind, NodeKind::Label));
    assert!(matches!(method.node(branch.1).kind, NodeKind::Label));
}

#[test]
fn while_loop_owns_break_and_continue_labels() {
    let mut fx = Fixture::new("Loopy");
    let cond = fx.expr(ExprKind::Literal(LitValue::Boolean(true)), TypeId::BOOLEAN);
    let brk = fx.stmt(StmtKind::Break);
    let while_stmt = fx.stmt(StmtKind::While {
        cond,
        body: Body(vec![brk]),
    });
    let name = fx.name("spin");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![while_stmt])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    // The break lowers to an unconditional branch onto the loop's end
    // label, which is also the conditional's false target.
    let false_target = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Branch(BranchKind::Conditional { false_target, .. }) => Some(*false_target),
            _ => None,
        })
        .expect("loop condition branch");
    let break_target = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Branch(BranchKind::Unconditional { target })
                if *target == false_target =>
            {
                Some(*target)
            }
            _ => None,
        })
        .expect("break branch to the loop end label");
    assert_eq!(break_target, false_target);
}

#[test]
fn short_circuit_and_lowers_to_branch_and_phi() {
    let mut fx = Fixture::new("Logic");
    let lhs = fx.expr(ExprKind::Literal(LitValue::Boolean(true)), TypeId::BOOLEAN);
    let rhs = fx.expr(ExprKind::Literal(LitValue::Boolean(false)), TypeId::BOOLEAN);
    let and = fx.expr(
        ExprKind::Binary {
            op: shadow_ir::BinaryOp::CondAnd,
            lhs,
            rhs,
        },
        TypeId::BOOLEAN,
    );
    let stmt = fx.stmt(StmtKind::Expr(and));
    let name = fx.name("both");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![stmt])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    let phi = method
        .iter()
        .find_map(|(id, n)| match &n.kind {
            NodeKind::Phi { incoming } => Some((id, incoming.clone())),
            _ => None,
        })
        .expect("short-circuit phi");
    assert_eq!(phi.1.len(), 2);
    // The shortcut value of `and` is the false literal.
    let (shortcut, _) = phi.1[0];
    assert!(matches!(
        method.node(shortcut).kind,
        NodeKind::Literal(LitValue::Boolean(false))
    ));
}

#[test]
fn reference_locals_balance_incref_and_decref() {
    let mut fx = Fixture::new("Holder");
    // String s = "hi"; return;  - one retain at the store, one release at
    // scope exit.
    let hello = {
        let name = fx.name("hi");
        fx.expr(ExprKind::Literal(LitValue::Str(name)), TypeId::STRING)
    };
    let s = fx.name("s");
    let local = fx.stmt(StmtKind::Local {
        name: s,
        ty: TypeId::STRING,
        modifiers: Modifiers::empty(),
        init: Some(hello),
    });
    let name = fx.name("hold");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![local])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    let incs = method
        .iter()
        .filter(|(_, n)| matches!(n.kind, NodeKind::IncRef { .. }))
        .count();
    let decs = method
        .iter()
        .filter(|(_, n)| matches!(n.kind, NodeKind::DecRef { .. }))
        .count();
    assert_eq!(incs, 1);
    assert_eq!(decs, 1);
}

#[test]
fn try_finally_break_routes_through_the_cleanup_phi() {
    let mut fx = Fixture::new("Cleanup");
    // while (true) { try { break; } finally { count = count + 1; } }
    let count = fx.name("count");
    let zero = fx.int(0);
    let decl_count = fx.stmt(StmtKind::Local {
        name: count,
        ty: TypeId::INT,
        modifiers: Modifiers::empty(),
        init: Some(zero),
    });

    let count_read = fx.expr(ExprKind::Var(count), TypeId::INT);
    let one = fx.int(1);
    let sum = fx.expr(
        ExprKind::Binary {
            op: shadow_ir::BinaryOp::Add,
            lhs: count_read,
            rhs: one,
        },
        TypeId::INT,
    );
    let count_target = fx.expr(ExprKind::Var(count), TypeId::INT);
    let bump = fx.stmt(StmtKind::Assign {
        target: count_target,
        value: sum,
    });

    let brk = fx.stmt(StmtKind::Break);
    let try_stmt = fx.stmt(StmtKind::Try {
        body: Body(vec![brk]),
        catches: Vec::new(),
        finally: Some(Body(vec![bump])),
    });
    let cond = fx.expr(ExprKind::Literal(LitValue::Boolean(true)), TypeId::BOOLEAN);
    let while_stmt = fx.stmt(StmtKind::While {
        cond,
        body: Body(vec![try_stmt]),
    });
    let name = fx.name("run");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![decl_count, while_stmt])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    // The loop's end label is the conditional's false target.
    let end_label = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Branch(BranchKind::Conditional { false_target, .. }) => Some(*false_target),
            _ => None,
        })
        .expect("loop condition branch");

    // The cleanup phi records the break's onward destination: the loop
    // end label.
    let phi = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Phi { incoming } => Some(incoming.clone()),
            _ => None,
        })
        .expect("cleanup phi");
    assert_eq!(phi.len(), 1);
    assert_eq!(phi[0].0, end_label);

    // The finally tail dispatches through the phi.
    assert!(method.iter().any(|(_, n)| matches!(
        n.kind,
        NodeKind::Branch(BranchKind::Indirect { .. })
    )));
}

#[test]
fn try_catch_emits_switch_and_typed_pads() {
    let mut fx = Fixture::new("Catcher");
    let exn_name = fx.name("e");
    let boom = fx.expr(
        ExprKind::NewObject {
            class: TypeId::EXCEPTION,
            ctor: 0,
            args: Vec::new(),
        },
        TypeId::EXCEPTION,
    );
    let throw_stmt = fx.stmt(StmtKind::Throw { value: boom });
    let catch_body = Body(Vec::new());
    let try_stmt = fx.stmt(StmtKind::Try {
        body: Body(vec![throw_stmt]),
        catches: vec![CatchClause {
            ty: TypeId::EXCEPTION,
            name: exn_name,
            body: catch_body,
            span: Span::DUMMY,
        }],
        finally: None,
    });
    let name = fx.name("guard");
    let module = fx.build(
        vec![],
        vec![MethodDecl {
            name,
            kind: MethodKind::Method,
            modifiers: Modifiers::PUBLIC,
            params: Vec::new(),
            returns: smallvec![],
            body: Some(Body(vec![try_stmt])),
            span: Span::DUMMY,
        }],
    );
    let method = &module.methods[1];
    assert_well_formed(method);

    let (pads, unwind) = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::CatchSwitch { pads, unwind } => Some((pads.clone(), *unwind)),
            _ => None,
        })
        .expect("catch switch");
    assert_eq!(pads.len(), 1);
    assert_eq!(unwind, None);

    // The throw unwinds into the catch switch, not out of the method.
    let throw_unwind = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::Throw { unwind, .. } => Some(*unwind),
            _ => None,
        })
        .expect("throw");
    assert!(throw_unwind.is_some());

    let pad_ty = method
        .iter()
        .find_map(|(_, n)| match &n.kind {
            NodeKind::CatchPad { exception_ty, .. } => Some(*exception_ty),
            _ => None,
        })
        .expect("catch pad");
    assert_eq!(pad_ty, TypeId::EXCEPTION);
}

#[test]
fn constructor_prologue_stores_field_initializers() {
    let mut fx = Fixture::new("Point");
    let x = fx.name("x");
    let init = fx.int(3);
    let module = fx.build(
        vec![FieldDecl {
            name: x,
            ty: TypeId::INT,
            modifiers: Modifiers::empty(),
            initializer: Some(init),
            span: Span::DUMMY,
        }],
        vec![],
    );

    // Synthesized create + destroy.
    assert_eq!(module.methods.len(), 2);
    let create = &module.methods[0];
    assert_eq!(create.kind, MethodKind::Constructor);
    assert_well_formed(create);
    assert!(create.iter().any(|(_, n)| matches!(
        n.kind,
        NodeKind::FieldRef { .. }
    )));
    assert!(create
        .iter()
        .any(|(_, n)| matches!(n.kind, NodeKind::Store { .. })));
}

#[test]
fn module_references_always_include_runtime_descriptors() {
    let fx = Fixture::new("Lone");
    let module = fx.build(vec![], vec![]);
    for required in [
        TypeId::OBJECT,
        TypeId::CLASS,
        TypeId::GENERIC_CLASS,
        TypeId::EXCEPTION,
        TypeId::ARRAY,
        TypeId::ARRAY_NULLABLE,
        TypeId::INT,
        TypeId::DOUBLE,
    ] {
        assert!(
            module.references.contains(&required),
            "{required:?} missing from module references"
        );
    }
}
