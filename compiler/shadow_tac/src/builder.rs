//! AST to TAC lowering.
//!
//! One [`TacBuilder`] per module. The walk keeps three pieces of running
//! state: the current lexical block (for label lookup and unwind routing),
//! the label of the current straight-line run (phi predecessors), and the
//! scope stack (reference-counted locals to release on exit paths).
//!
//! # Exits through finallys
//!
//! Every `break`, `continue`, `return`, and normal try/catch exit that
//! crosses a finally routes through the cleanup chain innermost-first:
//! the exit registers its onward destination in each finally's cleanup
//! phi and branches to the cleanup label; the cleanup tail dispatches
//! through the phi. The unwind path enters via a cleanup pad, shares the
//! same cleanup code, and its phi destination is a run that resumes
//! unwinding.

use rustc_hash::FxHashSet;
use shadow_ir::{
    BinaryOp, Body, CatchClause, ExprId, ExprKind, LitValue, MethodDecl, MethodKind, Modifiers,
    ModuleDecl, ModuleKind, Name, Span, StmtId, StmtKind, StringInterner, TypeId,
};
use smallvec::{smallvec, SmallVec};
use shadow_types::{MethodRef, TypePool, TypeVariant};

use crate::block::{BlockFlags, BlockId, LabelRole};
use crate::method::{TacConstant, TacField, TacMethod, TacModule};
use crate::node::{BranchKind, LocalId, NodeId, NodeKind};

/// Lower a checked module to TAC.
///
/// The pool must already be frozen: lowering reads the type model and
/// interns structural types, but never mutates class entries.
pub fn build_module(
    pool: &mut TypePool,
    interner: &StringInterner,
    decl: &ModuleDecl,
) -> TacModule {
    tracing::debug!(ty = decl.ty.raw(), "building TAC module");

    let fields = decl
        .fields
        .iter()
        .map(|f| TacField {
            name: f.name,
            ty: f.ty,
            modifiers: f.modifiers,
            span: f.span,
        })
        .collect();
    let constants = collect_constants(decl);

    let mut methods = Vec::new();
    let mut has_constructor = false;
    let mut has_destructor = false;
    for method in &decl.methods {
        match method.kind {
            MethodKind::Constructor => has_constructor = true,
            MethodKind::Destructor => has_destructor = true,
            _ => {}
        }
        if method.body.is_some() || decl.kind == ModuleKind::Class {
            if let Some(lowered) = TacBuilder::new(pool, interner, decl).lower_method(method) {
                methods.push(lowered);
            }
        }
    }
    if decl.kind == ModuleKind::Class {
        if !has_constructor {
            methods.insert(0, synthesize_constructor(pool, interner, decl));
        }
        if !has_destructor {
            methods.push(synthesize_destructor(pool, interner, decl));
        }
    }

    TacModule {
        ty: decl.ty,
        references: reference_closure(pool, decl.ty),
        fields,
        constants,
        methods,
    }
}

/// Constant fields with literal initializers become module constants.
fn collect_constants(decl: &ModuleDecl) -> Vec<TacConstant> {
    let mut out = Vec::new();
    for field in &decl.fields {
        if !field.modifiers.is_constant() {
            continue;
        }
        if let Some(init) = field.initializer {
            if let ExprKind::Literal(value) = decl.arena.expr(init).kind {
                out.push(TacConstant {
                    name: field.name,
                    value,
                    ty: field.ty,
                });
            }
        }
    }
    out
}

/// Transitive reference closure of `ty`: extends, interfaces, inner and
/// outer types, field types, and method signature types, plus the
/// primitives and the runtime descriptor classes the emitter always needs.
pub fn reference_closure(pool: &TypePool, ty: TypeId) -> Vec<TypeId> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    let mut frontier = vec![ty];

    let always = [
        TypeId::OBJECT,
        TypeId::CLASS,
        TypeId::GENERIC_CLASS,
        TypeId::STRING,
        TypeId::EXCEPTION,
        TypeId::ARRAY,
        TypeId::ARRAY_NULLABLE,
    ];
    frontier.extend(always);
    for raw in 0..=TypeId::DOUBLE.raw() {
        frontier.push(TypeId::from_raw(raw));
    }

    while let Some(current) = frontier.pop() {
        if current.is_none() || !seen.insert(current) {
            continue;
        }
        out.push(current);
        let entry = pool.entry(current);
        match &entry.variant {
            TypeVariant::Class { extends } => frontier.push(*extends),
            TypeVariant::Array { base, .. } => frontier.push(*base),
            TypeVariant::Sequence { elements } => frontier.extend(elements.iter().copied()),
            TypeVariant::Method {
                params, returns, ..
            } => {
                frontier.extend(params.iter().copied());
                frontier.extend(returns.iter().copied());
            }
            _ => {}
        }
        frontier.push(entry.outer);
        frontier.extend(entry.interfaces.iter().copied());
        frontier.extend(entry.inners.iter().copied());
        frontier.extend(entry.type_args.iter().copied());
        for field in &entry.fields {
            frontier.push(field.ty);
        }
        for (_, overloads) in &entry.methods {
            frontier.extend(overloads.iter().copied());
        }
    }
    out.sort_by_key(|t| t.raw());
    out
}

/// One lexical scope: the block it belongs to and the reference-owning
/// locals declared in it, in declaration order.
struct Scope {
    block: BlockId,
    owned_refs: Vec<LocalId>,
}

struct TacBuilder<'a> {
    pool: &'a mut TypePool,
    interner: &'a StringInterner,
    decl: &'a ModuleDecl,
    method: TacMethod,
    scopes: Vec<Scope>,
    current_block: BlockId,
    /// Label of the current straight-line run.
    current_label: NodeId,
    /// The current run ended with a terminator; subsequent statements
    /// start a fresh (unreachable) run.
    terminated: bool,
    span: Span,
}

impl<'a> TacBuilder<'a> {
    fn new(pool: &'a mut TypePool, interner: &'a StringInterner, decl: &'a ModuleDecl) -> Self {
        let method = TacMethod::new(
            Name::EMPTY,
            TypeId::NONE,
            MethodKind::Method,
            Modifiers::empty(),
        );
        let entry = method.entry;
        TacBuilder {
            pool,
            interner,
            decl,
            method,
            scopes: Vec::new(),
            current_block: BlockId::from_raw(0),
            current_label: entry,
            terminated: false,
            span: Span::DUMMY,
        }
    }

    fn lower_method(mut self, decl: &MethodDecl) -> Option<TacMethod> {
        let body = decl.body.as_ref()?;

        self.method.name = decl.name;
        self.method.kind = decl.kind;
        self.method.modifiers = decl.modifiers;
        self.method.signature = self.signature_of(decl);
        self.method.span = decl.span;
        self.span = decl.span;

        // `this` first, then declared parameters.
        self.method.add_local(
            self.interner.intern("this"),
            self.decl.ty,
            Modifiers::empty(),
            true,
        );
        for param in &decl.params {
            self.method
                .add_local(param.name, param.ty, param.modifiers, true);
        }

        self.scopes.push(Scope {
            block: self.current_block,
            owned_refs: Vec::new(),
        });

        if decl.kind == MethodKind::Constructor {
            self.emit_field_initializers();
        }

        self.lower_body(body);

        if !self.terminated {
            // Destructors release their fields after the user code ran.
            if decl.kind == MethodKind::Destructor {
                self.emit_field_releases();
            }
            self.release_scopes(0);
            self.emit(NodeKind::Return { values: smallvec![] }, TypeId::NONE);
        }
        self.scopes.pop();
        Some(self.method)
    }

    fn signature_of(&mut self, decl: &MethodDecl) -> TypeId {
        let params: Vec<TypeId> = decl.params.iter().map(|p| p.ty).collect();
        let returns: Vec<TypeId> = decl.returns.iter().copied().collect();
        self.pool.method_type(
            self.decl.ty,
            decl.name,
            params,
            returns,
            decl.kind,
            decl.modifiers,
        )
    }

    // === Emission primitives ===

    fn emit(&mut self, kind: NodeKind, ty: TypeId) -> NodeId {
        if kind.is_terminator() {
            self.terminated = true;
        }
        self.method.append(kind, self.current_block, self.span, ty)
    }

    fn detached_label(&mut self) -> NodeId {
        self.method.new_detached(NodeKind::Label, TypeId::NONE)
    }

    /// Place a pending label and begin a new run there.
    fn start_run(&mut self, label: NodeId, block: BlockId) {
        let span = self.span;
        self.method.place(label, block, span);
        self.current_block = block;
        self.current_label = label;
        self.terminated = false;
    }

    fn branch_to(&mut self, target: NodeId) {
        self.emit(
            NodeKind::Branch(BranchKind::Unconditional { target }),
            TypeId::NONE,
        );
    }

    // === Scopes and reference counting ===

    fn push_scope(&mut self, block: BlockId) {
        self.scopes.push(Scope {
            block,
            owned_refs: Vec::new(),
        });
    }

    /// Release the innermost scope's owned references (without popping);
    /// used on each normal exit edge.
    fn release_scope(&mut self, scope_index: usize) {
        let owned: Vec<LocalId> = self.scopes[scope_index].owned_refs.clone();
        for local in owned.into_iter().rev() {
            self.release_local(local);
        }
    }

    /// Release every owned local from the innermost scope down to
    /// `down_to` (inclusive); used by return and unwinding exits.
    fn release_scopes(&mut self, down_to: usize) {
        for index in (down_to..self.scopes.len()).rev() {
            self.release_scope(index);
        }
    }

    fn release_local(&mut self, local: LocalId) {
        let ty = self.method.local(local).ty;
        let var = self.emit(NodeKind::VariableRef(local), ty);
        let value = self.emit(NodeKind::Load { source: var }, ty);
        self.emit(NodeKind::DecRef { value }, TypeId::NONE);
    }

    fn is_ref_type(&self, ty: TypeId) -> bool {
        !ty.is_none() && self.pool.entry(ty).is_reference()
    }

    /// Store `value` into the slot behind `target`, maintaining counts:
    /// owned targets release the old value and retain the new one.
    fn store_owned(&mut self, target: NodeId, value: NodeId, ty: TypeId, had_value: bool) {
        if self.is_ref_type(ty) {
            if had_value {
                let old = self.emit(NodeKind::Load { source: target }, ty);
                self.emit(NodeKind::DecRef { value: old }, TypeId::NONE);
            }
            self.emit(NodeKind::IncRef { value }, TypeId::NONE);
        }
        self.emit(NodeKind::Store { target, value }, TypeId::NONE);
    }

    // === Statements ===

    fn lower_body(&mut self, body: &Body) {
        for &stmt in &body.0 {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, id: StmtId) {
        let stmt = self.decl.arena.stmt(id).clone();
        self.span = stmt.span;
        if self.terminated {
            // Start an unreachable run so dead code still lowers; the flow
            // analysis reports it.
            let label = self.detached_label();
            let block = self.current_block;
            self.start_run(label, block);
        }
        match stmt.kind {
            StmtKind::Expr(expr) => {
                self.lower_expr(expr);
            }
            StmtKind::Local {
                name,
                ty,
                modifiers,
                init,
            } => self.lower_local(name, ty, modifiers, init),
            StmtKind::Assign { target, value } => self.lower_assign(target, value),
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => self.lower_if(cond, &then_body, else_body.as_ref()),
            StmtKind::While { cond, body } => self.lower_while(cond, &body),
            StmtKind::Break => self.lower_break(),
            StmtKind::Continue => self.lower_continue(),
            StmtKind::Return { values } => self.lower_return(&values),
            StmtKind::Throw { value } => self.lower_throw(value),
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.lower_try(&body, &catches, finally.as_ref()),
            StmtKind::Scope(body) => {
                let block = self.method.blocks.push_block(Some(self.current_block));
                let outer = self.current_block;
                self.current_block = block;
                self.push_scope(block);
                self.lower_body(&body);
                if !self.terminated {
                    self.release_scope(self.scopes.len() - 1);
                }
                self.scopes.pop();
                self.current_block = outer;
            }
        }
    }

    fn lower_local(&mut self, name: Name, ty: TypeId, modifiers: Modifiers, init: Option<ExprId>) {
        let local = self.method.add_local(name, ty, modifiers, false);
        // Reference slots are null-initialized by the emitter, so the
        // declaring scope owns them from here on and the release at scope
        // exit is balanced whether or not an initializer ran.
        if self.is_ref_type(ty) {
            self.scopes
                .last_mut()
                .unwrap_or_else(|| panic!("local outside any scope"))
                .owned_refs
                .push(local);
        }
        if let Some(init) = init {
            let value = self.lower_expr(init);
            let var = self.emit(NodeKind::VariableRef(local), ty);
            self.store_owned(var, value, ty, false);
        }
    }

    fn lower_assign(&mut self, target: ExprId, value: ExprId) {
        let ty = self.decl.arena.expr(target).ty;
        let value_node = self.lower_expr(value);
        let target_node = self.lower_lvalue(target);
        self.store_owned(target_node, value_node, ty, true);
    }

    fn lower_if(&mut self, cond: ExprId, then_body: &Body, else_body: Option<&Body>) {
        let cond_node = self.lower_expr(cond);
        let then_label = self.detached_label();
        let merge_label = self.detached_label();
        let else_label = if else_body.is_some() {
            self.detached_label()
        } else {
            merge_label
        };
        self.emit(
            NodeKind::Branch(BranchKind::Conditional {
                condition: cond_node,
                true_target: then_label,
                false_target: else_label,
            }),
            TypeId::NONE,
        );

        let outer = self.current_block;
        let then_block = self.method.blocks.push_block(Some(outer));
        self.start_run(then_label, then_block);
        self.push_scope(then_block);
        self.lower_body(then_body);
        let mut merge_reached = false;
        if !self.terminated {
            self.release_scope(self.scopes.len() - 1);
            self.branch_to(merge_label);
            merge_reached = true;
        }
        self.scopes.pop();

        match else_body {
            Some(else_body) => {
                let else_block = self.method.blocks.push_block(Some(outer));
                self.start_run(else_label, else_block);
                self.push_scope(else_block);
                self.lower_body(else_body);
                if !self.terminated {
                    self.release_scope(self.scopes.len() - 1);
                    self.branch_to(merge_label);
                    merge_reached = true;
                }
                self.scopes.pop();
            }
            // No else arm: the false edge of the branch lands on merge.
            None => merge_reached = true,
        }

        if merge_reached {
            self.start_run(merge_label, outer);
        }
        // Both arms terminated: anything after the `if` is unreachable and
        // lowers into fresh runs that the flow analysis reports.
    }

    fn lower_while(&mut self, cond: ExprId, body: &Body) {
        let outer = self.current_block;
        let loop_block = self.method.blocks.push_block(Some(outer));
        let cond_label = self.detached_label();
        let body_label = self.detached_label();
        let end_label = self.detached_label();
        self.method
            .blocks
            .set_label(loop_block, LabelRole::Continue, cond_label)
            .unwrap_or_else(|e| panic!("continue label claimed twice: {e:?}"));
        self.method
            .blocks
            .set_label(loop_block, LabelRole::Break, end_label)
            .unwrap_or_else(|e| panic!("break label claimed twice: {e:?}"));

        self.branch_to(cond_label);
        self.start_run(cond_label, loop_block);
        let cond_node = self.lower_expr(cond);
        self.emit(
            NodeKind::Branch(BranchKind::Conditional {
                condition: cond_node,
                true_target: body_label,
                false_target: end_label,
            }),
            TypeId::NONE,
        );

        let body_block = self.method.blocks.push_block(Some(loop_block));
        self.start_run(body_label, body_block);
        self.push_scope(body_block);
        self.lower_body(body);
        if !self.terminated {
            self.release_scope(self.scopes.len() - 1);
            self.branch_to(cond_label);
        }
        self.scopes.pop();

        self.start_run(end_label, outer);
    }

    /// Release every scope a jump out to `target_block`'s label leaves:
    /// the scopes whose block sits at or below `target_block`.
    fn release_exited_scopes(&mut self, target_block: BlockId) {
        let exited: Vec<usize> = self
            .scopes
            .iter()
            .enumerate()
            .filter(|(_, scope)| self.block_is_within(scope.block, target_block))
            .map(|(index, _)| index)
            .collect();
        for index in exited.into_iter().rev() {
            self.release_scope(index);
        }
    }

    fn block_is_within(&self, block: BlockId, ancestor: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(b) = current {
            if b == ancestor {
                return true;
            }
            current = self.method.blocks.parent(b);
        }
        false
    }

    /// Branch to `final_dest`, running every finally between the current
    /// block and `stop` (exclusive), innermost first.
    fn route_through_cleanups(&mut self, stop: Option<BlockId>, final_dest: NodeId) {
        let chain = self.method.blocks.cleanups_between(self.current_block, stop);
        if chain.is_empty() {
            self.branch_to(final_dest);
            return;
        }
        for (index, &cleanup_block) in chain.iter().enumerate() {
            let cleanup_label = self
                .method
                .blocks
                .own_label(cleanup_block, LabelRole::Cleanup)
                .unwrap_or_else(|| panic!("cleanup chain block without cleanup label"));
            let phi = self
                .method
                .blocks
                .cleanup_phi(cleanup_block)
                .unwrap_or_else(|| panic!("cleanup block without phi"));
            let next_dest = if index + 1 < chain.len() {
                self.detached_label()
            } else {
                final_dest
            };
            self.method
                .phi_add_incoming(phi, next_dest, self.current_label);
            self.branch_to(cleanup_label);
            if index + 1 < chain.len() {
                // The stub run that forwards to the next finally out.
                let parent = self.method.blocks.parent(cleanup_block).unwrap_or(cleanup_block);
                self.start_run(next_dest, parent);
            }
        }
    }

    fn lower_break(&mut self) {
        let Some((target_block, label)) = self
            .method
            .blocks
            .find_label(self.current_block, LabelRole::Break)
        else {
            panic!("break outside a loop survived checking");
        };
        self.release_exited_scopes(target_block);
        self.route_through_cleanups(Some(target_block), label);
    }

    fn lower_continue(&mut self) {
        let Some((target_block, label)) = self
            .method
            .blocks
            .find_label(self.current_block, LabelRole::Continue)
        else {
            panic!("continue outside a loop survived checking");
        };
        self.release_exited_scopes(target_block);
        self.route_through_cleanups(Some(target_block), label);
    }

    fn lower_return(&mut self, values: &SmallVec<[ExprId; 1]>) {
        let value_nodes: SmallVec<[NodeId; 1]> =
            values.iter().map(|&v| self.lower_expr(v)).collect();
        // Returned references survive the method; retain them before the
        // scope releases run.
        for &node in &value_nodes {
            let ty = self.method.node(node).ty;
            if self.is_ref_type(ty) {
                self.emit(NodeKind::IncRef { value: node }, TypeId::NONE);
            }
        }
        self.release_scopes(0);

        if self.method.blocks.cleanups_between(self.current_block, None).is_empty() {
            self.emit(NodeKind::Return { values: value_nodes }, TypeId::NONE);
        } else {
            let return_label = self.detached_label();
            self.route_through_cleanups(None, return_label);
            self.start_run(return_label, BlockId::from_raw(0));
            self.emit(NodeKind::Return { values: value_nodes }, TypeId::NONE);
        }
    }

    fn lower_throw(&mut self, value: ExprId) {
        let exception = self.lower_expr(value);
        let unwind = self.method.blocks.add_unwind_source(self.current_block);
        self.emit(NodeKind::Throw { exception, unwind }, TypeId::NONE);
    }

    fn lower_try(&mut self, body: &Body, catches: &[CatchClause], finally: Option<&Body>) {
        // A try with neither catches nor finally protects nothing.
        if catches.is_empty() && finally.is_none() {
            self.lower_body(body);
            return;
        }

        let parent = self.current_block;
        let done_label = self.detached_label();

        // Outer block owns the finally machinery, inner block the catch
        // switch; catch handlers hang off the outer block so exceptions
        // they throw unwind into the finally, not back into the switch.
        let fin_owner = if finally.is_some() {
            let b = self.method.blocks.push_block(Some(parent));
            let cleanup_label = self.detached_label();
            let cleanup_unwind_label = self.detached_label();
            let phi = self.method.new_detached(
                NodeKind::Phi {
                    incoming: smallvec![],
                },
                TypeId::NONE,
            );
            self.method
                .blocks
                .set_label(b, LabelRole::Cleanup, cleanup_label)
                .unwrap_or_else(|e| panic!("cleanup label claimed twice: {e:?}"));
            self.method
                .blocks
                .set_label(b, LabelRole::CleanupUnwind, cleanup_unwind_label)
                .unwrap_or_else(|e| panic!("cleanup-unwind label claimed twice: {e:?}"));
            self.method.blocks.set_cleanup_phi(b, phi);
            Some(b)
        } else {
            None
        };
        let try_outer = fin_owner.unwrap_or(parent);

        let catch_owner = if catches.is_empty() {
            None
        } else {
            let b = self.method.blocks.push_block(Some(try_outer));
            let switch_label = self.detached_label();
            self.method
                .blocks
                .set_label(b, LabelRole::CatchSwitch, switch_label)
                .unwrap_or_else(|e| panic!("catch-switch label claimed twice: {e:?}"));
            Some(b)
        };
        let body_parent = catch_owner.unwrap_or(try_outer);

        self.method
            .blocks
            .set_label(body_parent, LabelRole::Done, done_label)
            .unwrap_or_else(|e| panic!("done label claimed twice: {e:?}"));

        // -- protected body --
        let mut reaches_done = false;
        let body_block = self.method.blocks.push_block(Some(body_parent));
        let body_label = self.detached_label();
        self.branch_to(body_label);
        self.start_run(body_label, body_block);
        self.push_scope(body_block);
        self.lower_body(body);
        if !self.terminated {
            self.release_scope(self.scopes.len() - 1);
            self.route_through_cleanups(Some(parent), done_label);
            reaches_done = true;
        }
        self.scopes.pop();

        // -- catch switch and handlers --
        if let Some(catch_block) = catch_owner {
            let switch_label = self
                .method
                .blocks
                .own_label(catch_block, LabelRole::CatchSwitch)
                .unwrap_or_else(|| panic!("catch owner lost its switch label"));
            self.start_run(switch_label, catch_block);

            let handler_labels: SmallVec<[NodeId; 2]> =
                catches.iter().map(|_| self.detached_label()).collect();
            // No pad taken: continue into this try's finally, or whatever
            // handler encloses the try.
            let outer_unwind = match fin_owner {
                Some(b) => self.method.blocks.own_label(b, LabelRole::CleanupUnwind),
                None => self
                    .method
                    .blocks
                    .parent(catch_block)
                    .and_then(|p| self.method.blocks.add_unwind_source(p)),
            };
            let switch_node = self.emit(
                NodeKind::CatchSwitch {
                    pads: handler_labels.clone(),
                    unwind: outer_unwind,
                },
                TypeId::NONE,
            );
            if let Some(&first) = handler_labels.first() {
                self.method
                    .blocks
                    .set_label(catch_block, LabelRole::Catch, first)
                    .unwrap_or_else(|e| panic!("catch label claimed twice: {e:?}"));
            }

            for (clause, &handler_label) in catches.iter().zip(handler_labels.iter()) {
                let handler_block = self.method.blocks.push_block(Some(try_outer));
                self.start_run(handler_label, handler_block);
                self.push_scope(handler_block);
                self.span = clause.span;

                let pad = self.emit(
                    NodeKind::CatchPad {
                        exception_ty: clause.ty,
                        switch: switch_node,
                    },
                    clause.ty,
                );
                let local = self
                    .method
                    .add_local(clause.name, clause.ty, Modifiers::empty(), false);
                let var = self.emit(NodeKind::VariableRef(local), clause.ty);
                // The runtime hands over an owned payload; no extra retain.
                self.emit(NodeKind::Store { target: var, value: pad }, TypeId::NONE);
                self.scopes
                    .last_mut()
                    .unwrap_or_else(|| panic!("catch handler outside any scope"))
                    .owned_refs
                    .push(local);

                self.lower_body(&clause.body);
                if !self.terminated {
                    self.release_scope(self.scopes.len() - 1);
                    self.route_through_cleanups(Some(parent), done_label);
                    reaches_done = true;
                }
                self.scopes.pop();
            }
        }

        // -- finally --
        if let (Some(fin_block), Some(fin_body)) = (fin_owner, finally) {
            let cleanup_label = self
                .method
                .blocks
                .own_label(fin_block, LabelRole::Cleanup)
                .unwrap_or_else(|| panic!("finally owner lost its cleanup label"));
            let cleanup_unwind_label = self
                .method
                .blocks
                .own_label(fin_block, LabelRole::CleanupUnwind)
                .unwrap_or_else(|| panic!("finally owner lost its cleanup-unwind label"));
            let phi = self
                .method
                .blocks
                .cleanup_phi(fin_block)
                .unwrap_or_else(|| panic!("finally owner lost its phi"));

            let code_block = self.method.blocks.push_block(Some(fin_block));
            self.method
                .blocks
                .add_flags(code_block, BlockFlags::CLEANUP_TARGET);

            // Unwind entry: pad, then share the normal cleanup code; the
            // phi sends the unwind path on to a resume run.
            if self
                .method
                .blocks
                .flags(fin_block)
                .contains(BlockFlags::UNWIND_TARGET)
            {
                let resume_label = self.detached_label();
                self.start_run(cleanup_unwind_label, code_block);
                let pad = self.emit(NodeKind::CleanupPad, TypeId::NONE);
                self.method
                    .phi_add_incoming(phi, resume_label, cleanup_unwind_label);
                self.branch_to(cleanup_label);

                self.start_run(resume_label, code_block);
                self.emit(NodeKind::Resume { pad }, TypeId::NONE);
            }

            // Normal entry: label, phi, shared cleanup code, dispatch.
            self.start_run(cleanup_label, code_block);
            let span = self.span;
            self.method.place(phi, code_block, span);
            self.push_scope(code_block);
            self.lower_body(fin_body);
            if !self.terminated {
                self.release_scope(self.scopes.len() - 1);
                self.emit(
                    NodeKind::Branch(BranchKind::Indirect { phi }),
                    TypeId::NONE,
                );
            }
            self.scopes.pop();
        }

        if reaches_done {
            self.start_run(done_label, parent);
        } else {
            self.current_block = parent;
            self.terminated = true;
        }
    }

    // === Expressions ===

    fn lower_expr(&mut self, id: ExprId) -> NodeId {
        let expr = self.decl.arena.expr(id).clone();
        let ty = expr.ty;
        self.span = expr.span;
        match expr.kind {
            ExprKind::Literal(value) => self.emit(NodeKind::Literal(value), ty),
            ExprKind::Var(name) => {
                let local = self
                    .method
                    .local_by_name(name)
                    .unwrap_or_else(|| panic!("unresolved local survived checking"));
                let var = self.emit(NodeKind::VariableRef(local), ty);
                self.emit(NodeKind::Load { source: var }, ty)
            }
            ExprKind::This => {
                let var = self.emit(NodeKind::VariableRef(LocalId::from_raw(0)), ty);
                self.emit(NodeKind::Load { source: var }, ty)
            }
            ExprKind::Field { object, name } => {
                let object = self.lower_expr(object);
                let field_ref = self.emit(NodeKind::FieldRef { object, field: name }, ty);
                self.emit(NodeKind::Load { source: field_ref }, ty)
            }
            ExprKind::Index { array, indices } => {
                let array = self.lower_expr(array);
                let index_nodes: SmallVec<[NodeId; 2]> =
                    indices.iter().map(|&i| self.lower_expr(i)).collect();
                let element = self.emit(
                    NodeKind::ArrayRef {
                        array,
                        indices: index_nodes,
                    },
                    ty,
                );
                self.emit(NodeKind::Load { source: element }, ty)
            }
            ExprKind::Call {
                object,
                owner,
                method,
                overload,
                args,
            } => self.lower_call(ty, object, owner, method, overload, &args),
            ExprKind::NewObject { class, ctor, args } => {
                let arg_nodes: Vec<NodeId> = args.iter().map(|&a| self.lower_expr(a)).collect();
                let ctor_name = self.interner.intern("create");
                let signature = self
                    .pool
                    .entry(class)
                    .overloads(ctor_name)
                    .and_then(|list| list.get(ctor as usize).copied())
                    .unwrap_or(TypeId::NONE);
                let unwind = self.method.blocks.add_unwind_source(self.current_block);
                self.emit(
                    NodeKind::NewObject {
                        class,
                        ctor: MethodRef {
                            owner: class,
                            signature,
                            overload: ctor,
                        },
                        args: arg_nodes,
                        unwind,
                    },
                    ty,
                )
            }
            ExprKind::NewArray { dims } => {
                let dim_nodes: SmallVec<[NodeId; 2]> =
                    dims.iter().map(|&d| self.lower_expr(d)).collect();
                let unwind = self.method.blocks.add_unwind_source(self.current_block);
                self.emit(
                    NodeKind::NewArray {
                        dims: dim_nodes,
                        unwind,
                    },
                    ty,
                )
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                self.lower_short_circuit(op, lhs, rhs)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.lower_expr(lhs);
                let right = self.lower_expr(rhs);
                self.emit(NodeKind::Binary { op, left, right }, ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                self.emit(NodeKind::Unary { op, operand }, ty)
            }
            ExprKind::Cast { operand } => {
                let value = self.lower_expr(operand);
                self.emit(NodeKind::Cast { value }, ty)
            }
        }
    }

    /// Lower an assignment target to a reference node.
    fn lower_lvalue(&mut self, id: ExprId) -> NodeId {
        let expr = self.decl.arena.expr(id).clone();
        let ty = expr.ty;
        match expr.kind {
            ExprKind::Var(name) => {
                let local = self
                    .method
                    .local_by_name(name)
                    .unwrap_or_else(|| panic!("unresolved local survived checking"));
                self.emit(NodeKind::VariableRef(local), ty)
            }
            ExprKind::Field { object, name } => {
                let object = self.lower_expr(object);
                self.emit(NodeKind::FieldRef { object, field: name }, ty)
            }
            ExprKind::Index { array, indices } => {
                let array = self.lower_expr(array);
                let index_nodes: SmallVec<[NodeId; 2]> =
                    indices.iter().map(|&i| self.lower_expr(i)).collect();
                self.emit(
                    NodeKind::ArrayRef {
                        array,
                        indices: index_nodes,
                    },
                    ty,
                )
            }
            other => panic!("assignment target {other:?} survived checking"),
        }
    }

    fn lower_call(
        &mut self,
        result_ty: TypeId,
        object: Option<ExprId>,
        owner: TypeId,
        method: Name,
        overload: u32,
        args: &[ExprId],
    ) -> NodeId {
        // Receiver first, then declared arguments.
        let mut arg_nodes = Vec::with_capacity(args.len() + 1);
        match object {
            Some(obj) => arg_nodes.push(self.lower_expr(obj)),
            None => {
                let this_ty = self.decl.ty;
                let var = self.emit(NodeKind::VariableRef(LocalId::from_raw(0)), this_ty);
                arg_nodes.push(self.emit(NodeKind::Load { source: var }, this_ty));
            }
        }
        for &arg in args {
            arg_nodes.push(self.lower_expr(arg));
        }

        let signature = self
            .pool
            .entry(owner)
            .overloads(method)
            .and_then(|list| list.get(overload as usize).copied())
            .unwrap_or_else(|| panic!("unresolved overload survived checking"));
        let method_node = self.emit(
            NodeKind::MethodRef(MethodRef {
                owner,
                signature,
                overload,
            }),
            signature,
        );
        let unwind = self.method.blocks.add_unwind_source(self.current_block);
        self.emit(
            NodeKind::Call {
                method: method_node,
                args: arg_nodes,
                unwind,
            },
            result_ty,
        )
    }

    fn lower_short_circuit(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> NodeId {
        let lhs_node = self.lower_expr(lhs);
        let shortcut_value = self.emit(
            NodeKind::Literal(LitValue::Boolean(op == BinaryOp::CondOr)),
            TypeId::BOOLEAN,
        );
        let shortcut_label = self.current_label;
        let rhs_label = self.detached_label();
        let merge_label = self.detached_label();
        let (true_target, false_target) = if op == BinaryOp::CondAnd {
            (rhs_label, merge_label)
        } else {
            (merge_label, rhs_label)
        };
        self.emit(
            NodeKind::Branch(BranchKind::Conditional {
                condition: lhs_node,
                true_target,
                false_target,
            }),
            TypeId::NONE,
        );

        let block = self.current_block;
        self.start_run(rhs_label, block);
        let rhs_node = self.lower_expr(rhs);
        let rhs_end_label = self.current_label;
        self.branch_to(merge_label);

        self.start_run(merge_label, block);
        self.emit(
            NodeKind::Phi {
                incoming: smallvec![
                    (shortcut_value, shortcut_label),
                    (rhs_node, rhs_end_label)
                ],
            },
            TypeId::BOOLEAN,
        )
    }

    // === Synthesized prologues ===

    /// Constructor prologue: run each declared field initializer and store
    /// the result into `this`.
    fn emit_field_initializers(&mut self) {
        let this_ty = self.decl.ty;
        for field in &self.decl.fields {
            let Some(init) = field.initializer else {
                continue;
            };
            if field.modifiers.is_constant() {
                continue;
            }
            let value = self.lower_expr(init);
            let var = self.emit(NodeKind::VariableRef(LocalId::from_raw(0)), this_ty);
            let this_node = self.emit(NodeKind::Load { source: var }, this_ty);
            let field_ref = self.emit(
                NodeKind::FieldRef {
                    object: this_node,
                    field: field.name,
                },
                field.ty,
            );
            self.store_owned(field_ref, value, field.ty, false);
        }
    }

    /// Destructor prologue: release every reference field.
    fn emit_field_releases(&mut self) {
        let this_ty = self.decl.ty;
        for field in &self.decl.fields {
            if !self.is_ref_type(field.ty) {
                continue;
            }
            let var = self.emit(NodeKind::VariableRef(LocalId::from_raw(0)), this_ty);
            let this_node = self.emit(NodeKind::Load { source: var }, this_ty);
            let field_ref = self.emit(
                NodeKind::FieldRef {
                    object: this_node,
                    field: field.name,
                },
                field.ty,
            );
            let value = self.emit(NodeKind::Load { source: field_ref }, field.ty);
            self.emit(NodeKind::DecRef { value }, TypeId::NONE);
        }
    }
}

/// Default `create`: field initializers only.
fn synthesize_constructor(
    pool: &mut TypePool,
    interner: &StringInterner,
    decl: &ModuleDecl,
) -> TacMethod {
    let synthetic = MethodDecl {
        name: interner.intern("create"),
        kind: MethodKind::Constructor,
        modifiers: Modifiers::PUBLIC,
        params: Vec::new(),
        returns: smallvec![],
        body: Some(Body::default()),
        span: decl.span,
    };
    TacBuilder::new(pool, interner, decl)
        .lower_method(&synthetic)
        .unwrap_or_else(|| panic!("synthesized constructor has a body"))
}

/// Default `destroy`: release reference fields.
fn synthesize_destructor(
    pool: &mut TypePool,
    interner: &StringInterner,
    decl: &ModuleDecl,
) -> TacMethod {
    let synthetic = MethodDecl {
        name: interner.intern("destroy"),
        kind: MethodKind::Destructor,
        modifiers: Modifiers::PUBLIC,
        params: Vec::new(),
        returns: smallvec![],
        body: Some(Body::default()),
        span: decl.span,
    };
    TacBuilder::new(pool, interner, decl)
        .lower_method(&synthetic)
        .unwrap_or_else(|| panic!("synthesized destructor has a body"))
}
