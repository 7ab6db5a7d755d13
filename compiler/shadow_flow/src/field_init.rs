//! Definite field initialization for constructors.
//!
//! A forward must-initialize dataflow: the state is the set of fields
//! definitely stored so far, joined by intersection at merges. Every
//! non-nullable instance field must be in the state before `this` escapes
//! (a method call receiving `this`, or `this` stored into the heap) and
//! before the constructor returns.

use rustc_hash::{FxHashMap, FxHashSet};
use shadow_diagnostic::{ErrorCode, Reporter};
use shadow_ir::{MethodKind, Name, StringInterner};
use shadow_tac::{LocalId, NodeId, NodeKind, TacMethod, TacModule};

use crate::graph::{Cfg, RunId};

/// Check every constructor of `module`.
pub fn check_field_initialization(
    module: &TacModule,
    interner: &StringInterner,
    reporter: &mut Reporter,
) {
    let required: Vec<Name> = module
        .fields
        .iter()
        .filter(|f| !f.modifiers.is_nullable() && !f.modifiers.is_constant())
        .map(|f| f.name)
        .collect();
    if required.is_empty() {
        return;
    }

    for method in &module.methods {
        if method.kind != MethodKind::Constructor {
            continue;
        }
        let cfg = Cfg::build(method);
        check_constructor(method, &cfg, &required, interner, reporter);
    }
}

fn check_constructor(
    method: &TacMethod,
    cfg: &Cfg,
    required: &[Name],
    interner: &StringInterner,
    reporter: &mut Reporter,
) {
    // Fixed point over run-entry states; `None` means not yet visited
    // (top), joins intersect.
    let mut state_in: FxHashMap<RunId, FxHashSet<Name>> = FxHashMap::default();
    state_in.insert(cfg.entry, FxHashSet::default());

    let order = cfg.reverse_postorder();
    let mut changed = true;
    while changed {
        changed = false;
        for &run_id in &order {
            let Some(entry_state) = state_in.get(&run_id).cloned() else {
                continue;
            };
            let exit_state = transfer(method, cfg, run_id, entry_state);
            for &succ in cfg.successors(run_id) {
                let next = match state_in.get(&succ) {
                    Some(existing) => {
                        let joined: FxHashSet<Name> =
                            existing.intersection(&exit_state).copied().collect();
                        if joined.len() == existing.len() {
                            continue;
                        }
                        joined
                    }
                    None => exit_state.clone(),
                };
                state_in.insert(succ, next);
                changed = true;
            }
        }
    }

    // Report at the first escape or return where a required field is
    // still missing.
    let mut reported: FxHashSet<Name> = FxHashSet::default();
    for &run_id in &order {
        let Some(entry_state) = state_in.get(&run_id).cloned() else {
            continue;
        };
        let mut state = entry_state;
        for &node_id in &cfg.run(run_id).nodes {
            let node = method.node(node_id);
            if let Some(field) = stored_field(method, node_id) {
                state.insert(field);
                continue;
            }
            let must_be_complete = this_escapes(method, node_id)
                || matches!(node.kind, NodeKind::Return { .. });
            if must_be_complete {
                for &field in required {
                    if !state.contains(&field) && reported.insert(field) {
                        reporter.report(
                            ErrorCode::FieldNotInitialized,
                            node.span,
                            format!(
                                "field `{}` may not have been initialized",
                                interner.resolve(field)
                            ),
                        );
                    }
                }
            }
        }
    }
}

fn transfer(
    method: &TacMethod,
    cfg: &Cfg,
    run_id: RunId,
    mut state: FxHashSet<Name>,
) -> FxHashSet<Name> {
    for &node_id in &cfg.run(run_id).nodes {
        if let Some(field) = stored_field(method, node_id) {
            state.insert(field);
        }
    }
    state
}

/// A store through `this.field` defines `field`.
fn stored_field(method: &TacMethod, node_id: NodeId) -> Option<Name> {
    let NodeKind::Store { target, .. } = &method.node(node_id).kind else {
        return None;
    };
    let NodeKind::FieldRef { object, field } = &method.node(*target).kind else {
        return None;
    };
    is_this(method, *object).then_some(*field)
}

/// Does this node let `this` escape: a call whose receiver is `this`, or
/// a store of `this` into the heap?
fn this_escapes(method: &TacMethod, node_id: NodeId) -> bool {
    match &method.node(node_id).kind {
        NodeKind::Call { args, .. } => args.iter().any(|&a| is_this(method, a)),
        NodeKind::NewObject { args, .. } => args.iter().any(|&a| is_this(method, a)),
        NodeKind::Store { target, value } => {
            // A store of `this` anywhere except a plain local slot.
            is_this(method, *value)
                && !matches!(method.node(*target).kind, NodeKind::VariableRef(_))
        }
        _ => false,
    }
}

fn is_this(method: &TacMethod, node_id: NodeId) -> bool {
    let NodeKind::Load { source } = &method.node(node_id).kind else {
        return false;
    };
    matches!(
        method.node(*source).kind,
        NodeKind::VariableRef(local) if local == LocalId::from_raw(0)
    )
}
