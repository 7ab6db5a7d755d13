//! Return coverage for value-returning methods.

use shadow_diagnostic::{ErrorCode, Reporter};
use shadow_ir::StringInterner;
use shadow_tac::{NodeKind, TacMethod};
use shadow_types::{TypePool, TypeVariant};

use crate::graph::Cfg;

/// Every reachable exit of a non-void method must be a `Return` carrying
/// the declared number of values. The builder closes value-less paths with
/// an empty `Return`, so a bare one on a reachable path is exactly a
/// missing user return.
pub fn check_returns(
    pool: &TypePool,
    method: &TacMethod,
    cfg: &Cfg,
    interner: &StringInterner,
    reporter: &mut Reporter,
) {
    let expected = match &pool.entry(method.signature).variant {
        TypeVariant::Method { returns, .. } => returns.len(),
        _ => 0,
    };
    if expected == 0 {
        return;
    }

    let reached = cfg.reachable();
    for run_id in cfg.ids() {
        if !reached[run_id.index()] {
            continue;
        }
        let run = cfg.run(run_id);
        let Some(terminator) = run.terminator else {
            continue;
        };
        let node = method.node(terminator);
        if let NodeKind::Return { values } = &node.kind {
            if values.len() != expected {
                reporter.report(
                    ErrorCode::MissingReturn,
                    node.span,
                    format!(
                        "method `{}` must return a value on every path",
                        interner.resolve(method.name)
                    ),
                );
            }
        }
    }
}
