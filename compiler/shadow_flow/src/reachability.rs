//! Dead-code detection.

use shadow_diagnostic::{ErrorCode, Reporter};
use shadow_tac::TacMethod;

use crate::graph::Cfg;

/// Report a `DEAD_CODE` warning for every run the entry cannot reach,
/// except runs inside cleanup code: the unwind half of a finally is only
/// reachable through edges the unwinder takes.
pub fn check_reachability(method: &TacMethod, cfg: &Cfg, reporter: &mut Reporter) {
    let reached = cfg.reachable();
    for run_id in cfg.ids() {
        if reached[run_id.index()] {
            continue;
        }
        let run = cfg.run(run_id);
        let label = method.node(run.label);
        if method.blocks.is_inside_cleanup(label.block) {
            continue;
        }
        // An unreachable run that holds nothing but its label and an
        // implicit jump carries no user code worth flagging.
        if run.nodes.len() <= 1 {
            continue;
        }
        reporter.report(ErrorCode::DeadCode, label.span, "unreachable code");
    }
}
