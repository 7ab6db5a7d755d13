//! Control-flow graph and data-flow analyses for the Shadow compiler.
//!
//! Runs after TAC construction, in place: nothing here rewrites the IR,
//! the passes only annotate the [`Reporter`](shadow_diagnostic::Reporter)
//! with warnings and errors.
//!
//! - [`Cfg`] — basic blocks ("runs") from a method's node sequence
//! - [`check_reachability`] — `DEAD_CODE`, suppressed inside cleanup code
//! - [`check_field_initialization`] — forward must-initialize dataflow for
//!   constructors, join = intersection
//! - [`check_returns`] — every reachable exit of a non-void method carries
//!   values
//! - [`collect_usage`] / [`report_unused`] — unit-wide used-field and
//!   used-private-method accounting
//!
//! # References
//!
//! - Appel: "Modern Compiler Implementation" §10.1 (dataflow analysis)

mod field_init;
mod graph;
mod reachability;
mod returns;
mod usage;


pub use field_init::check_field_initialization;
pub use graph::{Cfg, Run, RunId};
pub use reachability::check_reachability;
pub use returns::check_returns;
pub use usage::{collect_usage, report_unused, UsageSets};

use shadow_diagnostic::Reporter;
use shadow_ir::StringInterner;
use shadow_tac::TacModule;
use shadow_types::TypePool;

/// Run every per-module analysis.
pub fn analyze_module(
    pool: &TypePool,
    module: &TacModule,
    interner: &StringInterner,
    reporter: &mut Reporter,
) {
    tracing::debug!(ty = module.ty.raw(), "analyzing module");
    for method in &module.methods {
        let cfg = Cfg::build(method);
        check_reachability(method, &cfg, reporter);
        check_returns(pool, method, &cfg, interner, reporter);
    }
    check_field_initialization(module, interner, reporter);
}
