//! The compile pipeline: checked AST in, object files out.
//!
//! The front-end hands over a [`CheckedUnit`]; the driver builds TAC in
//! dependency order, runs the flow analyses, emits one LLVM module per
//! class, and drives the external toolchain. Artifacts are cached by
//! timestamp against the source unless `--force-recompile`.

use std::path::{Path, PathBuf};

use shadow_diagnostic::{ExitStatus, Reporter};
use shadow_ir::{ModuleDecl, StringInterner, TypeId};
use shadow_tac::{build_module, reference_closure, TacModule};
use shadow_types::TypePool;

use crate::cli::CliOptions;
use crate::config::Config;
use crate::error::DriverError;
use crate::tools::{up_to_date, Toolchain};

/// One compilation unit as delivered by the front end: the interner and
/// pool it populated, plus every module of the main source and its
/// imports, unordered.
pub struct CheckedUnit {
    pub interner: StringInterner,
    pub pool: TypePool,
    pub modules: Vec<ModuleDecl>,
    pub source: PathBuf,
}

/// Find the class carrying `main` and whether it takes `String[]`.
pub fn select_main(
    pool: &mut TypePool,
    interner: &StringInterner,
    modules: &[ModuleDecl],
) -> Option<(TypeId, bool)> {
    let main_name = interner.intern("main");
    let string_array = pool.array_of(TypeId::STRING, 1, false);
    for module in modules {
        for method in &module.methods {
            if method.name != main_name {
                continue;
            }
            let takes_args = matches!(method.params.as_slice(), [p] if p.ty == string_array);
            if takes_args || method.params.is_empty() {
                return Some((module.ty, takes_args));
            }
        }
    }
    None
}

/// Order module indices so referenced modules compile first.
pub fn order_modules(pool: &TypePool, modules: &[ModuleDecl]) -> Vec<usize> {
    let ids: Vec<TypeId> = modules.iter().map(|m| m.ty).collect();
    let mut ordered = Vec::with_capacity(modules.len());
    let mut visited = vec![false; modules.len()];

    fn visit(
        index: usize,
        pool: &TypePool,
        modules: &[ModuleDecl],
        ids: &[TypeId],
        visited: &mut [bool],
        ordered: &mut Vec<usize>,
    ) {
        if visited[index] {
            return;
        }
        visited[index] = true;
        for referenced in reference_closure(pool, modules[index].ty) {
            if referenced == modules[index].ty {
                continue;
            }
            if let Some(dep) = ids.iter().position(|&id| id == referenced) {
                visit(dep, pool, modules, ids, visited, ordered);
            }
        }
        ordered.push(index);
    }

    for index in 0..modules.len() {
        visit(index, pool, modules, &ids, &mut visited, &mut ordered);
    }
    ordered
}

/// Run the middle end over a unit and drive the toolchain.
///
/// Returns the final exit status; compile diagnostics have already been
/// printed when this returns.
pub fn compile(
    mut unit: CheckedUnit,
    options: &CliOptions,
    config: &Config,
) -> Result<ExitStatus, DriverError> {
    if !unit.source.exists() {
        return Err(DriverError::SourceNotFound {
            path: unit.source.clone(),
        });
    }
    unit.pool.freeze();

    // -- TAC construction, dependency order --
    let order = order_modules(&unit.pool, &unit.modules);
    let mut tac_modules: Vec<TacModule> = Vec::with_capacity(unit.modules.len());
    for index in order {
        tac_modules.push(build_module(
            &mut unit.pool,
            &unit.interner,
            &unit.modules[index],
        ));
    }

    // -- flow analyses --
    let mut reporter = Reporter::new();
    for module in &tac_modules {
        shadow_flow::analyze_module(&unit.pool, module, &unit.interner, &mut reporter);
    }
    let usage = shadow_flow::collect_usage(&unit.pool, &tac_modules);
    shadow_flow::report_unused(&tac_modules, &usage, &unit.interner, &mut reporter);

    let source_text = std::fs::read_to_string(&unit.source).unwrap_or_default();
    let status = reporter.print_and_report(&unit.source.display().to_string(), &source_text);
    if status != ExitStatus::Success {
        return Ok(status);
    }
    if options.check {
        return Ok(ExitStatus::Success);
    }

    // -- emission --
    let main = select_main(&mut unit.pool, &unit.interner, &unit.modules);
    let out_dir = unit
        .source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let toolchain = Toolchain::new(config);
    toolchain.check_llvm_version()?;

    let mut objects = Vec::new();
    for module in &tac_modules {
        let name = unit.interner.resolve(unit.pool.entry(module.ty).name);
        let ll_path = out_dir.join(format!("{name}.ll"));
        let object_path = out_dir.join(format!("{name}.o"));

        if !options.force_recompile && up_to_date(&unit.source, &object_path) {
            tracing::debug!(module = %name, "object is current, skipping");
            objects.push(object_path);
            continue;
        }

        let mut text = shadow_llvm::emit_module(&unit.pool, &unit.interner, module);
        if let Some((main_class, takes_args)) = main {
            if module.ty == main_class {
                text.push('\n');
                text.push_str(&shadow_llvm::set_globals(
                    &unit.pool,
                    &unit.interner,
                    &tac_modules,
                ));
                text.push('\n');
                text.push_str(&shadow_llvm::emit_main_shim(
                    &mut unit.pool,
                    &unit.interner,
                    main_class,
                    takes_args,
                ));
            }
        }

        std::fs::write(&ll_path, &text)?;
        let assembled = toolchain.assemble(&ll_path, &object_path);
        if !options.human_readable {
            let _ = std::fs::remove_file(&ll_path);
        }
        assembled?;
        objects.push(object_path);
    }

    // -- hand-written native glue rides along: assemble a stale
    //    Name.native.ll, link Name.native.o as-is --
    for module in &tac_modules {
        let name = unit.interner.resolve(unit.pool.entry(module.ty).name);
        let native_ll = out_dir.join(format!("{name}.native.ll"));
        let native_o = out_dir.join(format!("{name}.native.o"));
        if native_ll.exists() && (options.force_recompile || !up_to_date(&native_ll, &native_o)) {
            toolchain.assemble(&native_ll, &native_o)?;
        }
        if native_o.exists() {
            objects.push(native_o);
        }
    }

    if options.compile_only || options.no_link {
        return Ok(ExitStatus::Success);
    }
    let executable = unit.source.with_extension("");
    toolchain.link(&objects, &executable)?;
    Ok(ExitStatus::Success)
}
