//! Driver tests: unit ordering, main selection, and the check pipeline.

use std::path::PathBuf;

use shadow_diagnostic::ExitStatus;
use shadow_ir::{
    Body, Expr, ExprArena, ExprKind, LitValue, MethodDecl, MethodKind, Modifiers, ModuleDecl,
    ModuleKind, ParamDecl, Span, Stmt, StmtKind, StringInterner, TypeId,
};
use shadow_types::TypePool;
use smallvec::smallvec;

use crate::cli::CliOptions;
use crate::config::Config;
use crate::driver::{compile, order_modules, select_main, CheckedUnit};

fn empty_module(
    pool: &mut TypePool,
    interner: &StringInterner,
    name: &str,
    extends: TypeId,
) -> ModuleDecl {
    let n = interner.intern(name);
    let ty = pool.new_class(n, n, Modifiers::PUBLIC, extends);
    ModuleDecl {
        ty,
        kind: ModuleKind::Class,
        fields: Vec::new(),
        methods: Vec::new(),
        arena: ExprArena::new(),
        span: Span::DUMMY,
    }
}

#[test]
fn modules_compile_in_dependency_order() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let base = empty_module(&mut pool, &interner, "Base", TypeId::OBJECT);
    let derived = empty_module(&mut pool, &interner, "Derived", base.ty);
    // Declared derived-first; the order must flip them.
    let modules = vec![derived, base];
    let order = order_modules(&pool, &modules);
    assert_eq!(order, vec![1, 0]);
}

#[test]
fn main_selection_prefers_the_declared_signature() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let mut module = empty_module(&mut pool, &interner, "Hello", TypeId::OBJECT);
    let string_array = pool.array_of(TypeId::STRING, 1, false);
    let ret = module.arena.alloc_stmt(Stmt {
        kind: StmtKind::Return { values: smallvec![] },
        span: Span::DUMMY,
    });
    module.methods.push(MethodDecl {
        name: interner.intern("main"),
        kind: MethodKind::Method,
        modifiers: Modifiers::PUBLIC,
        params: vec![ParamDecl {
            name: interner.intern("args"),
            ty: string_array,
            modifiers: Modifiers::empty(),
        }],
        returns: smallvec![],
        body: Some(Body(vec![ret])),
        span: Span::DUMMY,
    });

    let modules = vec![module];
    let (main_class, takes_args) = select_main(&mut pool, &interner, &modules).unwrap();
    assert_eq!(main_class, modules[0].ty);
    assert!(takes_args);
}

#[test]
fn no_main_is_reported_as_absent() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let module = empty_module(&mut pool, &interner, "Lib", TypeId::OBJECT);
    assert!(select_main(&mut pool, &interner, &[module]).is_none());
}

fn dummy_config() -> Config {
    Config {
        llc: PathBuf::from("/nonexistent/llc"),
        clang: PathBuf::from("/nonexistent/clang"),
        imports: Vec::new(),
        minimum_llvm: 6,
    }
}

#[test]
fn check_mode_stops_before_the_toolchain() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Hello.shadow");
    std::fs::write(&source, "class Hello { }").unwrap();

    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let module = empty_module(&mut pool, &interner, "Hello", TypeId::OBJECT);
    let unit = CheckedUnit {
        interner,
        pool,
        modules: vec![module],
        source,
    };

    let options = CliOptions {
        check: true,
        ..CliOptions::default()
    };
    // The config points at nonexistent tools; --check must succeed anyway.
    let status = compile(unit, &options, &dummy_config()).unwrap();
    assert_eq!(status, ExitStatus::Success);
}

#[test]
fn flow_errors_surface_as_the_type_check_status() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Point.shadow");
    std::fs::write(&source, "class Point { int x; }").unwrap();

    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let mut module = empty_module(&mut pool, &interner, "Point", TypeId::OBJECT);
    // A non-nullable field with no initializer and no constructor body:
    // the field-initialization dataflow must reject the unit.
    module.fields.push(shadow_ir::FieldDecl {
        name: interner.intern("x"),
        ty: TypeId::INT,
        modifiers: Modifiers::empty(),
        initializer: None,
        span: Span::DUMMY,
    });
    let unit = CheckedUnit {
        interner,
        pool,
        modules: vec![module],
        source,
    };

    let options = CliOptions {
        check: true,
        ..CliOptions::default()
    };
    let status = compile(unit, &options, &dummy_config()).unwrap();
    assert_eq!(status, ExitStatus::TypeCheckError);
}

#[test]
fn missing_source_is_a_file_error() {
    let interner = StringInterner::new();
    let pool = TypePool::new(&interner);
    let unit = CheckedUnit {
        interner,
        pool,
        modules: Vec::new(),
        source: PathBuf::from("/nonexistent/Gone.shadow"),
    };
    let err = compile(unit, &CliOptions::default(), &dummy_config()).unwrap_err();
    assert_eq!(err.exit_status(), ExitStatus::FileNotFound);
}

#[test]
fn literal_expressions_survive_the_pipeline() {
    // Exercise the arena plumbing end to end without touching tools.
    let interner = StringInterner::new();
    let mut pool = TypePool::new(&interner);
    let mut module = empty_module(&mut pool, &interner, "Calc", TypeId::OBJECT);
    let lit = module.arena.alloc_expr(Expr {
        kind: ExprKind::Literal(LitValue::Int(9)),
        ty: TypeId::INT,
        span: Span::DUMMY,
    });
    let ret = module.arena.alloc_stmt(Stmt {
        kind: StmtKind::Return {
            values: smallvec![lit],
        },
        span: Span::DUMMY,
    });
    module.methods.push(MethodDecl {
        name: interner.intern("nine"),
        kind: MethodKind::Method,
        modifiers: Modifiers::PUBLIC,
        params: Vec::new(),
        returns: smallvec![TypeId::INT],
        body: Some(Body(vec![ret])),
        span: Span::DUMMY,
    });

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Calc.shadow");
    std::fs::write(&source, "class Calc { }").unwrap();
    let unit = CheckedUnit {
        interner,
        pool,
        modules: vec![module],
        source,
    };
    let options = CliOptions {
        check: true,
        ..CliOptions::default()
    };
    assert_eq!(
        compile(unit, &options, &dummy_config()).unwrap(),
        ExitStatus::Success
    );
}
