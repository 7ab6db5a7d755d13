//! The synthesized `main(argc, argv)`.
//!
//! The process entry point constructs the console singleton, lifts the C
//! argument vector into a Shadow `String[]`, allocates the user's main
//! class and invokes its `main`. An exception that escapes user code is
//! caught, printed to the error console, and turns into exit status 1;
//! normal completion returns 0.

use std::fmt::Write;

use shadow_ir::{StringInterner, TypeId};
use shadow_types::TypePool;

use crate::abi::{struct_name, value_type};
use crate::descriptors::descriptor_symbol;
use crate::mangle::mangle_method;

/// Emit the `main` shim for `main_class`.
///
/// `takes_args` selects between the user's `main(String[])` and `main()`
/// overloads, per the declared signature.
pub fn emit_main_shim(
    pool: &mut TypePool,
    interner: &StringInterner,
    main_class: TypeId,
    takes_args: bool,
) -> String {
    let object = struct_name(pool, interner, main_class);
    let object_root = struct_name(pool, interner, TypeId::OBJECT);
    let class_struct = struct_name(pool, interner, TypeId::CLASS);
    let string_array = pool.array_of(TypeId::STRING, 1, false);
    let args_ty = value_type(pool, interner, string_array);
    let descriptor = descriptor_symbol(pool, interner, main_class);
    let exception_descriptor = descriptor_symbol(pool, interner, TypeId::EXCEPTION);
    let create_symbol = mangle_method(pool, interner, main_class, "create", &[]);
    let main_symbol = if takes_args {
        mangle_method(pool, interner, main_class, "main", &[string_array])
    } else {
        mangle_method(pool, interner, main_class, "main", &[])
    };
    let desc_ty = "{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }";

    let mut out = String::new();
    let _ = writeln!(out, "declare void @__consoleInit()");
    let _ = writeln!(out, "declare {args_ty} @__liftArgv(i32 %argc, i8** %argv)");
    let _ = writeln!(
        out,
        "declare void @__printException({object_root}* %exception)"
    );
    out.push('\n');

    let _ = writeln!(
        out,
        "define i32 @main(i32 %argc, i8** %argv) personality i32 (...)* @__shadow_personality_v0 {{"
    );
    let _ = writeln!(out, "  call void @__consoleInit()");
    if takes_args {
        let _ = writeln!(
            out,
            "  %args = call {args_ty} @__liftArgv(i32 %argc, i8** %argv)"
        );
    }
    let _ = writeln!(
        out,
        "  %raw = call {object_root}* @__allocate({class_struct}* bitcast ({desc_ty}* @\"{descriptor}\" to {class_struct}*))"
    );
    let _ = writeln!(out, "  %top = bitcast {object_root}* %raw to {object}*");
    let _ = writeln!(
        out,
        "  invoke void @\"{create_symbol}\"({object}* %top) to label %created unwind label %handler"
    );
    let _ = writeln!(out, "created:");
    if takes_args {
        let _ = writeln!(
            out,
            "  invoke void @\"{main_symbol}\"({object}* %top, {args_ty} %args) to label %finished unwind label %handler"
        );
    } else {
        let _ = writeln!(
            out,
            "  invoke void @\"{main_symbol}\"({object}* %top) to label %finished unwind label %handler"
        );
    }
    let _ = writeln!(out, "finished:");
    let _ = writeln!(out, "  call void @__decrementRef({object_root}* %raw)");
    let _ = writeln!(out, "  ret i32 0");
    let _ = writeln!(out, "handler:");
    let _ = writeln!(
        out,
        "  %switch = catchswitch within none [label %catch] unwind to caller"
    );
    let _ = writeln!(out, "catch:");
    let _ = writeln!(
        out,
        "  %pad = catchpad within %switch [i8* bitcast ({desc_ty}* @\"{exception_descriptor}\" to i8*)]"
    );
    let _ = writeln!(
        out,
        "  %exception = call {object_root}* @__shadow_catch(i8* null) [ \"funclet\"(token %pad) ]"
    );
    let _ = writeln!(
        out,
        "  call void @__printException({object_root}* %exception) [ \"funclet\"(token %pad) ]"
    );
    let _ = writeln!(out, "  catchret from %pad to label %failed");
    let _ = writeln!(out, "failed:");
    let _ = writeln!(out, "  ret i32 1");
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use shadow_ir::Modifiers;

    use super::*;

    fn fixture() -> (StringInterner, TypePool, TypeId) {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let name = interner.intern("Hello");
        let qualified = interner.intern("demo@Hello");
        let class = pool.new_class(name, qualified, Modifiers::PUBLIC, TypeId::OBJECT);
        (interner, pool, class)
    }

    #[test]
    fn normal_completion_returns_zero_and_releases_the_object() {
        let (interner, mut pool, class) = fixture();
        let shim = emit_main_shim(&mut pool, &interner, class, true);
        assert!(shim.contains("define i32 @main(i32 %argc, i8** %argv)"));
        assert!(shim.contains("ret i32 0"));
        // Exactly one release of the main object on the normal path.
        assert_eq!(shim.matches("call void @__decrementRef").count(), 1);
    }

    #[test]
    fn uncaught_exceptions_print_and_return_one() {
        let (interner, mut pool, class) = fixture();
        let shim = emit_main_shim(&mut pool, &interner, class, false);
        assert!(shim.contains("@__printException"));
        assert!(shim.contains("ret i32 1"));
        assert!(shim.contains("__shadow_personality_v0"));
        // Without args the argv lift call is not emitted.
        assert!(!shim.contains("%args = call"));
    }

    #[test]
    fn main_symbol_reflects_the_declared_signature() {
        let (interner, mut pool, class) = fixture();
        let with_args = emit_main_shim(&mut pool, &interner, class, true);
        assert!(with_args.contains("demo..Hello_Mmain_shadow.standard..String_A"));
        let without = emit_main_shim(&mut pool, &interner, class, false);
        assert!(without.contains("@\"demo..Hello_Mmain\"("));
    }
}
