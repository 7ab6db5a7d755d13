//! Class descriptors, method tables, and the generic/array sets.
//!
//! Descriptor layout (pointer-sized slots, exact order; the runtime
//! indexes these blindly):
//!
//! ```text
//! { i64 refcount, i8* class, i8* methods,       ; object header
//!   i8* name, i8* parent,                        ; identity
//!   i8* methodTable, i8* interfaces,             ; dispatch metadata
//!   i32 flags, i32 size }                        ; classification
//! ```
//!
//! Generic class descriptors append `{ i8* parameterClasses,
//! i8* parameterTables }`. Every distinct generic instantiation and every
//! distinct array type in the program lands in `@_genericSet` /
//! `@_arraySet`, with `@_genericSize` / `@_arraySize` holding the counts
//! the runtime uses to walk them.

use std::fmt::Write;

use shadow_ir::{StringInterner, TypeId};
use shadow_tac::TacModule;
use shadow_types::{TypePool, TypeVariant, ARRAY_WIDTH};

use crate::mangle::mangle_type;

/// Descriptor classification flags.
pub const FLAG_INTERFACE: u32 = 1;
pub const FLAG_PRIMITIVE: u32 = 2;
pub const FLAG_GENERIC: u32 = 4;
pub const FLAG_ARRAY: u32 = 8;

/// The symbol (without `@`) naming a type's descriptor global.
///
/// Distinct instantiations need distinct globals, so type arguments join
/// the base token the same way parameters join a method symbol.
pub fn descriptor_symbol(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    let entry = pool.entry(ty);
    let mut symbol = mangle_type(pool, interner, ty);
    for &arg in &entry.type_args {
        symbol.push('_');
        symbol.push_str(&mangle_type(pool, interner, arg));
    }
    symbol.push_str(".class");
    symbol
}

fn methods_symbol(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    let entry = pool.entry(ty);
    let mut symbol = mangle_type(pool, interner, ty);
    for &arg in &entry.type_args {
        symbol.push('_');
        symbol.push_str(&mangle_type(pool, interner, arg));
    }
    symbol.push_str(".methods");
    symbol
}

/// The literal struct type of a descriptor global; generic descriptors
/// carry the two appended parameter slots.
pub(crate) fn descriptor_type(pool: &TypePool, ty: TypeId) -> &'static str {
    if pool.entry(ty).type_args.is_empty() {
        "{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }"
    } else {
        "{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32, i8*, i8* }"
    }
}

/// `i8*`-erased reference to a descriptor global.
fn descriptor_ref(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    format!(
        "i8* bitcast ({}* @\"{}\" to i8*)",
        descriptor_type(pool, ty),
        descriptor_symbol(pool, interner, ty)
    )
}

fn flags_of(pool: &TypePool, ty: TypeId) -> u32 {
    let entry = pool.entry(ty);
    let mut flags = 0;
    match &entry.variant {
        TypeVariant::Interface => flags |= FLAG_INTERFACE,
        TypeVariant::Primitive(_) => flags |= FLAG_PRIMITIVE,
        TypeVariant::Array { .. } => flags |= FLAG_ARRAY,
        _ => {}
    }
    if !entry.type_args.is_empty() || !entry.type_params.is_empty() {
        flags |= FLAG_GENERIC;
    }
    flags
}

/// Allocation size of one instance: the 24-byte header plus each
/// non-constant field, references pointer-sized, arrays by value.
fn instance_size(pool: &TypePool, ty: TypeId) -> u32 {
    let mut size = 24u32;
    for field in &pool.entry(ty).fields {
        if field.modifiers.is_constant() {
            continue;
        }
        size += field_size(pool, field.ty);
    }
    size
}

fn field_size(pool: &TypePool, ty: TypeId) -> u32 {
    match &pool.entry(ty).variant {
        TypeVariant::Array { dims, .. } => 8 + 4 * dims,
        _ => {
            let width = pool.width(ty);
            if width == ARRAY_WIDTH {
                8
            } else {
                width.max(1)
            }
        }
    }
}

/// The method-table global: one slot per overload, declaration order;
/// interface tables hold nulls and are filled per implementing class at
/// dispatch setup.
pub fn methods_global(
    pool: &TypePool,
    interner: &StringInterner,
    ty: TypeId,
    symbols: &[String],
) -> String {
    let name = methods_symbol(pool, interner, ty);
    if symbols.is_empty() {
        return format!("@\"{name}\" = constant [1 x i8*] [i8* null]\n");
    }
    let slots: Vec<String> = symbols
        .iter()
        .map(|s| {
            if s.is_empty() {
                "i8* null".to_string()
            } else {
                format!("i8* bitcast (void ()* @\"{s}\" to i8*)")
            }
        })
        .collect();
    format!(
        "@\"{name}\" = constant [{} x i8*] [{}]\n",
        slots.len(),
        slots.join(", ")
    )
}

/// One class descriptor global.
pub fn class_descriptor(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    let entry = pool.entry(ty);
    let symbol = descriptor_symbol(pool, interner, ty);
    let name_text = interner.resolve(entry.qualified);
    let name_bytes = name_text.len() + 1;

    let parent = match &entry.variant {
        TypeVariant::Class { extends } if !extends.is_none() => {
            descriptor_ref(pool, interner, *extends)
        }
        TypeVariant::Array { nullable, .. } => {
            let base = if *nullable {
                TypeId::ARRAY_NULLABLE
            } else {
                TypeId::ARRAY
            };
            descriptor_ref(pool, interner, base)
        }
        _ => "i8* null".to_string(),
    };

    let generic = !entry.type_args.is_empty();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "@\"{symbol}.name\" = private unnamed_addr constant [{name_bytes} x i8] c\"{name_text}\\00\""
    );

    let base_fields = format!(
        "i64 -1, i8* null, i8* null, \
         i8* getelementptr ([{name_bytes} x i8], [{name_bytes} x i8]* @\"{symbol}.name\", i32 0, i32 0), \
         {parent}, \
         i8* bitcast ([{method_count} x i8*]* @\"{methods}\" to i8*), \
         i8* null, \
         i32 {flags}, i32 {size}",
        method_count = entry
            .methods
            .iter()
            .map(|(_, o)| o.len())
            .sum::<usize>()
            .max(1),
        methods = methods_symbol(pool, interner, ty),
        flags = flags_of(pool, ty),
        size = instance_size(pool, ty),
    );

    if generic {
        let _ = writeln!(
            out,
            "@\"{symbol}\" = constant {{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32, i8*, i8* }} \
             {{ {base_fields}, i8* null, i8* null }}"
        );
    } else {
        let _ = writeln!(
            out,
            "@\"{symbol}\" = constant {{ i64, i8*, i8*, i8*, i8*, i8*, i8*, i32, i32 }} \
             {{ {base_fields} }}"
        );
    }
    out
}

/// Collect the distinct generic instantiations and array types referenced
/// by the unit and emit the set globals with their sizes.
pub fn set_globals(pool: &TypePool, interner: &StringInterner, modules: &[TacModule]) -> String {
    let mut generics: Vec<TypeId> = Vec::new();
    let mut arrays: Vec<TypeId> = Vec::new();
    for module in modules {
        for &ty in &module.references {
            let entry = pool.entry(ty);
            match &entry.variant {
                TypeVariant::Array { .. } => {
                    if !arrays.contains(&ty) {
                        arrays.push(ty);
                    }
                }
                TypeVariant::Class { .. } | TypeVariant::Interface
                    if !entry.uninstantiated.is_none() =>
                {
                    if !generics.contains(&ty) {
                        generics.push(ty);
                    }
                }
                _ => {}
            }
        }
    }
    generics.sort_by_key(|t| t.raw());
    arrays.sort_by_key(|t| t.raw());

    let mut out = String::new();
    let render = |types: &[TypeId]| -> String {
        if types.is_empty() {
            return "[1 x i8*] [i8* null]".to_string();
        }
        let entries: Vec<String> = types
            .iter()
            .map(|&t| descriptor_ref(pool, interner, t))
            .collect();
        format!("[{} x i8*] [{}]", entries.len(), entries.join(", "))
    };

    let _ = writeln!(out, "@_genericSet = global {}", render(&generics));
    let _ = writeln!(out, "@_genericSize = constant i32 {}", generics.len());
    let _ = writeln!(out, "@_arraySet = global {}", render(&arrays));
    let _ = writeln!(out, "@_arraySize = constant i32 {}", arrays.len());
    out
}
