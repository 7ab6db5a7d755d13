//! The runtime ABI: LLVM types for Shadow types.
//!
//! Contracts the runtime library depends on, bit-exact:
//!
//! - every object begins with the three-word header
//!   `{ i64 refcount, Class*, methods* }`, fields following in declared
//!   order
//! - arrays pass by value as `{ element*, i32 dim0, i32 dim1, … }`
//! - `code` is a 32-bit Unicode scalar; `boolean` is `i1`
//!
//! Named struct types use the quoted qualified name, so `Object` is
//! `%"shadow:standard@Object"` and its method table
//! `%"shadow:standard@Object._methods"`.

use shadow_ir::{StringInterner, TypeId};
use shadow_types::{PrimitiveKind, TypePool, TypeVariant};

/// The LLVM scalar for a primitive.
pub fn primitive_type(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Boolean => "i1",
        PrimitiveKind::Byte | PrimitiveKind::UByte => "i8",
        PrimitiveKind::Short | PrimitiveKind::UShort => "i16",
        PrimitiveKind::Int | PrimitiveKind::UInt | PrimitiveKind::Code => "i32",
        PrimitiveKind::Long | PrimitiveKind::ULong => "i64",
        PrimitiveKind::Float => "float",
        PrimitiveKind::Double => "double",
    }
}

/// The quoted named-struct reference for a class or interface.
pub fn struct_name(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    format!("%\"{}\"", interner.resolve(pool.entry(ty).qualified))
}

/// The method-table struct reference for a class.
pub fn methods_name(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    format!("%\"{}._methods\"", interner.resolve(pool.entry(ty).qualified))
}

/// The LLVM type of a Shadow value of type `ty`.
///
/// References are pointers to the named struct; arrays are the by-value
/// descriptor struct; sequences become literal structs (multi-returns).
pub fn value_type(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    if ty.is_none() {
        return "void".to_string();
    }
    match &pool.entry(ty).variant {
        TypeVariant::Primitive(kind) => primitive_type(*kind).to_string(),
        TypeVariant::Array { base, dims, .. } => {
            let mut out = format!("{{ {}*", value_type(pool, interner, *base));
            for _ in 0..*dims {
                out.push_str(", i32");
            }
            out.push_str(" }");
            out
        }
        TypeVariant::Sequence { elements } => {
            if elements.is_empty() {
                "void".to_string()
            } else if elements.len() == 1 {
                value_type(pool, interner, elements[0])
            } else {
                let inner: Vec<String> = elements
                    .iter()
                    .map(|&e| value_type(pool, interner, e))
                    .collect();
                format!("{{ {} }}", inner.join(", "))
            }
        }
        TypeVariant::Method { .. } => "i8*".to_string(),
        TypeVariant::Null => format!("{}*", struct_name(pool, interner, TypeId::OBJECT)),
        TypeVariant::TypeParameter { .. } => {
            format!("{}*", struct_name(pool, interner, TypeId::OBJECT))
        }
        _ => format!("{}*", struct_name(pool, interner, ty)),
    }
}

/// The object-body struct definition for a class: header then fields in
/// declared order.
pub fn object_definition(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    let mut parts = vec![
        "i64".to_string(),
        format!("{}*", struct_name(pool, interner, TypeId::CLASS)),
        format!("{}*", methods_name(pool, interner, ty)),
    ];
    for field in &pool.entry(ty).fields {
        if field.modifiers.is_constant() {
            continue;
        }
        parts.push(value_type(pool, interner, field.ty));
    }
    format!(
        "{} = type {{ {} }}",
        struct_name(pool, interner, ty),
        parts.join(", ")
    )
}

/// The method-table struct definition: one pointer-sized slot per method
/// overload, in declaration order.
pub fn methods_definition(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    let count: usize = pool
        .entry(ty)
        .methods
        .iter()
        .map(|(_, overloads)| overloads.len())
        .sum();
    let slots = vec!["i8*"; count.max(1)];
    format!(
        "{} = type {{ {} }}",
        methods_name(pool, interner, ty),
        slots.join(", ")
    )
}

/// External declarations for every runtime helper the emitted code calls.
pub fn runtime_declarations(pool: &TypePool, interner: &StringInterner) -> String {
    let object = format!("{}*", struct_name(pool, interner, TypeId::OBJECT));
    let class = format!("{}*", struct_name(pool, interner, TypeId::CLASS));
    let mut out = String::new();
    out.push_str(&format!("declare {object} @__allocate({class} %class)\n"));
    out.push_str(&format!(
        "declare {object} @__allocateArray({class} %class, i64 %elements)\n"
    ));
    out.push_str(&format!("declare void @__incrementRef({object} %object)\n"));
    out.push_str(&format!("declare void @__decrementRef({object} %object)\n"));
    out.push_str(&format!("declare {object} @__shadow_catch(i8* %payload)\n"));
    out.push_str(&format!("declare void @__shadow_throw({object} %exception)\n"));
    out.push_str("declare i32 @__shadow_personality_v0(...)\n");
    out
}

#[cfg(test)]
mod tests {
    use shadow_ir::Modifiers;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn object_header_is_three_words() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let name = interner.intern("Empty");
        let qualified = interner.intern("demo@Empty");
        let class = pool.new_class(name, qualified, Modifiers::PUBLIC, TypeId::OBJECT);
        assert_eq!(
            object_definition(&pool, &interner, class),
            "%\"demo@Empty\" = type { i64, %\"shadow:standard@Class\"*, %\"demo@Empty._methods\"* }"
        );
    }

    #[test]
    fn fields_follow_the_header_in_declared_order() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let name = interner.intern("Pair");
        let qualified = interner.intern("demo@Pair");
        let class = pool.new_class(name, qualified, Modifiers::PUBLIC, TypeId::OBJECT);
        pool.add_field(class, interner.intern("a"), TypeId::INT, Modifiers::empty(), None);
        pool.add_field(
            class,
            interner.intern("b"),
            TypeId::STRING,
            Modifiers::empty(),
            None,
        );
        let definition = object_definition(&pool, &interner, class);
        assert!(definition.ends_with("i32, %\"shadow:standard@String\"* }"));
    }

    #[test]
    fn arrays_are_data_pointer_plus_dimensions() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let ints = pool.array_of(TypeId::INT, 1, false);
        assert_eq!(value_type(&pool, &interner, ints), "{ i32*, i32 }");
        let grid = pool.array_of(TypeId::DOUBLE, 2, false);
        assert_eq!(value_type(&pool, &interner, grid), "{ double*, i32, i32 }");
    }

    #[test]
    fn sequences_unwrap_singletons() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let void = pool.sequence_of(vec![]);
        let single = pool.sequence_of(vec![TypeId::INT]);
        let pair = pool.sequence_of(vec![TypeId::INT, TypeId::BOOLEAN]);
        assert_eq!(value_type(&pool, &interner, void), "void");
        assert_eq!(value_type(&pool, &interner, single), "i32");
        assert_eq!(value_type(&pool, &interner, pair), "{ i32, i1 }");
    }
}
