//! Symbol mangling.
//!
//! Linker symbols for Shadow methods follow a structured scheme the
//! runtime library depends on:
//!
//! ```text
//! <type>_M<method>[_<param type>]...
//! ```
//!
//! Type tokens replace the package separator `:` with `.` and the
//! package/class separator `@` with `..`; arrays append `_A` once per
//! dimension:
//!
//! | Shadow | token |
//! |--------|-------|
//! | `int` | `int` |
//! | `shadow:standard@String` | `shadow.standard..String` |
//! | `int[]` | `int_A` |
//! | `String[][]` | `shadow.standard..String_A_A` |
//!
//! `String.concatenate(String)` therefore mangles to
//! `shadow.standard..String_Mconcatenate_shadow.standard..String`.
//!
//! Tokens parse back unambiguously as long as identifiers avoid `_`,
//! which the surface language guarantees for its standard library.

use shadow_ir::{StringInterner, TypeId};
use shadow_types::{TypePool, TypeVariant};

/// A parsed type token: either a named (or primitive) base or an array.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MangledType {
    /// Primitive keyword or `package..Class` name.
    Named(String),
    Array { base: Box<MangledType>, dims: u32 },
}

/// The token for one type.
pub fn mangle_type(pool: &TypePool, interner: &StringInterner, ty: TypeId) -> String {
    match &pool.entry(ty).variant {
        TypeVariant::Primitive(kind) => kind.keyword().to_string(),
        TypeVariant::Array { base, dims, .. } => {
            let mut token = mangle_type(pool, interner, *base);
            for _ in 0..*dims {
                token.push_str("_A");
            }
            token
        }
        _ => {
            let qualified = interner.resolve(pool.entry(ty).qualified);
            qualified.replace(':', ".").replace('@', "..")
        }
    }
}

/// The linker symbol for a method of `owner`.
pub fn mangle_method(
    pool: &TypePool,
    interner: &StringInterner,
    owner: TypeId,
    method: &str,
    params: &[TypeId],
) -> String {
    let mut out = mangle_type(pool, interner, owner);
    out.push_str("_M");
    out.push_str(method);
    for &param in params {
        out.push('_');
        out.push_str(&mangle_type(pool, interner, param));
    }
    out
}

/// Parse a type token back into its structure.
///
/// Returns `None` on malformed input. Together with [`render`] this gives
/// the round-trip property `render(parse(t)) == t`.
pub fn parse_type(token: &str) -> Option<MangledType> {
    if token.is_empty() {
        return None;
    }
    let mut dims = 0u32;
    let mut rest = token;
    while let Some(stripped) = rest.strip_suffix("_A") {
        dims += 1;
        rest = stripped;
    }
    if rest.is_empty() || rest.contains('_') {
        return None;
    }
    let base = MangledType::Named(rest.to_string());
    if dims == 0 {
        Some(base)
    } else {
        Some(MangledType::Array {
            base: Box::new(base),
            dims,
        })
    }
}

/// Render a parsed token back to its textual form.
pub fn render(parsed: &MangledType) -> String {
    match parsed {
        MangledType::Named(name) => name.clone(),
        MangledType::Array { base, dims } => {
            let mut out = render(base);
            for _ in 0..*dims {
                out.push_str("_A");
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shadow_ir::{Modifiers, StringInterner};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn primitives_use_their_keyword() {
        let interner = StringInterner::new();
        let pool = TypePool::new(&interner);
        assert_eq!(mangle_type(&pool, &interner, TypeId::INT), "int");
        assert_eq!(mangle_type(&pool, &interner, TypeId::ULONG), "ulong");
    }

    #[test]
    fn qualified_names_fold_their_separators() {
        let interner = StringInterner::new();
        let pool = TypePool::new(&interner);
        assert_eq!(
            mangle_type(&pool, &interner, TypeId::STRING),
            "shadow.standard..String"
        );
    }

    #[test]
    fn arrays_append_one_suffix_per_dimension() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let matrix = pool.array_of(TypeId::INT, 2, false);
        assert_eq!(mangle_type(&pool, &interner, matrix), "int_A_A");
    }

    #[test]
    fn methods_join_owner_name_and_parameters() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let name = interner.intern("Console");
        let qualified = interner.intern("shadow:io@Console");
        let console = pool.new_class(name, qualified, Modifiers::PUBLIC, TypeId::OBJECT);
        let symbol = mangle_method(
            &pool,
            &interner,
            console,
            "printLine",
            &[TypeId::STRING],
        );
        assert_eq!(
            symbol,
            "shadow.io..Console_MprintLine_shadow.standard..String"
        );
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert_eq!(parse_type(""), None);
        assert_eq!(parse_type("_A"), None);
        assert_eq!(parse_type("foo_bar"), None);
    }

    fn token_strategy() -> impl Strategy<Value = String> {
        let name = "[A-Za-z][A-Za-z0-9]{0,8}";
        let named = prop_oneof![
            Just("int".to_string()),
            Just("double".to_string()),
            name.prop_map(|n: String| n),
            (name, name).prop_map(|(p, c): (String, String)| format!("{p}..{c}")),
        ];
        (named, 0u32..4).prop_map(|(base, dims)| {
            let mut out = base;
            for _ in 0..dims {
                out.push_str("_A");
            }
            out
        })
    }

    proptest! {
        /// `render(parse(t)) == t` for every well-formed token.
        #[test]
        fn mangle_round_trip(token in token_strategy()) {
            let parsed = parse_type(&token).expect("well-formed token");
            prop_assert_eq!(render(&parsed), token);
        }
    }
}
