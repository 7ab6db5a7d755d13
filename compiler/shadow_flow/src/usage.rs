//! Used-field and used-private-method collection across a compilation
//! unit, and the unused-member warnings derived from it.

use rustc_hash::FxHashSet;
use shadow_diagnostic::{ErrorCode, Reporter};
use shadow_ir::{MethodKind, Modifiers, Name, StringInterner, TypeId};
use shadow_tac::{NodeKind, TacMethod, TacModule};
use shadow_types::{MethodRef, TypePool, TypeVariant};

/// Everything referenced anywhere in the unit.
#[derive(Default)]
pub struct UsageSets {
    /// `(declaring type, field name)` pairs loaded or stored.
    pub fields: FxHashSet<(TypeId, Name)>,
    /// Called method signatures, generic substitution undone.
    pub methods: FxHashSet<TypeId>,
}

/// Union the usage of every method of every module.
///
/// Synthesized copy and destroy methods are exhaustive by construction
/// and excluded, so they do not mark everything used.
pub fn collect_usage(pool: &TypePool, modules: &[TacModule]) -> UsageSets {
    let mut sets = UsageSets::default();
    for module in modules {
        for method in &module.methods {
            if matches!(method.kind, MethodKind::Copy | MethodKind::Destructor) {
                continue;
            }
            collect_method(pool, module, method, &mut sets);
        }
    }
    sets
}

fn collect_method(pool: &TypePool, module: &TacModule, method: &TacMethod, sets: &mut UsageSets) {
    let mut record_field = |field_ref: shadow_tac::NodeId, sets: &mut UsageSets| {
        if let NodeKind::FieldRef { object, field } = &method.node(field_ref).kind {
            let owner = owner_of(pool, method.node(*object).ty, module.ty);
            let declaring = declaring_type(pool, owner, *field).unwrap_or(owner);
            sets.fields.insert((declaring, *field));
        }
    };

    for (_, node) in method.iter() {
        match &node.kind {
            // Reads count everywhere; writes count outside constructors,
            // where the synthesized initializer stores would otherwise
            // mark every field used.
            NodeKind::Load { source } => record_field(*source, sets),
            NodeKind::Store { target, .. } if method.kind != MethodKind::Constructor => {
                record_field(*target, sets);
            }
            NodeKind::Call { method: mnode, .. } => {
                if let NodeKind::MethodRef(mref) = &method.node(*mnode).kind {
                    sets.methods.insert(uninstantiated_signature(pool, *mref));
                }
            }
            NodeKind::NewObject { ctor, .. } => {
                sets.methods.insert(uninstantiated_signature(pool, *ctor));
            }
            _ => {}
        }
    }
}

/// Undo generic substitution: resolve the same overload slot on the
/// uninstantiated owner.
fn uninstantiated_signature(pool: &TypePool, mref: MethodRef) -> TypeId {
    if mref.owner.is_none() {
        return mref.signature;
    }
    let owner_entry = pool.entry(mref.owner);
    if owner_entry.uninstantiated.is_none() {
        return mref.signature;
    }
    let base = owner_entry.uninstantiated;
    let name = if mref.signature.is_none() {
        return mref.signature;
    } else {
        pool.entry(mref.signature).name
    };
    pool.entry(base)
        .overloads(name)
        .and_then(|list| list.get(mref.overload as usize).copied())
        .unwrap_or(mref.signature)
}

/// Fields are declared on instantiations too; usage is accounted against
/// the uninstantiated type.
fn owner_of(pool: &TypePool, object_ty: TypeId, fallback: TypeId) -> TypeId {
    if object_ty.is_none() {
        return fallback;
    }
    let entry = pool.entry(object_ty);
    if entry.uninstantiated.is_none() || entry.is_array() {
        object_ty
    } else {
        entry.uninstantiated
    }
}

/// Walk the extends chain to the type that declares `field`: access
/// through a subclass still counts against the declaring class.
fn declaring_type(pool: &TypePool, mut ty: TypeId, field: Name) -> Option<TypeId> {
    while !ty.is_none() {
        let entry = pool.entry(ty);
        if entry.field(field).is_some() {
            return Some(ty);
        }
        match entry.variant {
            TypeVariant::Class { extends } => ty = extends,
            _ => break,
        }
    }
    None
}

/// Warn about declared-but-unreferenced fields and private methods.
pub fn report_unused(
    modules: &[TacModule],
    usage: &UsageSets,
    interner: &StringInterner,
    reporter: &mut Reporter,
) {
    for module in modules {
        for field in &module.fields {
            if field.modifiers.contains(Modifiers::UNUSED) || field.modifiers.is_constant() {
                continue;
            }
            if !usage.fields.contains(&(module.ty, field.name)) {
                reporter.report(
                    ErrorCode::UnusedField,
                    field.span,
                    format!("field `{}` is never used", interner.resolve(field.name)),
                );
            }
        }

        for method in &module.methods {
            if !method.modifiers.is_private() {
                continue;
            }
            if method
                .modifiers
                .intersects(Modifiers::UNUSED | Modifiers::IMPORT | Modifiers::EXPORT)
            {
                continue;
            }
            if matches!(method.kind, MethodKind::Destructor | MethodKind::Copy) {
                continue;
            }
            if !usage.methods.contains(&method.signature) {
                reporter.report(
                    ErrorCode::UnusedMethod,
                    method.span,
                    format!(
                        "private method `{}` is never called",
                        interner.resolve(method.name)
                    ),
                );
            }
        }
    }
}
