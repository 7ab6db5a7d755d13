//! The type pool: arena, interning, and member mutation.

use rustc_hash::FxHashMap;
use shadow_ir::{ExprId, MethodKind, Modifiers, Name, StringInterner, TypeId};

use crate::entry::{FieldInfo, PrimitiveKind, TypeEntry, TypeVariant};

/// Ordering sentinel width for arrays, distinct from every scalar and
/// pointer width.
pub const ARRAY_WIDTH: u32 = u32::MAX;

/// Key for structural deduplication of arrays, sequences, and signatures.
#[derive(Clone, Eq, PartialEq, Hash)]
enum StructKey {
    Array {
        base: TypeId,
        nullable: bool,
        dims: u32,
    },
    Sequence(Vec<TypeId>),
    Method {
        outer: TypeId,
        name: Name,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
        kind: MethodKind,
    },
}

/// The unified type pool.
///
/// Stores every type in the compilation; see the crate docs for the design.
pub struct TypePool {
    entries: Vec<TypeEntry>,
    /// Structural dedup: arrays, sequences, method signatures.
    intern_map: FxHashMap<StructKey, TypeId>,
    /// Generic instantiation cache: (uninstantiated, argument ids) to the
    /// concrete entry. Keyed on the uninstantiated type so repeated
    /// `replace` calls return the same instance.
    pub(crate) instantiations: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    frozen: bool,
}

impl TypePool {
    /// Create a pool with the primitives and the always-referenced runtime
    /// classes pre-interned at their fixed indices.
    pub fn new(interner: &StringInterner) -> Self {
        let mut pool = TypePool {
            entries: Vec::with_capacity(64),
            intern_map: FxHashMap::default(),
            instantiations: FxHashMap::default(),
            frozen: false,
        };
        pool.intern_builtins(interner);
        pool
    }

    fn intern_builtins(&mut self, interner: &StringInterner) {
        for kind in PrimitiveKind::ALL {
            let name = interner.intern(kind.keyword());
            self.entries.push(TypeEntry::new(
                name,
                name,
                Modifiers::PUBLIC,
                TypeVariant::Primitive(kind),
            ));
        }

        let builtin = |pool: &mut Self, simple: &str, variant: TypeVariant| {
            let name = interner.intern(simple);
            let qualified = interner.intern(&format!("shadow:standard@{simple}"));
            pool.entries.push(TypeEntry::new(
                name,
                qualified,
                Modifiers::PUBLIC,
                variant,
            ));
        };

        builtin(self, "Object", TypeVariant::Class { extends: TypeId::NONE });
        builtin(self, "Class", TypeVariant::Class { extends: TypeId::OBJECT });
        builtin(self, "GenericClass", TypeVariant::Class { extends: TypeId::CLASS });
        builtin(self, "String", TypeVariant::Class { extends: TypeId::OBJECT });
        builtin(self, "Exception", TypeVariant::Class { extends: TypeId::OBJECT });
        builtin(self, "Array", TypeVariant::Class { extends: TypeId::OBJECT });
        builtin(self, "ArrayNullable", TypeVariant::Class { extends: TypeId::OBJECT });
        builtin(self, "null", TypeVariant::Null);
        builtin(self, "unknown", TypeVariant::Unknown);

        // Pad the reserved range so dynamic ids start at FIRST_DYNAMIC.
        while (self.entries.len() as u32) < TypeId::FIRST_DYNAMIC {
            self.entries.push(TypeEntry::new(
                Name::EMPTY,
                Name::EMPTY,
                Modifiers::empty(),
                TypeVariant::Unknown,
            ));
        }
    }

    #[inline]
    pub fn entry(&self, ty: TypeId) -> &TypeEntry {
        &self.entries[ty.index()]
    }

    /// Mutable access for the front-end while constructing types.
    ///
    /// # Panics
    ///
    /// Panics once the pool is frozen.
    #[inline]
    pub fn entry_mut(&mut self, ty: TypeId) -> &mut TypeEntry {
        assert!(!self.frozen, "type pool mutated after freeze");
        &mut self.entries[ty.index()]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate all ids, including the pre-interned range.
    pub fn ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.entries.len() as u32).map(TypeId::from_raw)
    }

    /// Freeze the pool: member mutation becomes a bug, structural interning
    /// stays available.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn push_entry(&mut self, entry: TypeEntry) -> TypeId {
        let id = TypeId::from_raw(self.entries.len() as u32);
        self.entries.push(entry);
        id
    }

    // === Nominal type construction (front-end only) ===

    pub fn new_class(
        &mut self,
        name: Name,
        qualified: Name,
        modifiers: Modifiers,
        extends: TypeId,
    ) -> TypeId {
        assert!(!self.frozen, "type pool mutated after freeze");
        self.push_entry(TypeEntry::new(
            name,
            qualified,
            modifiers,
            TypeVariant::Class { extends },
        ))
    }

    pub fn new_interface(&mut self, name: Name, qualified: Name, modifiers: Modifiers) -> TypeId {
        assert!(!self.frozen, "type pool mutated after freeze");
        self.push_entry(TypeEntry::new(
            name,
            qualified,
            modifiers,
            TypeVariant::Interface,
        ))
    }

    pub fn new_type_parameter(&mut self, name: Name, bounds: Vec<TypeId>) -> TypeId {
        assert!(!self.frozen, "type pool mutated after freeze");
        self.push_entry(TypeEntry::new(
            name,
            name,
            Modifiers::empty(),
            TypeVariant::TypeParameter { bounds },
        ))
    }

    pub(crate) fn clone_entry_for_instantiation(&mut self, entry: TypeEntry) -> TypeId {
        self.push_entry(entry)
    }

    // === Structural interning (available in every phase) ===

    /// The array type `base[]…[]`, interned.
    pub fn array_of(&mut self, base: TypeId, dims: u32, nullable: bool) -> TypeId {
        debug_assert!(dims >= 1, "arrays have at least one dimension");
        let key = StructKey::Array {
            base,
            nullable,
            dims,
        };
        if let Some(&id) = self.intern_map.get(&key) {
            return id;
        }
        let extends = if nullable {
            TypeId::ARRAY_NULLABLE
        } else {
            TypeId::ARRAY
        };
        let mut entry = TypeEntry::new(
            Name::EMPTY,
            Name::EMPTY,
            Modifiers::PUBLIC,
            TypeVariant::Array {
                base,
                nullable,
                dims,
            },
        );
        entry.uninstantiated = extends;
        let id = self.push_entry(entry);
        self.intern_map.insert(key, id);
        id
    }

    /// The sequence type of `elements`, interned. Size 0 is `void`; size 1
    /// unwraps transparently to the element itself.
    pub fn sequence_of(&mut self, elements: Vec<TypeId>) -> TypeId {
        if elements.len() == 1 {
            return elements[0];
        }
        let key = StructKey::Sequence(elements.clone());
        if let Some(&id) = self.intern_map.get(&key) {
            return id;
        }
        let id = self.push_entry(TypeEntry::new(
            Name::EMPTY,
            Name::EMPTY,
            Modifiers::empty(),
            TypeVariant::Sequence { elements },
        ));
        self.intern_map.insert(key, id);
        id
    }

    /// A method signature entry, interned on (outer, name, shape).
    pub fn method_type(
        &mut self,
        outer: TypeId,
        name: Name,
        params: Vec<TypeId>,
        returns: Vec<TypeId>,
        kind: MethodKind,
        modifiers: Modifiers,
    ) -> TypeId {
        let key = StructKey::Method {
            outer,
            name,
            params: params.clone(),
            returns: returns.clone(),
            kind,
        };
        if let Some(&id) = self.intern_map.get(&key) {
            return id;
        }
        let mut entry = TypeEntry::new(
            name,
            name,
            modifiers,
            TypeVariant::Method {
                outer,
                params,
                returns,
                kind,
            },
        );
        entry.outer = outer;
        let id = self.push_entry(entry);
        self.intern_map.insert(key, id);
        id
    }

    // === Member mutation (front-end only) ===

    pub fn add_field(
        &mut self,
        ty: TypeId,
        name: Name,
        field_ty: TypeId,
        modifiers: Modifiers,
        initializer: Option<ExprId>,
    ) {
        self.entry_mut(ty).fields.push(FieldInfo {
            name,
            ty: field_ty,
            modifiers,
            initializer,
        });
    }

    /// Append an overload to `ty`'s method map, keeping declaration order.
    pub fn add_method(&mut self, ty: TypeId, name: Name, signature: TypeId) {
        let entry = self.entry_mut(ty);
        if let Some((_, list)) = entry.methods.iter_mut().find(|(n, _)| *n == name) {
            list.push(signature);
        } else {
            entry.methods.push((name, vec![signature]));
        }
    }

    pub fn add_interface(&mut self, ty: TypeId, implemented: TypeId) {
        self.entry_mut(ty).interfaces.push(implemented);
    }

    pub fn add_inner(&mut self, outer: TypeId, inner: TypeId) {
        self.entry_mut(outer).inners.push(inner);
        self.entry_mut(inner).outer = outer;
    }

    pub fn add_type_parameter(&mut self, ty: TypeId, param: TypeId) {
        self.entry_mut(ty).type_params.push(param);
    }

    pub fn add_referenced(&mut self, ty: TypeId, referenced: TypeId) {
        let entry = self.entry_mut(ty);
        if !entry.referenced.contains(&referenced) {
            entry.referenced.push(referenced);
        }
    }

    // === Queries ===

    /// Storage width used for field ordering. Arrays get a sentinel
    /// distinct from every other width; references are pointer-sized.
    pub fn width(&self, ty: TypeId) -> u32 {
        match &self.entry(ty).variant {
            TypeVariant::Primitive(kind) => kind.width(),
            TypeVariant::Array { .. } => ARRAY_WIDTH,
            _ => 8,
        }
    }

    /// The `extends` target of a class, or [`TypeId::NONE`].
    pub fn extends_of(&self, ty: TypeId) -> TypeId {
        match &self.entry(ty).variant {
            TypeVariant::Class { extends } => *extends,
            // Arrays extend Array or ArrayNullable.
            TypeVariant::Array { nullable, .. } => {
                if *nullable {
                    TypeId::ARRAY_NULLABLE
                } else {
                    TypeId::ARRAY
                }
            }
            _ => TypeId::NONE,
        }
    }

    /// Render a type for diagnostics: `Stack<int>`, `int[]`, `(int, int)`.
    pub fn display(&self, ty: TypeId, interner: &StringInterner) -> String {
        if ty.is_none() {
            return "<none>".to_string();
        }
        let entry = self.entry(ty);
        match &entry.variant {
            TypeVariant::Primitive(kind) => kind.keyword().to_string(),
            TypeVariant::Array {
                base,
                nullable,
                dims,
            } => {
                let mut out = String::new();
                if *nullable {
                    out.push_str("nullable ");
                }
                out.push_str(&self.display(*base, interner));
                out.push('[');
                out.push_str(&",".repeat(*dims as usize - 1));
                out.push(']');
                out
            }
            TypeVariant::Sequence { elements } => {
                let inner: Vec<String> =
                    elements.iter().map(|e| self.display(*e, interner)).collect();
                format!("({})", inner.join(", "))
            }
            TypeVariant::Method {
                params, returns, ..
            } => {
                let ps: Vec<String> = params.iter().map(|p| self.display(*p, interner)).collect();
                let rs: Vec<String> = returns.iter().map(|r| self.display(*r, interner)).collect();
                format!("({}) => ({})", ps.join(", "), rs.join(", "))
            }
            _ if !entry.type_args.is_empty() => {
                let args: Vec<String> = entry
                    .type_args
                    .iter()
                    .map(|a| self.display(*a, interner))
                    .collect();
                format!("{}<{}>", interner.resolve(entry.name), args.join(", "))
            }
            _ => interner.resolve(entry.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtins_land_on_fixed_indices() {
        let interner = StringInterner::new();
        let pool = TypePool::new(&interner);
        assert!(matches!(
            pool.entry(TypeId::INT).variant,
            TypeVariant::Primitive(PrimitiveKind::Int)
        ));
        assert!(pool.entry(TypeId::OBJECT).is_class());
        assert_eq!(pool.extends_of(TypeId::OBJECT), TypeId::NONE);
        assert_eq!(pool.extends_of(TypeId::EXCEPTION), TypeId::OBJECT);
        assert_eq!(pool.len() as u32, TypeId::FIRST_DYNAMIC);
    }

    #[test]
    fn arrays_are_interned() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let a = pool.array_of(TypeId::INT, 1, false);
        let b = pool.array_of(TypeId::INT, 1, false);
        let c = pool.array_of(TypeId::INT, 1, true);
        let d = pool.array_of(TypeId::INT, 2, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(pool.extends_of(a), TypeId::ARRAY);
        assert_eq!(pool.extends_of(c), TypeId::ARRAY_NULLABLE);
    }

    #[test]
    fn void_is_the_empty_sequence() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let void1 = pool.sequence_of(vec![]);
        let void2 = pool.sequence_of(vec![]);
        assert_eq!(void1, void2);
    }

    #[test]
    fn singleton_sequences_unwrap_to_their_element() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let single = pool.sequence_of(vec![TypeId::INT]);
        assert_eq!(single, TypeId::INT);
        assert!(pool.is_subtype(single, TypeId::INT));
        let single_string = pool.sequence_of(vec![TypeId::STRING]);
        assert!(pool.is_subtype(single_string, TypeId::OBJECT));
    }

    #[test]
    fn width_sentinel_for_arrays() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let arr = pool.array_of(TypeId::DOUBLE, 1, false);
        assert_eq!(pool.width(arr), ARRAY_WIDTH);
        assert_eq!(pool.width(TypeId::DOUBLE), 8);
        assert_eq!(pool.width(TypeId::BOOLEAN), 1);
        assert_eq!(pool.width(TypeId::STRING), 8);
    }

    #[test]
    #[should_panic(expected = "after freeze")]
    fn mutation_after_freeze_panics() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        pool.freeze();
        let name = interner.intern("Late");
        pool.new_class(name, name, Modifiers::PUBLIC, TypeId::OBJECT);
    }
}
