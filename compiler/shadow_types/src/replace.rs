//! Type-parameter substitution and the instantiation cache.
//!
//! `replace` rewrites a type with formal parameters bound to actuals,
//! walking extends, interfaces, inner types, field types, and method
//! signatures. Instantiations are cached on the uninstantiated type keyed
//! by the actual-argument sequence, so `Stack<int>` is one identity no
//! matter how many times it is requested.
//!
//! The member walk can reach the type being instantiated (a `Node<T>` field
//! inside `Node<T>`), so the cache entry is inserted *before* members are
//! substituted; the recursive lookup then resolves to the reserved id.

use shadow_ir::TypeId;

use crate::entry::{FieldInfo, TypeVariant};
use crate::TypePool;

/// Internal invariant breach: substitution called with mismatched arity.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ReplaceError {
    pub expected: usize,
    pub found: usize,
}

impl std::fmt::Display for ReplaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type argument arity mismatch: expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl std::error::Error for ReplaceError {}

impl TypePool {
    /// Substitute `formals` with `actuals` throughout `ty`.
    pub fn replace(
        &mut self,
        ty: TypeId,
        formals: &[TypeId],
        actuals: &[TypeId],
    ) -> Result<TypeId, ReplaceError> {
        if formals.len() != actuals.len() {
            return Err(ReplaceError {
                expected: formals.len(),
                found: actuals.len(),
            });
        }
        tracing::trace!(ty = ty.raw(), args = actuals.len(), "replace");
        Ok(self.substitute(ty, formals, actuals))
    }

    fn substitute(&mut self, ty: TypeId, formals: &[TypeId], actuals: &[TypeId]) -> TypeId {
        if ty.is_none() {
            return ty;
        }
        if let Some(pos) = formals.iter().position(|&f| f == ty) {
            return actuals[pos];
        }

        match self.entry(ty).variant.clone() {
            TypeVariant::Primitive(_)
            | TypeVariant::Null
            | TypeVariant::Unknown
            | TypeVariant::Attribute
            // A parameter that is not among the formals stays free.
            | TypeVariant::TypeParameter { .. } => ty,

            TypeVariant::Array {
                base,
                nullable,
                dims,
            } => {
                let new_base = self.substitute(base, formals, actuals);
                if new_base == base {
                    ty
                } else {
                    self.array_of(new_base, dims, nullable)
                }
            }

            TypeVariant::Sequence { elements } => {
                let new_elements: Vec<TypeId> = elements
                    .iter()
                    .map(|&e| self.substitute(e, formals, actuals))
                    .collect();
                if new_elements == elements {
                    ty
                } else {
                    self.sequence_of(new_elements)
                }
            }

            TypeVariant::Method {
                outer,
                params,
                returns,
                kind,
            } => {
                let new_outer = self.substitute(outer, formals, actuals);
                let new_params: Vec<TypeId> = params
                    .iter()
                    .map(|&p| self.substitute(p, formals, actuals))
                    .collect();
                let new_returns: Vec<TypeId> = returns
                    .iter()
                    .map(|&r| self.substitute(r, formals, actuals))
                    .collect();
                if new_outer == outer && new_params == params && new_returns == returns {
                    ty
                } else {
                    let entry = self.entry(ty);
                    let (name, modifiers) = (entry.name, entry.modifiers);
                    self.method_type(new_outer, name, new_params, new_returns, kind, modifiers)
                }
            }

            TypeVariant::Class { .. } | TypeVariant::Interface => {
                self.instantiate(ty, formals, actuals)
            }
        }
    }

    /// Instantiate a class or interface under a substitution.
    fn instantiate(&mut self, ty: TypeId, formals: &[TypeId], actuals: &[TypeId]) -> TypeId {
        let entry = self.entry(ty);
        let base = if entry.uninstantiated.is_none() {
            ty
        } else {
            entry.uninstantiated
        };

        // The current arguments: the formals themselves on an
        // uninstantiated generic, the recorded actuals otherwise.
        let cur_args = if entry.type_args.is_empty() {
            entry.type_params.clone()
        } else {
            entry.type_args.clone()
        };

        let new_args: Vec<TypeId> = cur_args
            .iter()
            .map(|&a| self.substitute(a, formals, actuals))
            .collect();

        if new_args == cur_args {
            return ty;
        }
        if let Some(&cached) = self.instantiations.get(&(base, new_args.clone())) {
            return cached;
        }

        // Reserve the id and publish it before walking members, so
        // recursive references to this same instantiation resolve here.
        let base_entry = self.entry(base).clone();
        let mut reserved = base_entry.clone();
        reserved.uninstantiated = base;
        reserved.type_args = new_args.clone();
        reserved.interfaces = Vec::new();
        reserved.inners = Vec::new();
        reserved.fields = Vec::new();
        reserved.methods = Vec::new();
        reserved.referenced = Vec::new();
        if let TypeVariant::Class { .. } = reserved.variant {
            reserved.variant = TypeVariant::Class {
                extends: TypeId::NONE,
            };
        }
        let id = self.clone_entry_for_instantiation(reserved);
        self.instantiations.insert((base, new_args.clone()), id);

        // Members are written in terms of the base's formals.
        let base_formals = base_entry.type_params.clone();

        if let TypeVariant::Class { extends } = base_entry.variant {
            let new_extends = self.substitute(extends, &base_formals, &new_args);
            self.entry_mut(id).variant = TypeVariant::Class {
                extends: new_extends,
            };
        }

        let new_interfaces: Vec<TypeId> = base_entry
            .interfaces
            .iter()
            .map(|&i| self.substitute(i, &base_formals, &new_args))
            .collect();
        let new_inners: Vec<TypeId> = base_entry
            .inners
            .iter()
            .map(|&i| self.substitute(i, &base_formals, &new_args))
            .collect();
        let new_fields: Vec<FieldInfo> = base_entry
            .fields
            .iter()
            .map(|f| FieldInfo {
                name: f.name,
                ty: self.substitute(f.ty, &base_formals, &new_args),
                modifiers: f.modifiers,
                initializer: f.initializer,
            })
            .collect();
        let new_methods: Vec<_> = base_entry
            .methods
            .iter()
            .map(|(name, overloads)| {
                let subbed: Vec<TypeId> = overloads
                    .iter()
                    .map(|&m| self.substitute(m, &base_formals, &new_args))
                    .collect();
                (*name, subbed)
            })
            .collect();

        let entry = self.entry_mut(id);
        entry.interfaces = new_interfaces;
        entry.inners = new_inners;
        entry.fields = new_fields;
        entry.methods = new_methods;
        id
    }

    /// Does `ty` (or any base, interface, member, or inner type of it)
    /// contain a free type parameter?
    pub fn is_recursively_parameterized(&self, ty: TypeId) -> bool {
        let mut visited = rustc_hash::FxHashSet::default();
        self.contains_free_parameter(ty, &mut visited)
    }

    fn contains_free_parameter(
        &self,
        ty: TypeId,
        visited: &mut rustc_hash::FxHashSet<TypeId>,
    ) -> bool {
        if ty.is_none() || !visited.insert(ty) {
            return false;
        }
        let entry = self.entry(ty);
        match &entry.variant {
            TypeVariant::TypeParameter { .. } => true,
            TypeVariant::Primitive(_)
            | TypeVariant::Null
            | TypeVariant::Unknown
            | TypeVariant::Attribute => false,
            TypeVariant::Array { base, .. } => self.contains_free_parameter(*base, visited),
            TypeVariant::Sequence { elements } => elements
                .iter()
                .any(|&e| self.contains_free_parameter(e, visited)),
            TypeVariant::Method {
                params, returns, ..
            } => {
                params
                    .iter()
                    .any(|&p| self.contains_free_parameter(p, visited))
                    || returns
                        .iter()
                        .any(|&r| self.contains_free_parameter(r, visited))
            }
            TypeVariant::Class { extends } => {
                (entry.uninstantiated.is_none() && !entry.type_params.is_empty())
                    || entry
                        .type_args
                        .iter()
                        .any(|&a| self.contains_free_parameter(a, visited))
                    || (!extends.is_none() && self.contains_free_parameter(*extends, visited))
                    || entry
                        .interfaces
                        .iter()
                        .chain(entry.inners.iter())
                        .any(|&t| self.contains_free_parameter(t, visited))
            }
            TypeVariant::Interface => {
                (entry.uninstantiated.is_none() && !entry.type_params.is_empty())
                    || entry
                        .type_args
                        .iter()
                        .any(|&a| self.contains_free_parameter(a, visited))
                    || entry
                        .interfaces
                        .iter()
                        .chain(entry.inners.iter())
                        .any(|&t| self.contains_free_parameter(t, visited))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use shadow_ir::{Modifiers, StringInterner};

    use super::*;
    use shadow_ir::MethodKind;

    /// `Stack<T> { T top; push(T) => (); peek() => (T); }`
    fn generic_stack(pool: &mut TypePool, interner: &StringInterner) -> (TypeId, TypeId) {
        let t = pool.new_type_parameter(interner.intern("T"), vec![]);
        let name = interner.intern("Stack");
        let qualified = interner.intern("shadow:utility@Stack");
        let stack = pool.new_class(name, qualified, Modifiers::PUBLIC, TypeId::OBJECT);
        pool.add_type_parameter(stack, t);
        pool.add_field(stack, interner.intern("top"), t, Modifiers::NULLABLE, None);
        let push = pool.method_type(
            stack,
            interner.intern("push"),
            vec![t],
            vec![],
            MethodKind::Method,
            Modifiers::PUBLIC,
        );
        pool.add_method(stack, interner.intern("push"), push);
        let peek = pool.method_type(
            stack,
            interner.intern("peek"),
            vec![],
            vec![t],
            MethodKind::Method,
            Modifiers::PUBLIC,
        );
        pool.add_method(stack, interner.intern("peek"), peek);
        (stack, t)
    }

    #[test]
    fn instantiation_is_cached_by_identity() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let (stack, t) = generic_stack(&mut pool, &interner);

        let of_int = pool.replace(stack, &[t], &[TypeId::INT]).unwrap();
        let of_int_again = pool.replace(stack, &[t], &[TypeId::INT]).unwrap();
        let of_string = pool.replace(stack, &[t], &[TypeId::STRING]).unwrap();

        assert_eq!(of_int, of_int_again);
        assert_ne!(of_int, of_string);
        assert_ne!(of_int, stack);
        assert_eq!(pool.entry(of_int).uninstantiated, stack);
        assert_eq!(pool.entry(of_int).type_args, vec![TypeId::INT]);
    }

    #[test]
    fn substitution_reaches_fields_and_signatures() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let (stack, t) = generic_stack(&mut pool, &interner);

        let of_int = pool.replace(stack, &[t], &[TypeId::INT]).unwrap();
        let entry = pool.entry(of_int);
        assert_eq!(entry.fields[0].ty, TypeId::INT);

        let push = entry.overloads(interner.intern("push")).unwrap()[0];
        match &pool.entry(push).variant {
            TypeVariant::Method { params, .. } => assert_eq!(params, &vec![TypeId::INT]),
            other => panic!("expected method signature, got {other:?}"),
        }
    }

    #[test]
    fn recursive_member_types_resolve_to_the_same_instantiation() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let t = pool.new_type_parameter(interner.intern("T"), vec![]);
        let name = interner.intern("Node");
        let node = pool.new_class(name, name, Modifiers::PUBLIC, TypeId::OBJECT);
        pool.add_type_parameter(node, t);
        // Node<T> { Node<T> next; } - the field references the generic itself.
        pool.add_field(node, interner.intern("next"), node, Modifiers::NULLABLE, None);

        let of_int = pool.replace(node, &[t], &[TypeId::INT]).unwrap();
        assert_eq!(pool.entry(of_int).fields[0].ty, of_int);
    }

    #[test]
    fn identity_substitution_returns_self() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let (stack, t) = generic_stack(&mut pool, &interner);
        let same = pool.replace(stack, &[t], &[t]).unwrap();
        assert_eq!(same, stack);
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let (stack, t) = generic_stack(&mut pool, &interner);
        let err = pool.replace(stack, &[t], &[]).unwrap_err();
        assert_eq!(err, ReplaceError { expected: 1, found: 0 });
    }

    #[test]
    fn arrays_substitute_through_their_base() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let t = pool.new_type_parameter(interner.intern("T"), vec![]);
        let arr_t = pool.array_of(t, 1, false);
        let arr_int = pool.replace(arr_t, &[t], &[TypeId::INT]).unwrap();
        let direct = pool.array_of(TypeId::INT, 1, false);
        assert_eq!(arr_int, direct);
    }

    #[test]
    fn parameterization_detection() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let (stack, t) = generic_stack(&mut pool, &interner);
        assert!(pool.is_recursively_parameterized(stack));
        assert!(pool.is_recursively_parameterized(t));
        assert!(!pool.is_recursively_parameterized(TypeId::INT));
        let of_int = pool.replace(stack, &[t], &[TypeId::INT]).unwrap();
        // Fully instantiated: no free parameter remains.
        assert!(!pool.is_recursively_parameterized(of_int));
    }
}
