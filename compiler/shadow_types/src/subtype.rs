//! Nominal subtyping.
//!
//! The rules, in the order they are checked:
//!
//! - reflexive on identity (which covers instantiated generics: equal
//!   arguments intern to the same id)
//! - `null` is a subtype of every reference type; whether the *target* of
//!   an assignment admits `null` is a modifier check the front-end makes
//! - every reference type is a subtype of `Object`; `Object` is a subtype
//!   of nothing but itself
//! - primitives are disjoint — numeric conversion is always an explicit
//!   cast
//! - arrays are invariant in base type and nullability, but are subtypes
//!   of their runtime base (`Array`/`ArrayNullable`) and `Object`
//! - classes follow `extends` and `implements`; interfaces follow their
//!   transitive interface set
//! - sequences are element-wise with matching arity
//! - type parameters are subtypes of their bounds (and `Object`)

use shadow_ir::TypeId;

use crate::entry::TypeVariant;
use crate::TypePool;

impl TypePool {
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        if sub.is_none() || sup.is_none() {
            return false;
        }

        let sub_entry = self.entry(sub);
        let sup_entry = self.entry(sup);

        if matches!(sub_entry.variant, TypeVariant::Null) {
            return sup_entry.is_reference();
        }

        // Everything reference-like flows into Object; Object flows nowhere.
        if sup == TypeId::OBJECT {
            return sub_entry.is_reference();
        }
        if sub == TypeId::OBJECT {
            return false;
        }

        match (&sub_entry.variant, &sup_entry.variant) {
            // Disjoint: identity already handled above.
            (TypeVariant::Primitive(_), _) | (_, TypeVariant::Primitive(_)) => false,

            // Invariant in base and nullability; the only supertypes of an
            // array besides itself are its runtime base classes.
            (TypeVariant::Array { nullable, .. }, _) => {
                let base_class = if *nullable {
                    TypeId::ARRAY_NULLABLE
                } else {
                    TypeId::ARRAY
                };
                sup == base_class || self.is_subtype(base_class, sup)
            }

            (TypeVariant::Sequence { elements: subs }, TypeVariant::Sequence { elements: sups }) => {
                subs.len() == sups.len()
                    && subs
                        .iter()
                        .zip(sups.iter())
                        .all(|(&a, &b)| self.is_subtype(a, b))
            }
            (TypeVariant::Sequence { .. }, _) | (_, TypeVariant::Sequence { .. }) => false,

            // Signatures: parameters invariant, returns element-wise.
            (
                TypeVariant::Method {
                    params: p1,
                    returns: r1,
                    ..
                },
                TypeVariant::Method {
                    params: p2,
                    returns: r2,
                    ..
                },
            ) => {
                p1 == p2
                    && r1.len() == r2.len()
                    && r1
                        .iter()
                        .zip(r2.iter())
                        .all(|(&a, &b)| self.is_subtype(a, b))
            }

            (TypeVariant::TypeParameter { bounds }, _) => {
                bounds.iter().any(|&b| self.is_subtype(b, sup))
            }

            (TypeVariant::Class { extends }, _) => {
                let parent = *extends;
                (!parent.is_none() && self.is_subtype(parent, sup))
                    || sub_entry
                        .interfaces
                        .iter()
                        .any(|&i| self.is_subtype(i, sup))
            }

            (TypeVariant::Interface, TypeVariant::Interface) => sub_entry
                .interfaces
                .iter()
                .any(|&i| self.is_subtype(i, sup)),

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use shadow_ir::{Modifiers, StringInterner};

    use super::*;

    fn class(pool: &mut TypePool, interner: &StringInterner, name: &str, extends: TypeId) -> TypeId {
        let n = interner.intern(name);
        pool.new_class(n, n, Modifiers::PUBLIC, extends)
    }

    #[test]
    fn every_class_is_a_subtype_of_object_and_itself() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let c = class(&mut pool, &interner, "Counter", TypeId::OBJECT);
        assert!(pool.is_subtype(c, TypeId::OBJECT));
        assert!(pool.is_subtype(c, c));
        assert!(!pool.is_subtype(TypeId::OBJECT, c));
        assert!(pool.is_subtype(TypeId::OBJECT, TypeId::OBJECT));
    }

    #[test]
    fn class_subtyping_follows_extends_and_implements() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let comparable = {
            let n = interner.intern("CanCompare");
            pool.new_interface(n, n, Modifiers::PUBLIC)
        };
        let animal = class(&mut pool, &interner, "Animal", TypeId::OBJECT);
        let dog = class(&mut pool, &interner, "Dog", animal);
        pool.add_interface(animal, comparable);

        assert!(pool.is_subtype(dog, animal));
        assert!(pool.is_subtype(dog, comparable));
        assert!(pool.is_subtype(animal, comparable));
        assert!(!pool.is_subtype(animal, dog));
    }

    #[test]
    fn interfaces_are_subtypes_of_object() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let n = interner.intern("CanIterate");
        let iface = pool.new_interface(n, n, Modifiers::PUBLIC);
        assert!(pool.is_subtype(iface, TypeId::OBJECT));
    }

    #[test]
    fn primitives_are_disjoint() {
        let interner = StringInterner::new();
        let pool = TypePool::new(&interner);
        assert!(pool.is_subtype(TypeId::INT, TypeId::INT));
        assert!(!pool.is_subtype(TypeId::INT, TypeId::LONG));
        assert!(!pool.is_subtype(TypeId::BYTE, TypeId::INT));
        assert!(!pool.is_subtype(TypeId::INT, TypeId::OBJECT));
    }

    #[test]
    fn arrays_are_invariant() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let animal = class(&mut pool, &interner, "Animal", TypeId::OBJECT);
        let dog = class(&mut pool, &interner, "Dog", animal);
        let animals = pool.array_of(animal, 1, false);
        let dogs = pool.array_of(dog, 1, false);
        let dogs_nullable = pool.array_of(dog, 1, true);

        assert!(!pool.is_subtype(dogs, animals));
        assert!(!pool.is_subtype(dogs_nullable, dogs));
        assert!(pool.is_subtype(dogs, TypeId::ARRAY));
        assert!(pool.is_subtype(dogs_nullable, TypeId::ARRAY_NULLABLE));
        assert!(pool.is_subtype(dogs, TypeId::OBJECT));
    }

    #[test]
    fn null_flows_into_references_only() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let c = class(&mut pool, &interner, "Node", TypeId::OBJECT);
        assert!(pool.is_subtype(TypeId::NULL, c));
        assert!(pool.is_subtype(TypeId::NULL, TypeId::STRING));
        assert!(!pool.is_subtype(TypeId::NULL, TypeId::INT));
    }

    #[test]
    fn sequences_match_element_wise() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let animal = class(&mut pool, &interner, "Animal", TypeId::OBJECT);
        let dog = class(&mut pool, &interner, "Dog", animal);
        let pair_sub = pool.sequence_of(vec![dog, TypeId::INT]);
        let pair_sup = pool.sequence_of(vec![animal, TypeId::INT]);
        let triple = pool.sequence_of(vec![animal, TypeId::INT, TypeId::INT]);

        assert!(pool.is_subtype(pair_sub, pair_sup));
        assert!(!pool.is_subtype(pair_sup, pair_sub));
        assert!(!pool.is_subtype(pair_sub, triple));
    }

    #[test]
    fn type_parameters_flow_into_their_bounds() {
        let interner = StringInterner::new();
        let mut pool = TypePool::new(&interner);
        let n = interner.intern("CanHash");
        let bound = pool.new_interface(n, n, Modifiers::PUBLIC);
        let t = pool.new_type_parameter(interner.intern("T"), vec![bound]);
        assert!(pool.is_subtype(t, bound));
        assert!(pool.is_subtype(t, TypeId::OBJECT));
        assert!(!pool.is_subtype(bound, t));
    }
}
