//! Method lookup: overload resolution and the interface closure.

use rustc_hash::FxHashSet;
use shadow_ir::{Name, TypeId};

use crate::entry::TypeVariant;
use crate::TypePool;

/// A resolved method: the signature entry plus the type it was found on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MethodRef {
    pub owner: TypeId,
    pub signature: TypeId,
    /// Index into the owner's overload list for this name.
    pub overload: u32,
}

/// Why resolution failed. The caller turns this into
/// `NO_MATCHING_METHOD` or `AMBIGUOUS_OVERLOAD`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ResolveError {
    NotFound,
    /// Two or more applicable candidates, none strictly more specific.
    Ambiguous(Vec<MethodRef>),
}

/// A candidate during resolution.
#[derive(Copy, Clone)]
struct Candidate {
    method: MethodRef,
    /// 0 = declared on the receiver type itself, 1 = one supertype up, …
    depth: u32,
    /// Position in overall declaration order, for the final tie-break.
    order: u32,
}

impl TypePool {
    /// Transitive interface closure of `ty`, deduplicated, including `ty`
    /// itself when it is an interface.
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        let mut stack = vec![ty];
        while let Some(current) = stack.pop() {
            if current.is_none() || !seen.insert(current) {
                continue;
            }
            let entry = self.entry(current);
            if entry.is_interface() {
                out.push(current);
            }
            stack.extend(entry.interfaces.iter().copied());
            if let TypeVariant::Class { extends } = entry.variant {
                stack.push(extends);
            }
        }
        out
    }

    /// Resolve a call of `name` on `ty` with the given argument types.
    ///
    /// `type_args` instantiates a parameterized method before scoring; an
    /// empty slice means the method is not generic (or the arguments were
    /// already substituted by the caller).
    pub fn matching_method(
        &mut self,
        ty: TypeId,
        name: Name,
        args: &[TypeId],
        type_args: &[TypeId],
    ) -> Result<MethodRef, ResolveError> {
        let mut candidates = Vec::new();
        self.collect_candidates(ty, name, &mut candidates);

        // Filter by arity, instantiate, then filter by applicability.
        let mut applicable: Vec<Candidate> = Vec::new();
        for mut candidate in candidates {
            let Some(params) = self.signature_params(candidate.method.signature) else {
                continue;
            };
            if params.len() != args.len() {
                continue;
            }
            if !type_args.is_empty() {
                let formals = self.entry(candidate.method.signature).type_params.clone();
                if formals.len() != type_args.len() {
                    continue;
                }
                match self.replace(candidate.method.signature, &formals, type_args) {
                    Ok(instantiated) => candidate.method.signature = instantiated,
                    Err(_) => continue,
                }
            }
            let params = self
                .signature_params(candidate.method.signature)
                .unwrap_or_default();
            let fits = params
                .iter()
                .zip(args.iter())
                .all(|(&p, &a)| self.is_subtype(a, p));
            if fits {
                applicable.push(candidate);
            }
        }

        if applicable.is_empty() {
            return Err(ResolveError::NotFound);
        }

        // Keep candidates that no other candidate is strictly more
        // specific than.
        let mut best: Vec<Candidate> = Vec::new();
        'outer: for (i, c) in applicable.iter().enumerate() {
            for (j, other) in applicable.iter().enumerate() {
                if i != j
                    && self.more_specific(other.method.signature, c.method.signature)
                    && !self.more_specific(c.method.signature, other.method.signature)
                {
                    continue 'outer;
                }
            }
            best.push(*c);
        }

        // Tie-breaks: declared here beats inherited, then declaration order.
        let min_depth = best.iter().map(|c| c.depth).min().unwrap_or(0);
        best.retain(|c| c.depth == min_depth);
        best.sort_by_key(|c| c.order);

        // Identical signatures at the same depth are overrides seen through
        // different supertypes; distinct signatures are a real ambiguity.
        let distinct: FxHashSet<TypeId> = best.iter().map(|c| c.method.signature).collect();
        if distinct.len() > 1 {
            return Err(ResolveError::Ambiguous(
                best.iter().map(|c| c.method).collect(),
            ));
        }
        Ok(best[0].method)
    }

    /// Walk `ty` and its supertypes collecting every overload of `name`.
    fn collect_candidates(&self, ty: TypeId, name: Name, out: &mut Vec<Candidate>) {
        let mut order = 0u32;
        let mut seen_types = FxHashSet::default();
        let mut frontier = vec![(ty, 0u32)];
        while let Some((current, depth)) = frontier.pop() {
            if current.is_none() || !seen_types.insert(current) {
                continue;
            }
            let entry = self.entry(current);
            if let Some(overloads) = entry.overloads(name) {
                for (idx, &signature) in overloads.iter().enumerate() {
                    out.push(Candidate {
                        method: MethodRef {
                            owner: current,
                            signature,
                            overload: idx as u32,
                        },
                        depth,
                        order,
                    });
                    order += 1;
                }
            }
            if let TypeVariant::Class { extends } = entry.variant {
                frontier.push((extends, depth + 1));
            }
            for &iface in &entry.interfaces {
                frontier.push((iface, depth + 1));
            }
        }
    }

    fn signature_params(&self, signature: TypeId) -> Option<Vec<TypeId>> {
        match &self.entry(signature).variant {
            TypeVariant::Method { params, .. } => Some(params.clone()),
            _ => None,
        }
    }

    /// `a` is more specific than `b` when every parameter of `a` flows
    /// into the corresponding parameter of `b`.
    fn more_specific(&self, a: TypeId, b: TypeId) -> bool {
        let (Some(pa), Some(pb)) = (self.signature_params(a), self.signature_params(b)) else {
            return false;
        };
        pa.len() == pb.len()
            && pa
                .iter()
                .zip(pb.iter())
                .all(|(&x, &y)| self.is_subtype(x, y))
    }
}

#[cfg(test)]
mod tests {
    use shadow_ir::{Modifiers, StringInterner};

    use super::*;
    use shadow_ir::MethodKind;

    struct Fixture {
        interner: StringInterner,
        pool: TypePool,
    }

    impl Fixture {
        fn new() -> Self {
            let interner = StringInterner::new();
            let pool = TypePool::new(&interner);
            Fixture { interner, pool }
        }

        fn class(&mut self, name: &str, extends: TypeId) -> TypeId {
            let n = self.interner.intern(name);
            self.pool.new_class(n, n, Modifiers::PUBLIC, extends)
        }

        fn method(&mut self, owner: TypeId, name: &str, params: Vec<TypeId>) -> TypeId {
            let n = self.interner.intern(name);
            let sig = self.pool.method_type(
                owner,
                n,
                params,
                vec![],
                MethodKind::Method,
                Modifiers::PUBLIC,
            );
            self.pool.add_method(owner, n, sig);
            sig
        }
    }

    #[test]
    fn picks_the_most_specific_overload() {
        let mut fx = Fixture::new();
        let animal = fx.class("Animal", TypeId::OBJECT);
        let dog = fx.class("Dog", animal);
        let kennel = fx.class("Kennel", TypeId::OBJECT);
        let general = fx.method(kennel, "admit", vec![animal]);
        let specific = fx.method(kennel, "admit", vec![dog]);

        let name = fx.interner.intern("admit");
        let hit = fx.pool.matching_method(kennel, name, &[dog], &[]).unwrap();
        assert_eq!(hit.signature, specific);

        let hit = fx.pool.matching_method(kennel, name, &[animal], &[]).unwrap();
        assert_eq!(hit.signature, general);
    }

    #[test]
    fn missing_method_is_not_found() {
        let mut fx = Fixture::new();
        let c = fx.class("Empty", TypeId::OBJECT);
        let name = fx.interner.intern("absent");
        assert_eq!(
            fx.pool.matching_method(c, name, &[], &[]),
            Err(ResolveError::NotFound)
        );
    }

    #[test]
    fn unrelated_parameter_types_are_ambiguous() {
        let mut fx = Fixture::new();
        let cat = fx.class("Cat", TypeId::OBJECT);
        let dog = fx.class("Dog", TypeId::OBJECT);
        let host = fx.class("Host", TypeId::OBJECT);
        // Both applicable for (null), neither more specific.
        fx.method(host, "greet", vec![cat]);
        fx.method(host, "greet", vec![dog]);

        let name = fx.interner.intern("greet");
        match fx.pool.matching_method(host, name, &[TypeId::NULL], &[]) {
            Err(ResolveError::Ambiguous(candidates)) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn declared_here_beats_inherited() {
        let mut fx = Fixture::new();
        let base = fx.class("Base", TypeId::OBJECT);
        let derived = fx.class("Derived", base);
        fx.method(base, "run", vec![TypeId::INT]);
        let own = fx.method(derived, "run", vec![TypeId::INT]);

        let name = fx.interner.intern("run");
        let hit = fx
            .pool
            .matching_method(derived, name, &[TypeId::INT], &[])
            .unwrap();
        assert_eq!(hit.owner, derived);
        assert_eq!(hit.signature, own);
    }

    #[test]
    fn inherited_methods_are_visible() {
        let mut fx = Fixture::new();
        let base = fx.class("Base", TypeId::OBJECT);
        let derived = fx.class("Derived", base);
        let inherited = fx.method(base, "describe", vec![]);

        let name = fx.interner.intern("describe");
        let hit = fx.pool.matching_method(derived, name, &[], &[]).unwrap();
        assert_eq!(hit.owner, base);
        assert_eq!(hit.signature, inherited);
    }

    #[test]
    fn interface_closure_includes_self_and_dedups() {
        let mut fx = Fixture::new();
        let a = {
            let n = fx.interner.intern("A");
            fx.pool.new_interface(n, n, Modifiers::PUBLIC)
        };
        let b = {
            let n = fx.interner.intern("B");
            fx.pool.new_interface(n, n, Modifiers::PUBLIC)
        };
        let c = {
            let n = fx.interner.intern("C");
            fx.pool.new_interface(n, n, Modifiers::PUBLIC)
        };
        fx.pool.add_interface(b, a);
        fx.pool.add_interface(c, a);
        fx.pool.add_interface(c, b);

        let closure = fx.pool.all_interfaces(c);
        assert!(closure.contains(&a));
        assert!(closure.contains(&b));
        assert!(closure.contains(&c));
        assert_eq!(closure.len(), 3);

        // A class sees its interfaces and theirs, but is not itself listed.
        let cls = fx.class("Impl", TypeId::OBJECT);
        fx.pool.add_interface(cls, c);
        let closure = fx.pool.all_interfaces(cls);
        assert_eq!(closure.len(), 3);
        assert!(!closure.contains(&cls));
    }
}
