//! Methods and modules: the containers TAC nodes live in.

use shadow_ir::{LitValue, MethodKind, Modifiers, Name, Span, TypeId};
use smallvec::SmallVec;

use crate::block::{BlockArena, BlockId};
use crate::node::{LocalId, NodeId, NodeKind, TacNode};

/// One local slot: parameters first, then declared locals, then builder
/// temporaries.
#[derive(Clone, Debug)]
pub struct Local {
    pub name: Name,
    pub ty: TypeId,
    pub modifiers: Modifiers,
    pub is_parameter: bool,
    /// Builder-introduced, not user-declared.
    pub is_temporary: bool,
}

/// One lowered method: locals, the node arena, and its block structure.
///
/// Nodes form a doubly linked sequence from [`TacMethod::entry`]; the
/// arena owns every node and block, so dropping the method drops the
/// whole graph at once.
pub struct TacMethod {
    pub name: Name,
    /// The signature entry in the type pool.
    pub signature: TypeId,
    pub kind: MethodKind,
    pub modifiers: Modifiers,
    /// Declaration site, for member-level diagnostics.
    pub span: Span,
    pub locals: Vec<Local>,
    /// Parameters occupy `locals[..param_count]`.
    pub param_count: usize,
    /// The distinguished entry label.
    pub entry: NodeId,
    pub blocks: BlockArena,
    nodes: Vec<TacNode>,
    tail: Option<NodeId>,
}

impl TacMethod {
    pub fn new(name: Name, signature: TypeId, kind: MethodKind, modifiers: Modifiers) -> Self {
        let mut method = TacMethod {
            name,
            signature,
            kind,
            modifiers,
            span: Span::DUMMY,
            locals: Vec::new(),
            param_count: 0,
            entry: NodeId::from_raw(0),
            blocks: BlockArena::new(),
            nodes: Vec::new(),
            tail: None,
        };
        let root = method.blocks.push_block(None);
        method.entry = method.append(NodeKind::Label, root, Span::DUMMY, TypeId::NONE);
        method
    }

    pub fn add_local(
        &mut self,
        name: Name,
        ty: TypeId,
        modifiers: Modifiers,
        is_parameter: bool,
    ) -> LocalId {
        debug_assert!(
            !is_parameter || self.locals.len() == self.param_count,
            "parameters must be added before locals"
        );
        let id = LocalId::from_raw(self.locals.len() as u32);
        self.locals.push(Local {
            name,
            ty,
            modifiers,
            is_parameter,
            is_temporary: false,
        });
        if is_parameter {
            self.param_count += 1;
        }
        id
    }

    pub fn add_temporary(&mut self, ty: TypeId) -> LocalId {
        let id = LocalId::from_raw(self.locals.len() as u32);
        self.locals.push(Local {
            name: Name::EMPTY,
            ty,
            modifiers: Modifiers::empty(),
            is_parameter: false,
            is_temporary: true,
        });
        id
    }

    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id.index()]
    }

    /// Find a visible local by name, innermost declaration last.
    pub fn local_by_name(&self, name: Name) -> Option<LocalId> {
        self.locals
            .iter()
            .rposition(|l| l.name == name)
            .map(|i| LocalId::from_raw(i as u32))
    }

    /// Append a node at the tail of the sequence.
    pub fn append(&mut self, kind: NodeKind, block: BlockId, span: Span, ty: TypeId) -> NodeId {
        let id = self.new_detached(kind, ty);
        self.place(id, block, span);
        id
    }

    /// Create a node without linking it into the sequence. Forward targets
    /// (labels, phis) are created detached and [`TacMethod::place`]d when
    /// control reaches their position.
    pub fn new_detached(&mut self, kind: NodeKind, ty: TypeId) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(TacNode {
            kind,
            block: BlockId::from_raw(0),
            span: Span::DUMMY,
            ty,
            prev: None,
            next: None,
        });
        id
    }

    /// Link a detached node at the tail, fixing its block and span.
    pub fn place(&mut self, id: NodeId, block: BlockId, span: Span) {
        debug_assert!(
            self.nodes[id.index()].prev.is_none() && self.tail != Some(id),
            "node placed twice"
        );
        let prev = self.tail;
        {
            let node = &mut self.nodes[id.index()];
            node.block = block;
            node.span = span;
            node.prev = prev;
        }
        if let Some(p) = prev {
            self.nodes[p.index()].next = Some(id);
        }
        self.tail = Some(id);
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TacNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut TacNode {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the sequence in order from the entry label.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TacNode)> {
        NodeIter {
            method: self,
            next: Some(self.entry),
        }
    }

    /// Append a `(value, pred)` pair to an existing phi.
    pub fn phi_add_incoming(&mut self, phi: NodeId, value: NodeId, pred: NodeId) {
        match &mut self.nodes[phi.index()].kind {
            NodeKind::Phi { incoming } => incoming.push((value, pred)),
            other => panic!("phi_add_incoming on non-phi node {other:?}"),
        }
    }

    /// The incoming destinations of an indirect branch's phi.
    pub fn indirect_targets(&self, phi: NodeId) -> SmallVec<[NodeId; 4]> {
        match &self.node(phi).kind {
            NodeKind::Phi { incoming } => incoming.iter().map(|&(value, _)| value).collect(),
            _ => SmallVec::new(),
        }
    }
}

struct NodeIter<'a> {
    method: &'a TacMethod,
    next: Option<NodeId>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (NodeId, &'a TacNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.method.node(id);
        self.next = node.next;
        Some((id, node))
    }
}

/// A module constant: name, value, type.
#[derive(Clone, Debug)]
pub struct TacConstant {
    pub name: Name,
    pub value: LitValue,
    pub ty: TypeId,
}

/// A lowered field, in declaration order.
#[derive(Clone, Debug)]
pub struct TacField {
    pub name: Name,
    pub ty: TypeId,
    pub modifiers: Modifiers,
    pub span: Span,
}

/// One compiled module: a top-level class or interface with its methods,
/// constants, and the transitive set of types the emitter must declare.
pub struct TacModule {
    pub ty: TypeId,
    /// Closed under extends, interfaces, inner, outer, and member types;
    /// always contains the primitives and the runtime descriptor classes.
    pub references: Vec<TypeId>,
    pub fields: Vec<TacField>,
    pub constants: Vec<TacConstant>,
    pub methods: Vec<TacMethod>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_maintains_the_linked_sequence() {
        let mut method = TacMethod::new(
            Name::EMPTY,
            TypeId::NONE,
            MethodKind::Method,
            Modifiers::PUBLIC,
        );
        let root = BlockId::from_raw(0);
        let a = method.append(NodeKind::NoOp, root, Span::DUMMY, TypeId::NONE);
        let b = method.append(NodeKind::NoOp, root, Span::DUMMY, TypeId::NONE);

        assert_eq!(method.node(method.entry).next, Some(a));
        assert_eq!(method.node(a).prev, Some(method.entry));
        assert_eq!(method.node(a).next, Some(b));
        assert_eq!(method.node(b).prev, Some(a));
        assert_eq!(method.node(b).next, None);

        let order: Vec<NodeId> = method.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![method.entry, a, b]);
    }

    #[test]
    fn parameters_are_a_prefix_of_locals() {
        let mut method = TacMethod::new(
            Name::EMPTY,
            TypeId::NONE,
            MethodKind::Method,
            Modifiers::PUBLIC,
        );
        method.add_local(Name::from_raw(1), TypeId::INT, Modifiers::empty(), true);
        method.add_local(Name::from_raw(2), TypeId::INT, Modifiers::empty(), true);
        method.add_local(Name::from_raw(3), TypeId::LONG, Modifiers::empty(), false);
        let temp = method.add_temporary(TypeId::BOOLEAN);

        assert_eq!(method.param_count, 2);
        assert!(method.local(LocalId::from_raw(0)).is_parameter);
        assert!(!method.local(LocalId::from_raw(2)).is_parameter);
        assert!(method.local(temp).is_temporary);
    }

    #[test]
    fn shadowing_resolves_to_the_latest_declaration() {
        let mut method = TacMethod::new(
            Name::EMPTY,
            TypeId::NONE,
            MethodKind::Method,
            Modifiers::PUBLIC,
        );
        let name = Name::from_raw(9);
        method.add_local(name, TypeId::INT, Modifiers::empty(), false);
        let second = method.add_local(name, TypeId::LONG, Modifiers::empty(), false);
        assert_eq!(method.local_by_name(name), Some(second));
    }
}
