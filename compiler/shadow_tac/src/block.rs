//! Lexical blocks and their control-transfer labels.
//!
//! Blocks nest via parent links and exist only while a method is being
//! built: each carries up to one label per [`LabelRole`] plus the cleanup
//! phi. Lookup walks the parent chain; setting a role twice on one block
//! is a builder bug and fails.

use bitflags::bitflags;

use crate::node::NodeId;

/// Index of a block within its method's block arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        BlockId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The label roles a block can own.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LabelRole {
    Break,
    Continue,
    Recover,
    Done,
    Catch,
    CatchSwitch,
    Cleanup,
    CleanupUnwind,
}

impl LabelRole {
    const COUNT: usize = 8;

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct BlockFlags: u8 {
        /// This finally is reachable by an unwind.
        const UNWIND_TARGET = 1 << 0;
        /// There is cleanup code here; suppresses dead-code warnings for
        /// runs inside it.
        const CLEANUP_TARGET = 1 << 1;
    }
}

/// Error from [`BlockArena::set_label`]: the role was already claimed.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct LabelAlreadySet {
    pub block: BlockId,
    pub role: LabelRole,
}

#[derive(Clone, Debug)]
struct Block {
    parent: Option<BlockId>,
    labels: [Option<NodeId>; LabelRole::COUNT],
    cleanup_phi: Option<NodeId>,
    flags: BlockFlags,
}

/// All blocks of one method.
#[derive(Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block nested under `parent` (`None` for the method root).
    pub fn push_block(&mut self, parent: Option<BlockId>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            parent,
            labels: [None; LabelRole::COUNT],
            cleanup_phi: None,
            flags: BlockFlags::empty(),
        });
        id
    }

    pub fn parent(&self, block: BlockId) -> Option<BlockId> {
        self.blocks[block.index()].parent
    }

    /// Claim `role` on `block`. One-shot: a second claim fails.
    pub fn set_label(
        &mut self,
        block: BlockId,
        role: LabelRole,
        label: NodeId,
    ) -> Result<(), LabelAlreadySet> {
        let slot = &mut self.blocks[block.index()].labels[role.slot()];
        if slot.is_some() {
            return Err(LabelAlreadySet { block, role });
        }
        *slot = Some(label);
        Ok(())
    }

    /// The label for `role` on `block` itself, not the ancestors.
    pub fn own_label(&self, block: BlockId, role: LabelRole) -> Option<NodeId> {
        self.blocks[block.index()].labels[role.slot()]
    }

    /// Find `role` by walking `block` and its ancestors; returns the
    /// owning block too, so callers know how far out they are jumping.
    pub fn find_label(&self, block: BlockId, role: LabelRole) -> Option<(BlockId, NodeId)> {
        let mut current = Some(block);
        while let Some(b) = current {
            if let Some(label) = self.blocks[b.index()].labels[role.slot()] {
                return Some((b, label));
            }
            current = self.blocks[b.index()].parent;
        }
        None
    }

    pub fn set_cleanup_phi(&mut self, block: BlockId, phi: NodeId) {
        debug_assert!(
            self.blocks[block.index()].cleanup_phi.is_none(),
            "cleanup phi set twice"
        );
        self.blocks[block.index()].cleanup_phi = Some(phi);
    }

    pub fn cleanup_phi(&self, block: BlockId) -> Option<NodeId> {
        self.blocks[block.index()].cleanup_phi
    }

    pub fn add_flags(&mut self, block: BlockId, flags: BlockFlags) {
        self.blocks[block.index()].flags |= flags;
    }

    pub fn flags(&self, block: BlockId) -> BlockFlags {
        self.blocks[block.index()].flags
    }

    /// Is `block` (or an ancestor) cleanup code? Dead-code warnings are
    /// suppressed inside.
    pub fn is_inside_cleanup(&self, block: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(b) = current {
            if self.blocks[b.index()].flags.contains(BlockFlags::CLEANUP_TARGET) {
                return true;
            }
            current = self.blocks[b.index()].parent;
        }
        false
    }

    /// Mark every finally enclosing `block` as reachable by unwind, and
    /// return the nearest unwind destination (a catch switch or a cleanup
    /// unwind label), if any.
    pub fn add_unwind_source(&mut self, block: BlockId) -> Option<NodeId> {
        let mut nearest = None;
        let mut current = Some(block);
        while let Some(b) = current {
            let entry = &mut self.blocks[b.index()];
            if entry.labels[LabelRole::Cleanup.slot()].is_some() {
                entry.flags |= BlockFlags::UNWIND_TARGET;
            }
            if nearest.is_none() {
                nearest = entry.labels[LabelRole::CatchSwitch.slot()]
                    .or(entry.labels[LabelRole::CleanupUnwind.slot()]);
            }
            current = entry.parent;
        }
        nearest
    }

    /// Blocks from `from` up to (excluding) `stop` that own a cleanup
    /// label, innermost first. `stop == None` walks to the root.
    pub fn cleanups_between(&self, from: BlockId, stop: Option<BlockId>) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut current = Some(from);
        while let Some(b) = current {
            if Some(b) == stop {
                break;
            }
            if self.blocks[b.index()].labels[LabelRole::Cleanup.slot()].is_some() {
                out.push(b);
            }
            current = self.blocks[b.index()].parent;
        }
        out
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_lookup_walks_the_parent_chain() {
        let mut arena = BlockArena::new();
        let outer = arena.push_block(None);
        let inner = arena.push_block(Some(outer));
        let label = NodeId::from_raw(7);
        arena.set_label(outer, LabelRole::Break, label).unwrap();

        assert_eq!(arena.find_label(inner, LabelRole::Break), Some((outer, label)));
        assert_eq!(arena.find_label(inner, LabelRole::Continue), None);
        assert_eq!(arena.own_label(inner, LabelRole::Break), None);
    }

    #[test]
    fn roles_are_one_shot() {
        let mut arena = BlockArena::new();
        let block = arena.push_block(None);
        arena
            .set_label(block, LabelRole::Cleanup, NodeId::from_raw(1))
            .unwrap();
        let err = arena
            .set_label(block, LabelRole::Cleanup, NodeId::from_raw(2))
            .unwrap_err();
        assert_eq!(err.role, LabelRole::Cleanup);
        // The original claim survives.
        assert_eq!(
            arena.own_label(block, LabelRole::Cleanup),
            Some(NodeId::from_raw(1))
        );
    }

    #[test]
    fn nearest_role_wins() {
        let mut arena = BlockArena::new();
        let outer = arena.push_block(None);
        let inner = arena.push_block(Some(outer));
        let outer_break = NodeId::from_raw(1);
        let inner_break = NodeId::from_raw(2);
        arena.set_label(outer, LabelRole::Break, outer_break).unwrap();
        arena.set_label(inner, LabelRole::Break, inner_break).unwrap();

        assert_eq!(
            arena.find_label(inner, LabelRole::Break),
            Some((inner, inner_break))
        );
    }

    #[test]
    fn unwind_source_marks_enclosing_finallys() {
        let mut arena = BlockArena::new();
        let try_outer = arena.push_block(None);
        arena
            .set_label(try_outer, LabelRole::Cleanup, NodeId::from_raw(1))
            .unwrap();
        arena
            .set_label(try_outer, LabelRole::CleanupUnwind, NodeId::from_raw(2))
            .unwrap();
        let body = arena.push_block(Some(try_outer));

        let nearest = arena.add_unwind_source(body);
        assert_eq!(nearest, Some(NodeId::from_raw(2)));
        assert!(arena.flags(try_outer).contains(BlockFlags::UNWIND_TARGET));
    }

    #[test]
    fn cleanup_flag_is_inherited() {
        let mut arena = BlockArena::new();
        let finally = arena.push_block(None);
        arena.add_flags(finally, BlockFlags::CLEANUP_TARGET);
        let nested = arena.push_block(Some(finally));
        assert!(arena.is_inside_cleanup(nested));
        let sibling = arena.push_block(None);
        assert!(!arena.is_inside_cleanup(sibling));
    }

    #[test]
    fn cleanups_between_collects_innermost_first() {
        let mut arena = BlockArena::new();
        let outer_try = arena.push_block(None);
        arena
            .set_label(outer_try, LabelRole::Cleanup, NodeId::from_raw(10))
            .unwrap();
        let loop_block = arena.push_block(Some(outer_try));
        arena
            .set_label(loop_block, LabelRole::Break, NodeId::from_raw(20))
            .unwrap();
        let inner_try = arena.push_block(Some(loop_block));
        arena
            .set_label(inner_try, LabelRole::Cleanup, NodeId::from_raw(30))
            .unwrap();
        let body = arena.push_block(Some(inner_try));

        assert_eq!(arena.cleanups_between(body, None), vec![inner_try, outer_try]);
        assert_eq!(arena.cleanups_between(body, Some(outer_try)), vec![inner_try]);
    }
}
