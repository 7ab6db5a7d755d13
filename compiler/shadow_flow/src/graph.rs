//! Control-flow graph construction from TAC.
//!
//! CFG nodes are *runs*: maximal straight-line node ranges from a label to
//! the next terminator. Edges come from terminator successors, from the
//! incoming destinations of indirect branches, and from the unwind
//! destinations of calls and allocations inside a run.

use rustc_hash::FxHashMap;
use shadow_tac::{BranchKind, NodeId, NodeKind, TacMethod};
use smallvec::SmallVec;

/// Index of a run within its [`Cfg`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct RunId(u32);

impl RunId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One straight-line run: the leading label, every node in order, and the
/// closing terminator.
pub struct Run {
    pub label: NodeId,
    pub nodes: Vec<NodeId>,
    pub terminator: Option<NodeId>,
}

/// The control-flow graph of one method.
pub struct Cfg {
    pub runs: Vec<Run>,
    pub entry: RunId,
    successors: Vec<SmallVec<[RunId; 4]>>,
    predecessors: Vec<Vec<RunId>>,
}

impl Cfg {
    /// Partition `method` into runs and wire the edges.
    pub fn build(method: &TacMethod) -> Cfg {
        let mut runs: Vec<Run> = Vec::new();
        let mut label_to_run: FxHashMap<NodeId, RunId> = FxHashMap::default();

        for (id, node) in method.iter() {
            if matches!(node.kind, NodeKind::Label) {
                let run_id = RunId(runs.len() as u32);
                label_to_run.insert(id, run_id);
                runs.push(Run {
                    label: id,
                    nodes: Vec::new(),
                    terminator: None,
                });
            }
            let current = runs
                .last_mut()
                .unwrap_or_else(|| panic!("node before the entry label"));
            current.nodes.push(id);
            if node.kind.is_terminator() {
                current.terminator = Some(id);
            }
        }

        let mut successors: Vec<SmallVec<[RunId; 4]>> = Vec::with_capacity(runs.len());
        for run in &runs {
            let mut edges: SmallVec<[NodeId; 4]> = SmallVec::new();
            for &node_id in &run.nodes {
                let node = method.node(node_id);
                // Unwind edges leave mid-run.
                match &node.kind {
                    NodeKind::Call { unwind: Some(u), .. }
                    | NodeKind::NewObject { unwind: Some(u), .. }
                    | NodeKind::NewArray { unwind: Some(u), .. } => edges.push(*u),
                    _ => {}
                }
                if node.kind.is_terminator() {
                    match &node.kind {
                        NodeKind::Branch(BranchKind::Indirect { phi }) => {
                            edges.extend(method.indirect_targets(*phi));
                        }
                        kind => edges.extend(kind.successors()),
                    }
                }
            }
            let resolved: SmallVec<[RunId; 4]> = edges
                .into_iter()
                .filter_map(|label| label_to_run.get(&label).copied())
                .collect();
            successors.push(resolved);
        }

        let mut predecessors: Vec<Vec<RunId>> = vec![Vec::new(); runs.len()];
        for (from, edges) in successors.iter().enumerate() {
            for &to in edges {
                let list = &mut predecessors[to.index()];
                if !list.contains(&RunId(from as u32)) {
                    list.push(RunId(from as u32));
                }
            }
        }

        Cfg {
            runs,
            entry: RunId(0),
            successors,
            predecessors,
        }
    }

    pub fn successors(&self, run: RunId) -> &[RunId] {
        &self.successors[run.index()]
    }

    pub fn predecessors(&self, run: RunId) -> &[RunId] {
        &self.predecessors[run.index()]
    }

    pub fn run(&self, id: RunId) -> &Run {
        &self.runs[id.index()]
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = RunId> {
        (0..self.runs.len() as u32).map(RunId)
    }

    /// Runs reachable from the entry, as a membership vector.
    pub fn reachable(&self) -> Vec<bool> {
        let mut reached = vec![false; self.runs.len()];
        let mut stack = vec![self.entry];
        while let Some(run) = stack.pop() {
            if reached[run.index()] {
                continue;
            }
            reached[run.index()] = true;
            stack.extend(self.successors(run).iter().copied());
        }
        reached
    }

    /// Reverse postorder over reachable runs; the natural iteration order
    /// for the forward dataflow passes.
    pub fn reverse_postorder(&self) -> Vec<RunId> {
        let mut visited = vec![false; self.runs.len()];
        let mut order = Vec::with_capacity(self.runs.len());
        self.postorder_visit(self.entry, &mut visited, &mut order);
        order.reverse();
        order
    }

    fn postorder_visit(&self, run: RunId, visited: &mut [bool], order: &mut Vec<RunId>) {
        if visited[run.index()] {
            return;
        }
        visited[run.index()] = true;
        for &succ in self.successors(run) {
            self.postorder_visit(succ, visited, order);
        }
        order.push(run);
    }
}
