use std::collections::HashMap;

use super::NodeId;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LinkKind {
    Unconditional,
    ConditionalTrue,
    ConditionalFalse,
}

/// The outgoing edges of a tree root.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Successors {
    Terminal,
    Unconditional(NodeId),
    Conditional { on_true: NodeId, on_false: NodeId },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlFlowGraph {
    pub roots: Vec<NodeId>,
    pub entry: Option<NodeId>,
    pub unconditional: HashMap<NodeId, NodeId>,
    pub on_true: HashMap<NodeId, NodeId>,
    pub on_false: HashMap<NodeId, NodeId>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Panics if the node is malformed, i.e. it has a lone conditional edge or mixes conditional
    /// and unconditional edges.
    pub fn successors(&self, node: NodeId) -> Successors {
        match (
            self.unconditional.get(&node),
            self.on_true.get(&node),
            self.on_false.get(&node),
        ) {
            (None, None, None) => Successors::Terminal,
            (Some(next), None, None) => Successors::Unconditional(*next),
            (None, Some(on_true), Some(on_false)) => Successors::Conditional {
                on_true: *on_true,
                on_false: *on_false,
            },
            (None, Some(_), None) | (None, None, Some(_)) => {
                panic!("node {node:?} has only one conditional successor")
            }
            (Some(_), _, _) => {
                panic!("node {node:?} has both unconditional and conditional successors")
            }
        }
    }

    /// Roots with an incomplete set of outgoing edges, along with the kind of link they can still
    /// take. A root without edges can take any kind of link.
    pub fn final_roots(&self) -> Vec<(NodeId, LinkKind)> {
        self.roots
            .iter()
            .filter(|root| !self.unconditional.contains_key(root))
            .filter_map(|root| {
                match (self.on_true.contains_key(root), self.on_false.contains_key(root)) {
                    (true, true) => None,
                    (true, false) => Some((*root, LinkKind::ConditionalFalse)),
                    (false, true) => Some((*root, LinkKind::ConditionalTrue)),
                    (false, false) => Some((*root, LinkKind::Unconditional)),
                }
            })
            .collect()
    }
}
