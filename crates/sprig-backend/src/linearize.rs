//! Flattening a control flow graph into a list of labels and instructions.
//!
//! The walk is depth first. Every node gets a label when it is first reached, and a jump to a
//! label is left out when that label comes right after the jump anyway. Labels nothing jumps to
//! are dropped at the end, except the ones carried by labeled nodes.

use std::collections::{HashMap, HashSet};

use log::{debug, info, trace};
use sprig_common::ift::{ControlFlowGraph, Node, NodeId, Nodes, Successors};
use sprig_common::lir::{Instruction, Item, Label};
use sprig_common::Registers;

use crate::select::Covering;

pub fn linearize<C: Covering>(
    cfg: &ControlFlowGraph,
    nodes: &Nodes,
    covering: &C,
    registers: &mut Registers,
) -> Vec<Item> {
    info!("beginning linearization");

    let mut linearizer = Linearizer::new(cfg, nodes, covering, registers);
    if let Some(entry) = cfg.entry {
        linearizer.visit(entry, None);
    }

    let program = linearizer.finish();
    trace!("done linearization");
    program
}

struct Linearizer<'a, C> {
    cfg: &'a ControlFlowGraph,
    nodes: &'a Nodes,
    covering: &'a C,
    registers: &'a mut Registers,

    labels: HashMap<NodeId, Label>,
    /// Nodes already emitted. A node can be labeled before it is emitted.
    emitted: HashSet<NodeId>,
    used: HashSet<Label>,
    items: Vec<Item>,
    fresh: usize,
}

impl<'a, C: Covering> Linearizer<'a, C> {
    pub fn new(
        cfg: &'a ControlFlowGraph,
        nodes: &'a Nodes,
        covering: &'a C,
        registers: &'a mut Registers,
    ) -> Self {
        Self {
            cfg,
            nodes,
            covering,
            registers,
            labels: HashMap::new(),
            emitted: HashSet::new(),
            used: HashSet::new(),
            items: Vec::new(),
            fresh: 0,
        }
    }

    /// Emits `node` and everything reachable from it that has no label yet. `next` is the label
    /// placed right after whatever this call emits.
    pub fn visit(&mut self, mut node: NodeId, next: Option<Label>) {
        loop {
            self.emitted.insert(node);
            let label = self.label_of(node);
            self.items.push(Item::Label(label));

            match self.cfg.successors(node) {
                Successors::Terminal => {
                    self.cover(node);
                    return;
                }

                Successors::Unconditional(target) => {
                    self.cover(node);

                    match self.labels.get(&target).cloned() {
                        Some(label) => {
                            self.jump(label, next.as_ref());
                            return;
                        }
                        None => node = target,
                    }
                }

                Successors::Conditional { on_true, on_false } => {
                    let true_label = self.labels.get(&on_true).cloned();
                    let false_label = self.labels.get(&on_false).cloned();

                    match (true_label, false_label) {
                        (Some(true_label), Some(false_label)) => {
                            self.cover_conditional(node, true_label, false);
                            self.jump(false_label, next.as_ref());
                            return;
                        }

                        (Some(true_label), None) => {
                            self.cover_conditional(node, true_label, false);
                            node = on_false;
                        }

                        (None, Some(false_label)) => {
                            self.cover_conditional(node, false_label, true);
                            node = on_true;
                        }

                        (None, None) => {
                            let false_label = self.label_of(on_false);
                            self.cover_conditional(node, false_label.clone(), true);
                            self.visit(on_true, Some(false_label.clone()));

                            if self.emitted.contains(&on_false) {
                                self.jump(false_label, next.as_ref());
                                return;
                            }

                            node = on_false;
                        }
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Vec<Item> {
        let used = self.used;
        let mut items = self.items;
        let before = items.len();

        items.retain(|item| match item {
            Item::Label(label) => used.contains(label),
            Item::Instruction(_) => true,
        });

        debug!("pruned {} unused labels", before - items.len());
        items
    }

    /// The label of the node, assigning one on first use.
    fn label_of(&mut self, node: NodeId) -> Label {
        if let Some(label) = self.labels.get(&node) {
            return label.clone();
        }

        let label = match self.nodes.get(node) {
            Node::Labeled(label, _) => {
                self.used.insert(label.clone());
                label.clone()
            }
            _ => {
                let label = Label::new(format!("_{}", self.fresh));
                self.fresh += 1;
                label
            }
        };

        self.labels.insert(node, label.clone());
        label
    }

    fn cover(&mut self, node: NodeId) {
        let node = self.nodes.unlabeled(node);
        if let Node::NoOp = self.nodes.get(node) {
            return;
        }

        let instructions = self
            .covering
            .cover_unconditional(self.nodes, self.registers, node);
        self.items
            .extend(instructions.into_iter().map(Item::Instruction));
    }

    fn cover_conditional(&mut self, node: NodeId, target: Label, invert: bool) {
        let node = self.nodes.unlabeled(node);
        let instructions =
            self.covering
                .cover_conditional(self.nodes, self.registers, node, &target, invert);

        self.used.insert(target);
        self.items
            .extend(instructions.into_iter().map(Item::Instruction));
    }

    fn jump(&mut self, label: Label, next: Option<&Label>) {
        if next == Some(&label) {
            return;
        }

        self.used.insert(label.clone());
        self.items.push(Item::Instruction(Instruction::Jmp(label)));
    }
}

#[cfg(test)]
mod tests;
