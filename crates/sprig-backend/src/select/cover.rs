use std::collections::HashMap;

use log::trace;
use sprig_common::ift::{NodeId, Nodes};
use sprig_common::lir::{Condition, Instruction, Label};
use sprig_common::{Register, Registers};

use super::pattern::Bindings;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContextKind {
    Value,
    Unconditional,
    Conditional,
}

/// What the covered tree is used for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Context {
    /// The tree computes a value into the output register.
    Value,
    /// The tree is evaluated for its effects.
    Unconditional,
    /// The tree is a condition; control goes to `target` when it holds, or when it does not hold
    /// if `invert` is set.
    Conditional { target: Label, invert: bool },
}

impl Context {
    pub fn kind(&self) -> ContextKind {
        match self {
            Self::Value => ContextKind::Value,
            Self::Unconditional => ContextKind::Unconditional,
            Self::Conditional { .. } => ContextKind::Conditional,
        }
    }
}

/// Everything a pattern needs to produce its instructions.
pub struct Emit<'a> {
    /// Output registers of the covered subtrees, in subtree order.
    pub inputs: &'a [Register],
    pub output: Register,
    pub bindings: &'a Bindings,
    pub context: &'a Context,
    pub registers: &'a mut Registers,
}

impl Emit<'_> {
    pub fn input(&self, index: usize) -> Register {
        self.inputs[index]
    }

    /// A jump taken when `condition` holds, flipped for inverted contexts.
    pub fn jump(&self, condition: Condition) -> Instruction {
        match self.context {
            Context::Conditional { target, invert } => {
                let condition = if *invert { condition.negate() } else { condition };
                Instruction::JmpIf(condition, target.clone())
            }
            context => unreachable!("conditional jump emitted in {context:?} context"),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Matched {
    pub subtrees: Vec<NodeId>,
    pub bindings: Bindings,
}

pub trait Pattern {
    fn try_match(&self, nodes: &Nodes, node: NodeId, context: &Context) -> Option<Matched>;

    fn cost(&self) -> u32;

    fn emit(&self, emit: &mut Emit<'_>) -> Vec<Instruction>;
}

/// Turns single trees into instruction sequences.
pub trait Covering {
    fn cover_unconditional(
        &self,
        nodes: &Nodes,
        registers: &mut Registers,
        root: NodeId,
    ) -> Vec<Instruction>;

    fn cover_conditional(
        &self,
        nodes: &Nodes,
        registers: &mut Registers,
        root: NodeId,
        target: &Label,
        invert: bool,
    ) -> Vec<Instruction>;
}

/// Minimum-cost covering by dynamic programming over the tree.
pub struct DynamicCovering<'a, P> {
    patterns: &'a [P],
}

impl<'a, P: Pattern> DynamicCovering<'a, P> {
    pub fn new(patterns: &'a [P]) -> Self {
        Self { patterns }
    }

    fn cover(
        &self,
        nodes: &Nodes,
        registers: &mut Registers,
        root: NodeId,
        context: Context,
    ) -> Vec<Instruction> {
        let mut selector = Selector::new(self.patterns, nodes);

        if selector.best(root, &context).is_none() {
            panic!(
                "no pattern covers node {root:?} ({:?}) in {:?} context",
                nodes[root],
                context.kind()
            );
        }

        let (instructions, _) = selector.emit(registers, root, &context);
        instructions
    }
}

impl<P: Pattern> Covering for DynamicCovering<'_, P> {
    fn cover_unconditional(
        &self,
        nodes: &Nodes,
        registers: &mut Registers,
        root: NodeId,
    ) -> Vec<Instruction> {
        self.cover(nodes, registers, root, Context::Unconditional)
    }

    fn cover_conditional(
        &self,
        nodes: &Nodes,
        registers: &mut Registers,
        root: NodeId,
        target: &Label,
        invert: bool,
    ) -> Vec<Instruction> {
        let context = Context::Conditional {
            target: target.clone(),
            invert,
        };

        self.cover(nodes, registers, root, context)
    }
}

#[derive(Clone, Copy, Debug)]
struct Choice {
    pattern: usize,
    cost: u32,
}

struct Selector<'a, P> {
    patterns: &'a [P],
    nodes: &'a Nodes,
    /// `None` marks a node no pattern can cover.
    choices: HashMap<NodeId, Option<Choice>>,
}

impl<'a, P: Pattern> Selector<'a, P> {
    fn new(patterns: &'a [P], nodes: &'a Nodes) -> Self {
        Self {
            patterns,
            nodes,
            choices: HashMap::new(),
        }
    }

    /// The minimal cost of covering the node, remembering which pattern achieves it. The root is
    /// matched in the requested context, everything below it as a value.
    fn best(&mut self, node: NodeId, context: &Context) -> Option<u32> {
        if let Some(choice) = self.choices.get(&node) {
            return choice.map(|choice| choice.cost);
        }

        let patterns = self.patterns;
        let mut best: Option<Choice> = None;

        for (index, pattern) in patterns.iter().enumerate() {
            let Some(matched) = pattern.try_match(self.nodes, node, context) else {
                continue;
            };

            // a subtree without any cover rules the candidate out
            let Some(cost) = self.total_cost(pattern.cost(), &matched.subtrees) else {
                continue;
            };

            if best.map_or(true, |best| cost < best.cost) {
                best = Some(Choice {
                    pattern: index,
                    cost,
                });
            }
        }

        if let Some(choice) = best {
            trace!(
                "node {node:?} covered by pattern {} at cost {}",
                choice.pattern,
                choice.cost
            );
        }

        self.choices.insert(node, best);
        best.map(|choice| choice.cost)
    }

    fn total_cost(&mut self, own: u32, subtrees: &[NodeId]) -> Option<u32> {
        let mut cost = own;
        for subtree in subtrees {
            cost += self.best(*subtree, &Context::Value)?;
        }
        Some(cost)
    }

    /// Emits the chosen covering of the node, children first, returning the register holding its
    /// value.
    fn emit(
        &self,
        registers: &mut Registers,
        node: NodeId,
        context: &Context,
    ) -> (Vec<Instruction>, Register) {
        let choice = match self.choices.get(&node) {
            Some(Some(choice)) => *choice,
            _ => unreachable!("node {node:?} is emitted without a chosen pattern"),
        };

        let pattern = &self.patterns[choice.pattern];
        let Some(matched) = pattern.try_match(self.nodes, node, context) else {
            unreachable!("chosen pattern no longer matches node {node:?}");
        };

        let mut instructions = Vec::new();
        let mut inputs = Vec::with_capacity(matched.subtrees.len());

        for subtree in matched.subtrees.iter() {
            let (sub, output) = self.emit(registers, *subtree, &Context::Value);
            instructions.extend(sub);
            inputs.push(output);
        }

        let output = registers.fresh();
        let mut emit = Emit {
            inputs: &inputs,
            output,
            bindings: &matched.bindings,
            context,
            registers,
        };

        instructions.extend(pattern.emit(&mut emit));
        (instructions, output)
    }
}
