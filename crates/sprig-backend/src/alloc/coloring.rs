use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, trace};
use sprig_common::Register;

use super::{coalesce, AllocationResult, Allocator, CoalescedNode};
use crate::liveness::LivenessGraphs;

/// Greedy coloring in coalescing order, preferring colors that turn moves into no-ops.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColoringAllocator;

impl Allocator for ColoringAllocator {
    fn allocate(
        &self,
        graphs: &LivenessGraphs,
        self_colored: &[Register],
        available: &[Register],
    ) -> AllocationResult {
        let stack = coalesce(graphs, self_colored, available);
        let mut coloring = Coloring::new(&stack, graphs, available);

        let self_colored: HashSet<_> = self_colored.iter().copied().collect();
        for (node, coalesced) in stack.iter().enumerate() {
            let fixed = coalesced
                .registers
                .iter()
                .find(|register| self_colored.contains(register));

            if let Some(color) = fixed {
                coloring.assign(node, *color);
            }
        }

        for node in (0..stack.len()).rev() {
            if coloring.colors[node].is_some() {
                continue;
            }

            if coloring.available[node].is_empty() {
                trace!("spilling {:?}", stack[node].registers);
                coloring.spilled.push(node);
                continue;
            }

            let color = coloring
                .best_for_colored(node)
                .or_else(|| coloring.best_for_uncolored(node))
                .unwrap_or(coloring.available[node][0]);

            coloring.assign(node, color);
        }

        let result = coloring.result(&stack);
        debug!(
            "colored {} registers, spilled {}",
            result.allocated.len(),
            result.spilled.len()
        );

        result
    }
}

struct Coloring {
    interference: Vec<BTreeSet<usize>>,
    copies: Vec<BTreeSet<usize>>,

    colors: Vec<Option<Register>>,
    /// Colors still free for each node, in palette order.
    available: Vec<Vec<Register>>,
    spilled: Vec<usize>,
}

impl Coloring {
    pub fn new(stack: &[CoalescedNode], graphs: &LivenessGraphs, available: &[Register]) -> Self {
        let owner: HashMap<Register, usize> = stack
            .iter()
            .enumerate()
            .flat_map(|(node, coalesced)| {
                coalesced
                    .registers
                    .iter()
                    .map(move |register| (*register, node))
            })
            .collect();

        let mut interference = vec![BTreeSet::new(); stack.len()];
        let mut copies = vec![BTreeSet::new(); stack.len()];

        for (register, node) in owner.iter() {
            interference[*node].extend(
                graphs
                    .interference
                    .neighbours(*register)
                    .map(|neighbour| owner[&neighbour]),
            );
            copies[*node].extend(
                graphs
                    .copy
                    .neighbours(*register)
                    .map(|neighbour| owner[&neighbour]),
            );
        }

        for (node, copies) in copies.iter_mut().enumerate() {
            copies.remove(&node);
            copies.retain(|other| !interference[node].contains(other));
        }

        Self {
            interference,
            copies,
            colors: vec![None; stack.len()],
            available: vec![available.to_vec(); stack.len()],
            spilled: Vec::new(),
        }
    }

    pub fn assign(&mut self, node: usize, color: Register) {
        self.colors[node] = Some(color);
        for neighbour in self.interference[node].iter() {
            self.available[*neighbour].retain(|other| *other != color);
        }
    }

    /// The available color most already colored copy neighbours have.
    pub fn best_for_colored(&self, node: usize) -> Option<Register> {
        let colors = self.copies[node]
            .iter()
            .filter_map(|neighbour| self.colors[*neighbour])
            .filter(|color| self.available[node].contains(color));

        most_common(colors)
    }

    /// The available color shared by the most uncolored copy neighbours.
    pub fn best_for_uncolored(&self, node: usize) -> Option<Register> {
        let colors = self.copies[node]
            .iter()
            .filter(|neighbour| self.colors[**neighbour].is_none())
            .flat_map(|neighbour| {
                self.available[node]
                    .iter()
                    .filter(|color| self.available[*neighbour].contains(color))
                    .copied()
            });

        most_common(colors)
    }

    pub fn result(&self, stack: &[CoalescedNode]) -> AllocationResult {
        let mut result = AllocationResult::default();

        for (node, color) in self.colors.iter().enumerate() {
            if let Some(color) = color {
                for register in stack[node].registers.iter() {
                    result.allocated.insert(*register, *color);
                }
            }
        }

        for node in self.spilled.iter() {
            result.spilled.extend(stack[*node].registers.iter().copied());
        }

        result
    }
}

/// The most frequent color, or the first one seen among the most frequent.
fn most_common(colors: impl Iterator<Item = Register>) -> Option<Register> {
    let mut counts: Vec<(Register, usize)> = Vec::new();
    for color in colors {
        match counts.iter_mut().find(|(seen, _)| *seen == color) {
            Some((_, count)) => *count += 1,
            None => counts.push((color, 1)),
        }
    }

    let mut best: Option<(Register, usize)> = None;
    for (color, count) in counts {
        if best.map_or(true, |(_, most)| count > most) {
            best = Some((color, count));
        }
    }

    best.map(|(color, _)| color)
}
