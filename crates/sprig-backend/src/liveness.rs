//! Liveness analysis over a linear program, and the interference and copy graphs derived from it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, trace};
use sprig_common::lir::{Flow, Item, Label};
use sprig_common::Register;

/// An undirected graph over registers. Every register mentioned by the program is a vertex, even
/// when it has no edges.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Graph {
    edges: BTreeMap<Register, BTreeSet<Register>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, register: Register) {
        self.edges.entry(register).or_default();
    }

    /// Adds an edge between two registers. Self loops are ignored.
    pub fn add_edge(&mut self, a: Register, b: Register) {
        self.add_vertex(a);
        self.add_vertex(b);

        if a != b {
            self.edges.entry(a).or_default().insert(b);
            self.edges.entry(b).or_default().insert(a);
        }
    }

    pub fn contains(&self, register: Register) -> bool {
        self.edges.contains_key(&register)
    }

    pub fn has_edge(&self, a: Register, b: Register) -> bool {
        self.edges
            .get(&a)
            .map(|neighbours| neighbours.contains(&b))
            .unwrap_or(false)
    }

    /// Vertices in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = Register> + '_ {
        self.edges.keys().copied()
    }

    pub fn neighbours(&self, register: Register) -> impl Iterator<Item = Register> + '_ {
        self.edges.get(&register).into_iter().flatten().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// The graph restricted to `keep`. Registers in `keep` that are not vertices are left out.
    pub fn induced_subgraph(&self, keep: &BTreeSet<Register>) -> Self {
        let edges = self
            .edges
            .iter()
            .filter(|(register, _)| keep.contains(register))
            .map(|(register, neighbours)| {
                let neighbours = neighbours.intersection(keep).copied().collect();
                (*register, neighbours)
            })
            .collect();

        Self { edges }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LivenessGraphs {
    /// Registers that are live at the same time and so cannot share a color.
    pub interference: Graph,
    /// Registers joined by a move, which would rather share a color.
    pub copy: Graph,
}

impl LivenessGraphs {
    pub fn induced_subgraph(&self, keep: &BTreeSet<Register>) -> Self {
        Self {
            interference: self.interference.induced_subgraph(keep),
            copy: self.copy.induced_subgraph(keep),
        }
    }
}

/// Computes the interference and copy graphs of a linear program.
pub fn liveness_graphs(program: &[Item]) -> LivenessGraphs {
    let mut analyzer = Analyzer::new(program);
    analyzer.analyze();

    let graphs = analyzer.graphs();
    debug!(
        "liveness graphs: {} registers, {} interferences, {} copies",
        graphs.interference.vertices().count(),
        graphs.interference.edge_count(),
        graphs.copy.edge_count()
    );

    graphs
}

struct Analyzer<'a> {
    program: &'a [Item],
    labels: HashMap<&'a Label, usize>,

    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,

    live_in: Vec<BTreeSet<Register>>,
    live_out: Vec<BTreeSet<Register>>,
}

impl<'a> Analyzer<'a> {
    pub fn new(program: &'a [Item]) -> Self {
        let labels = program
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Item::Label(label) => Some((label, index)),
                Item::Instruction(_) => None,
            })
            .collect();

        let mut res = Self {
            program,
            labels,
            succs: Vec::with_capacity(program.len()),
            preds: vec![Vec::new(); program.len()],
            live_in: vec![BTreeSet::new(); program.len()],
            live_out: vec![BTreeSet::new(); program.len()],
        };

        for index in 0..program.len() {
            let succs = res.successors_of(index);
            for succ in succs.iter() {
                res.preds[*succ].push(index);
            }
            res.succs.push(succs);
        }

        res
    }

    pub fn analyze(&mut self) {
        // Popping from the end visits the program backwards, which is the direction facts flow.
        let mut worklist: Vec<usize> = (0..self.program.len()).collect();
        let mut rounds = 0;

        while let Some(index) = worklist.pop() {
            rounds += 1;

            let out: BTreeSet<Register> = self.succs[index]
                .iter()
                .flat_map(|succ| self.live_in[*succ].iter().copied())
                .collect();

            let mut inb = out.clone();
            if let Item::Instruction(instruction) = &self.program[index] {
                for killed in instruction.defines() {
                    inb.remove(&killed);
                }
                inb.extend(instruction.uses());
            }

            self.live_out[index] = out;
            if inb != self.live_in[index] {
                self.live_in[index] = inb;
                worklist.extend(self.preds[index].iter().copied());
            }
        }

        trace!("liveness converged after {rounds} visits");
    }

    pub fn graphs(&self) -> LivenessGraphs {
        let mut graphs = LivenessGraphs::default();

        for (index, item) in self.program.iter().enumerate() {
            let Item::Instruction(instruction) = item else {
                continue;
            };

            let uses = instruction.uses();
            let defines = instruction.defines();

            for register in uses.iter().chain(defines.iter()) {
                graphs.interference.add_vertex(*register);
                graphs.copy.add_vertex(*register);
            }

            let copy = instruction.as_copy();
            if let Some((dest, src)) = copy {
                graphs.copy.add_edge(dest, src);
            }

            for defined in defines.iter().copied() {
                let others = self.live_out[index].iter().chain(defines.iter());
                for other in others.copied() {
                    if other == defined || copy == Some((defined, other)) {
                        continue;
                    }

                    graphs.interference.add_edge(defined, other);
                }
            }
        }

        graphs
    }

    fn successors_of(&self, index: usize) -> Vec<usize> {
        let next = (index + 1 < self.program.len()).then_some(index + 1);

        let flow = match &self.program[index] {
            Item::Label(_) => Flow::Next,
            Item::Instruction(instruction) => instruction.flow(),
        };

        match flow {
            Flow::Next => next.into_iter().collect(),
            Flow::Jump(label) => self.labels.get(label).copied().into_iter().collect(),
            Flow::Branch(label) => next
                .into_iter()
                .chain(self.labels.get(label).copied())
                .collect(),
            Flow::Exit => vec![],
        }
    }
}

#[cfg(test)]
mod tests;
