use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use log::trace;
use sprig_common::Register;

use crate::liveness::{Graph, LivenessGraphs};

/// A set of registers merged by coalescing, all of which receive the same color.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoalescedNode {
    pub registers: Vec<Register>,
    /// Whether one of the registers is self colored.
    pub precolored: bool,
}

/// Conservatively coalesces the graphs and returns the nodes in the order they were removed.
/// Coloring should proceed from the last node to the first.
pub fn coalesce(
    graphs: &LivenessGraphs,
    self_colored: &[Register],
    available: &[Register],
) -> Vec<CoalescedNode> {
    let mut coalescer = Coalescer::new(graphs, self_colored, available);
    let mut stack = Vec::with_capacity(coalescer.nodes.len());

    while !coalescer.is_empty() {
        if let Some(node) = coalescer.simplify() {
            stack.push(node);
        } else if !coalescer.moves.is_empty() {
            coalescer.coalesce();
        } else if let Some(node) = coalescer.freeze() {
            stack.push(node);
        } else if let Some(node) = coalescer.spill() {
            stack.push(node);
        } else {
            unreachable!("live node in no worklist");
        }
    }

    trace!(
        "coalesced {} registers into {} nodes",
        coalescer.nodes.iter().map(|node| node.registers.len()).sum::<usize>(),
        stack.len()
    );

    stack.into_iter().map(|index| coalescer.take(index)).collect()
}

type Adjacency = BTreeMap<usize, BTreeSet<usize>>;

struct Coalescer {
    nodes: Vec<CoalescedNode>,
    k: usize,
    forbidden: HashSet<Register>,

    interference: Adjacency,
    copies: Adjacency,

    simplify: BTreeSet<usize>,
    freeze: BTreeSet<usize>,
    spill: BTreeSet<usize>,

    moves: VecDeque<(usize, usize)>,
    queued: HashSet<(usize, usize)>,
}

impl Coalescer {
    pub fn new(graphs: &LivenessGraphs, self_colored: &[Register], available: &[Register]) -> Self {
        let self_colored: HashSet<_> = self_colored.iter().copied().collect();
        let available: HashSet<_> = available.iter().copied().collect();

        let registers: BTreeSet<Register> = graphs
            .interference
            .vertices()
            .chain(graphs.copy.vertices())
            .collect();

        let indices: HashMap<Register, usize> = registers
            .iter()
            .enumerate()
            .map(|(index, register)| (*register, index))
            .collect();

        let nodes = registers
            .iter()
            .map(|register| CoalescedNode {
                registers: vec![*register],
                precolored: self_colored.contains(register),
            })
            .collect();

        let adjacency = |graph: &Graph| -> Adjacency {
            registers
                .iter()
                .map(|register| {
                    let neighbours = graph
                        .neighbours(*register)
                        .map(|neighbour| indices[&neighbour])
                        .collect();
                    (indices[register], neighbours)
                })
                .collect()
        };

        let mut res = Self {
            nodes,
            k: available.len(),
            forbidden: self_colored.difference(&available).copied().collect(),

            interference: adjacency(&graphs.interference),
            copies: adjacency(&graphs.copy),

            simplify: BTreeSet::new(),
            freeze: BTreeSet::new(),
            spill: BTreeSet::new(),

            moves: VecDeque::new(),
            queued: HashSet::new(),
        };

        let all: Vec<usize> = res.interference.keys().copied().collect();
        for node in all.iter().copied() {
            res.classify(node);
        }
        res.enable_moves(all);

        res
    }

    pub fn is_empty(&self) -> bool {
        self.interference.is_empty()
    }

    pub fn simplify(&mut self) -> Option<usize> {
        let node = self.simplify.first().copied()?;
        self.remove(node);
        Some(node)
    }

    /// Gives up on coalescing the moves of a low degree node.
    pub fn freeze(&mut self) -> Option<usize> {
        let node = self.min_degree(&self.freeze)?;
        self.remove(node);
        Some(node)
    }

    /// Removes a high degree node, which may or may not end up spilled.
    pub fn spill(&mut self) -> Option<usize> {
        let node = self.min_degree(&self.spill)?;
        self.remove(node);
        Some(node)
    }

    pub fn coalesce(&mut self) {
        let Some((a, b)) = self.moves.pop_front() else {
            return;
        };
        self.queued.remove(&(a, b));

        let (a, b) = if self.nodes[b].precolored {
            (b, a)
        } else {
            (a, b)
        };

        if !self.interference.contains_key(&a) || !self.interference.contains_key(&b) {
            return;
        }

        if self.interferes(a, b) || self.nodes[b].precolored || self.is_forbidden(a) {
            remove_edge(&mut self.copies, a, b);
            self.reclassify(a);
            self.reclassify(b);
            return;
        }

        let mergeable = if self.nodes[a].precolored {
            self.george(a, b)
        } else {
            self.briggs(a, b)
        };

        if mergeable {
            self.merge(a, b);
        }
    }

    pub fn take(&mut self, index: usize) -> CoalescedNode {
        CoalescedNode {
            registers: std::mem::take(&mut self.nodes[index].registers),
            precolored: self.nodes[index].precolored,
        }
    }

    /// Every neighbour of `b` is harmless to `a`: it has a low degree, a fixed color, or already
    /// interferes with `a`.
    fn george(&self, a: usize, b: usize) -> bool {
        self.interference[&b].iter().all(|neighbour| {
            self.degree(*neighbour) < self.k
                || self.nodes[*neighbour].precolored
                || self.interferes(*neighbour, a)
        })
    }

    /// The merged node has fewer than `k` neighbours of significant degree. Common neighbours of
    /// degree exactly `k` lose one edge in the merge.
    fn briggs(&self, a: usize, b: usize) -> bool {
        let first = &self.interference[&a];
        let second = &self.interference[&b];

        let common = first
            .intersection(second)
            .filter(|neighbour| self.degree(**neighbour) == self.k)
            .count();
        let significant = first
            .union(second)
            .filter(|neighbour| self.degree(**neighbour) >= self.k)
            .count();

        significant - common < self.k
    }

    /// Merges `b` into `a`.
    fn merge(&mut self, a: usize, b: usize) {
        trace!("merging {:?} into {:?}", self.nodes[b].registers, self.nodes[a].registers);

        remove_edge(&mut self.copies, a, b);

        let registers = std::mem::take(&mut self.nodes[b].registers);
        self.nodes[a].registers.extend(registers);

        let neighbours: Vec<usize> = self.interference[&b].iter().copied().collect();
        for neighbour in neighbours {
            add_edge(&mut self.interference, a, neighbour);
        }

        let copies: Vec<usize> = self.copies[&b].iter().copied().collect();
        for copy in copies {
            add_edge(&mut self.copies, a, copy);
            self.enqueue(copy, a);
        }

        self.remove(b);
        self.reclassify(a);
    }

    fn remove(&mut self, node: usize) {
        let neighbours = remove_node(&mut self.interference, node);
        let copies = remove_node(&mut self.copies, node);
        self.unclassify(node);

        for neighbour in neighbours.iter().chain(copies.iter()) {
            self.reclassify(*neighbour);
        }

        for neighbour in neighbours {
            if self.degree(neighbour) + 1 == self.k {
                let mut nodes: Vec<usize> = self.interference[&neighbour].iter().copied().collect();
                nodes.push(neighbour);
                self.enable_moves(nodes);
            }
        }
    }

    fn enable_moves(&mut self, nodes: Vec<usize>) {
        for node in nodes {
            let copies: Vec<usize> = self.copies[&node].iter().copied().collect();
            for copy in copies {
                self.enqueue(node, copy);
            }
        }
    }

    fn enqueue(&mut self, a: usize, b: usize) {
        if self.queued.insert((a, b)) {
            self.moves.push_back((a, b));
        }
    }

    fn classify(&mut self, node: usize) {
        if self.degree(node) >= self.k {
            self.spill.insert(node);
        } else if self.copies[&node].is_empty() {
            self.simplify.insert(node);
        } else {
            self.freeze.insert(node);
        }
    }

    fn unclassify(&mut self, node: usize) {
        self.simplify.remove(&node);
        self.freeze.remove(&node);
        self.spill.remove(&node);
    }

    fn reclassify(&mut self, node: usize) {
        self.unclassify(node);
        self.classify(node);
    }

    fn min_degree(&self, candidates: &BTreeSet<usize>) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .min_by_key(|node| self.degree(*node))
    }

    fn is_forbidden(&self, node: usize) -> bool {
        self.nodes[node]
            .registers
            .iter()
            .any(|register| self.forbidden.contains(register))
    }

    fn interferes(&self, a: usize, b: usize) -> bool {
        self.interference[&a].contains(&b)
    }

    fn degree(&self, node: usize) -> usize {
        self.interference[&node].len()
    }
}

fn add_edge(graph: &mut Adjacency, a: usize, b: usize) {
    if a != b {
        graph.entry(a).or_default().insert(b);
        graph.entry(b).or_default().insert(a);
    }
}

fn remove_edge(graph: &mut Adjacency, a: usize, b: usize) {
    if let Some(neighbours) = graph.get_mut(&a) {
        neighbours.remove(&b);
    }
    if let Some(neighbours) = graph.get_mut(&b) {
        neighbours.remove(&a);
    }
}

/// Removes the node and returns its former neighbours.
fn remove_node(graph: &mut Adjacency, node: usize) -> BTreeSet<usize> {
    let neighbours = graph.remove(&node).unwrap_or_default();
    for neighbour in neighbours.iter() {
        if let Some(others) = graph.get_mut(neighbour) {
            others.remove(&node);
        }
    }
    neighbours
}
