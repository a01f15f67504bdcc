use std::collections::BTreeSet;

use sprig_common::lir::{Arithmetic, Condition, Instruction, Item, Label};
use sprig_common::{Register, Registers};

use super::{liveness_graphs, Graph};

fn virtuals<const N: usize>() -> [Register; N] {
    let mut registers = Registers::new();
    std::array::from_fn(|_| registers.fresh())
}

fn inst(instruction: Instruction) -> Item {
    Item::Instruction(instruction)
}

#[test]
fn graph_ignores_self_loops() {
    let mut graph = Graph::new();
    graph.add_edge(Register::RAX, Register::RAX);

    assert!(graph.contains(Register::RAX));
    assert!(!graph.has_edge(Register::RAX, Register::RAX));
    assert_eq!(0, graph.edge_count());
}

#[test]
fn overlapping_values_interfere() {
    let [a, b, c] = virtuals();
    let program = vec![
        inst(Instruction::MoveRI { dest: a, value: 1 }),
        inst(Instruction::MoveRI { dest: b, value: 2 }),
        inst(Instruction::Arithmetic(Arithmetic::Add, a, b)),
        inst(Instruction::MoveRI { dest: c, value: 3 }),
        inst(Instruction::Arithmetic(Arithmetic::Add, a, c)),
        inst(Instruction::MoveRR {
            dest: Register::RAX,
            src: a,
        }),
        inst(Instruction::Ret {
            uses: vec![Register::RAX],
        }),
    ];

    let graphs = liveness_graphs(&program);

    assert!(graphs.interference.has_edge(a, b));
    assert!(graphs.interference.has_edge(a, c));
    assert!(!graphs.interference.has_edge(b, c));
    assert!(!graphs.interference.has_edge(a, Register::RAX));
    assert!(graphs.copy.has_edge(a, Register::RAX));
}

#[test]
fn move_source_does_not_interfere_with_destination() {
    let [a, b] = virtuals();
    let program = vec![
        inst(Instruction::MoveRI { dest: a, value: 1 }),
        inst(Instruction::MoveRR { dest: b, src: a }),
        inst(Instruction::Arithmetic(Arithmetic::Add, b, a)),
        inst(Instruction::Ret { uses: vec![b] }),
    ];

    let graphs = liveness_graphs(&program);

    // `a` stays live past the move, but the move itself does not make it interfere.
    assert!(!graphs.interference.has_edge(a, b));
    assert!(graphs.copy.has_edge(a, b));
}

#[test]
fn registers_without_edges_are_vertices() {
    let [a] = virtuals();
    let program = vec![inst(Instruction::PushR(a))];

    let graphs = liveness_graphs(&program);

    assert_eq!(vec![a], graphs.interference.vertices().collect::<Vec<_>>());
    assert_eq!(vec![a], graphs.copy.vertices().collect::<Vec<_>>());
}

#[test]
fn values_live_around_loops() {
    let [counter, sum] = virtuals();
    let head = Label::from("head");
    let program = vec![
        inst(Instruction::MoveRI {
            dest: counter,
            value: 10,
        }),
        inst(Instruction::MoveRI { dest: sum, value: 0 }),
        Item::Label(head.clone()),
        inst(Instruction::Arithmetic(Arithmetic::Add, sum, counter)),
        inst(Instruction::NegR(counter)),
        inst(Instruction::TestRR(counter, counter)),
        inst(Instruction::JmpIf(Condition::NotZero, head)),
        inst(Instruction::MoveRR {
            dest: Register::RAX,
            src: sum,
        }),
        inst(Instruction::Ret {
            uses: vec![Register::RAX],
        }),
    ];

    let graphs = liveness_graphs(&program);

    // `sum` is still needed by the next iteration when `counter` is rewritten.
    assert!(graphs.interference.has_edge(counter, sum));
}

#[test]
fn call_definitions_interfere_with_live_values() {
    let [a] = virtuals();
    let program = vec![
        inst(Instruction::MoveRI { dest: a, value: 1 }),
        inst(Instruction::CallL {
            target: Label::from("f"),
            uses: vec![],
            defines: vec![Register::RAX, Register::RCX],
        }),
        inst(Instruction::PushR(a)),
    ];

    let graphs = liveness_graphs(&program);

    assert!(graphs.interference.has_edge(a, Register::RAX));
    assert!(graphs.interference.has_edge(a, Register::RCX));
    assert!(graphs.interference.has_edge(Register::RAX, Register::RCX));
}

#[test]
fn induced_subgraph_keeps_inner_edges() {
    let [a, b, c] = virtuals();
    let mut graph = Graph::new();
    graph.add_edge(a, b);
    graph.add_edge(b, c);

    let keep: BTreeSet<_> = [a, b].into_iter().collect();
    let sub = graph.induced_subgraph(&keep);

    assert!(sub.has_edge(a, b));
    assert!(!sub.contains(c));
    assert_eq!(vec![a], sub.neighbours(b).collect::<Vec<_>>());
}
