use sprig_common::ift::{CfgBuilder, ControlFlowGraph, LinkKind, Node, NodeId, Nodes};
use sprig_common::lir::{Condition, Instruction, Item, Label};
use sprig_common::Registers;

use super::linearize;
use crate::select::Covering;

/// Covers a constant `n` as `push n`, and a conditional constant as a `jnz` or, when inverted, a
/// `jz` to the target.
struct Markers;

impl Markers {
    fn value(nodes: &Nodes, root: NodeId) -> i64 {
        match nodes.get(root) {
            Node::Const(value) => *value,
            node => panic!("unexpected node {node:?}"),
        }
    }
}

impl Covering for Markers {
    fn cover_unconditional(
        &self,
        nodes: &Nodes,
        _: &mut Registers,
        root: NodeId,
    ) -> Vec<Instruction> {
        vec![Instruction::PushI(Self::value(nodes, root))]
    }

    fn cover_conditional(
        &self,
        nodes: &Nodes,
        _: &mut Registers,
        root: NodeId,
        target: &Label,
        invert: bool,
    ) -> Vec<Instruction> {
        let condition = if invert {
            Condition::Zero
        } else {
            Condition::NotZero
        };

        vec![
            Instruction::PushI(Self::value(nodes, root)),
            Instruction::JmpIf(condition, target.clone()),
        ]
    }
}

fn run(cfg: &ControlFlowGraph, nodes: &Nodes) -> Vec<Item> {
    linearize(cfg, nodes, &Markers, &mut Registers::new())
}

fn push(value: i64) -> Item {
    Item::Instruction(Instruction::PushI(value))
}

fn label(name: &str) -> Item {
    Item::Label(Label::from(name))
}

fn jmp(name: &str) -> Item {
    Item::Instruction(Instruction::Jmp(Label::from(name)))
}

fn jump_if(condition: Condition, name: &str) -> Item {
    Item::Instruction(Instruction::JmpIf(condition, Label::from(name)))
}

/// Every label in the program is the target of some jump.
fn assert_labels_used(program: &[Item]) {
    for item in program {
        if let Item::Label(label) = item {
            let used = program.iter().any(|item| match item {
                Item::Instruction(Instruction::Jmp(target))
                | Item::Instruction(Instruction::JmpIf(_, target)) => target == label,
                _ => false,
            });

            assert!(used, "label {label} is never jumped to");
        }
    }
}

#[test]
fn empty_graph_gives_empty_program() {
    let nodes = Nodes::new();
    assert_eq!(Vec::<Item>::new(), run(&ControlFlowGraph::new(), &nodes));
}

#[test]
fn straight_line_falls_through() {
    let mut nodes = Nodes::new();
    let a = nodes.constant(1);
    let b = nodes.constant(2);

    let cfg = CfgBuilder::with_entry(a)
        .add_link(Some((a, LinkKind::Unconditional)), b)
        .build();

    assert_eq!(vec![push(1), push(2)], run(&cfg, &nodes));
}

#[test]
fn self_loop_jumps_back() {
    let mut nodes = Nodes::new();
    let a = nodes.constant(1);

    let cfg = CfgBuilder::with_entry(a)
        .add_link(Some((a, LinkKind::Unconditional)), a)
        .build();

    assert_eq!(vec![label("_0"), push(1), jmp("_0")], run(&cfg, &nodes));
}

#[test]
fn fresh_conditional_visits_true_branch_first() {
    let mut nodes = Nodes::new();
    let cond = nodes.constant(0);
    let yes = nodes.constant(1);
    let no = nodes.constant(2);
    let join = nodes.constant(3);

    let cfg = CfgBuilder::with_entry(cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), yes)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), no)
        .add_link(Some((yes, LinkKind::Unconditional)), join)
        .add_link(Some((no, LinkKind::Unconditional)), join)
        .build();

    let program = run(&cfg, &nodes);
    assert_eq!(
        vec![
            push(0),
            jump_if(Condition::Zero, "_1"),
            push(1),
            label("_3"),
            push(3),
            label("_1"),
            push(2),
            jmp("_3"),
        ],
        program
    );

    assert_labels_used(&program);
}

#[test]
fn loop_condition_targets_labeled_header() {
    let mut nodes = Nodes::new();
    let header = nodes.constant(0);
    let cond = nodes.constant(1);
    let exit = nodes.constant(2);

    // header -> cond; cond ? header : exit
    let cfg = CfgBuilder::with_entry(header)
        .add_link(Some((header, LinkKind::Unconditional)), cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), header)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), exit)
        .build();

    assert_eq!(
        vec![
            label("_0"),
            push(0),
            push(1),
            jump_if(Condition::NotZero, "_0"),
            push(2),
        ],
        run(&cfg, &nodes)
    );
}

#[test]
fn labeled_false_branch_is_inverted() {
    let mut nodes = Nodes::new();
    let header = nodes.constant(0);
    let cond = nodes.constant(1);
    let body = nodes.constant(2);

    // header -> cond; cond ? body : header
    let cfg = CfgBuilder::with_entry(header)
        .add_link(Some((header, LinkKind::Unconditional)), cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), body)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), header)
        .build();

    assert_eq!(
        vec![
            label("_0"),
            push(0),
            push(1),
            jump_if(Condition::Zero, "_0"),
            push(2),
        ],
        run(&cfg, &nodes)
    );
}

#[test]
fn both_branches_labeled_jumps_twice() {
    let mut nodes = Nodes::new();
    let first = nodes.constant(0);
    let second = nodes.constant(1);
    let cond = nodes.constant(2);

    // first -> second -> cond; cond ? first : second
    let cfg = CfgBuilder::with_entry(first)
        .add_link(Some((first, LinkKind::Unconditional)), second)
        .add_link(Some((second, LinkKind::Unconditional)), cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), first)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), second)
        .build();

    let program = run(&cfg, &nodes);
    assert_eq!(
        vec![
            label("_0"),
            push(0),
            label("_1"),
            push(1),
            push(2),
            jump_if(Condition::NotZero, "_0"),
            jmp("_1"),
        ],
        program
    );
    assert_labels_used(&program);
}

#[test]
fn explicit_labels_survive_pruning() {
    let mut nodes = Nodes::new();
    let inner = nodes.constant(7);
    let entry = nodes.labeled("main", inner);

    let cfg = CfgBuilder::with_entry(entry).build();

    assert_eq!(vec![label("main"), push(7)], run(&cfg, &nodes));
}

#[test]
fn explicit_label_is_used_for_jumps() {
    let mut nodes = Nodes::new();
    let inner = nodes.constant(7);
    let entry = nodes.labeled("again", inner);

    let cfg = CfgBuilder::with_entry(entry)
        .add_link(Some((entry, LinkKind::Unconditional)), entry)
        .build();

    assert_eq!(
        vec![label("again"), push(7), jmp("again")],
        run(&cfg, &nodes)
    );
}

#[test]
fn no_ops_are_transparent() {
    let mut nodes = Nodes::new();
    let a = nodes.constant(1);
    let nothing = nodes.no_op();
    let b = nodes.constant(2);

    let cfg = CfgBuilder::with_entry(a)
        .add_link(Some((a, LinkKind::Unconditional)), nothing)
        .add_link(Some((nothing, LinkKind::Unconditional)), b)
        .add_link(Some((b, LinkKind::Unconditional)), nothing)
        .build();

    assert_eq!(
        vec![push(1), label("_1"), push(2), jmp("_1")],
        run(&cfg, &nodes)
    );
}

#[test]
#[should_panic]
fn lone_conditional_edge_panics() {
    let mut nodes = Nodes::new();
    let cond = nodes.constant(0);
    let yes = nodes.constant(1);

    let mut cfg = CfgBuilder::with_entry(cond).add_link(None, yes).build();
    cfg.on_true.insert(cond, yes);

    run(&cfg, &nodes);
}

#[test]
fn branches_to_the_same_node_emit_it_once() {
    let mut nodes = Nodes::new();
    let cond = nodes.constant(1);
    let join = nodes.constant(2);

    let cfg = CfgBuilder::with_entry(cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), join)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), join)
        .build();

    let program = run(&cfg, &nodes);

    assert_eq!(
        vec![
            push(1),
            jump_if(Condition::Zero, "_1"),
            label("_1"),
            push(2),
            jmp("_1"),
        ],
        program
    );

    let labels = program.iter().filter(|item| **item == label("_1")).count();
    let covers = program.iter().filter(|item| **item == push(2)).count();
    assert_eq!((1, 1), (labels, covers));
}

#[test]
fn shared_branch_target_with_successor_is_emitted_once() {
    let mut nodes = Nodes::new();
    let cond = nodes.constant(1);
    let join = nodes.constant(2);
    let after = nodes.constant(3);

    let cfg = CfgBuilder::with_entry(cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), join)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), join)
        .add_link(Some((join, LinkKind::Unconditional)), after)
        .build();

    let program = run(&cfg, &nodes);

    assert_eq!(1, program.iter().filter(|item| **item == push(2)).count());
    assert_eq!(1, program.iter().filter(|item| **item == push(3)).count());
    assert_labels_used(&program);
}
