use sprig_common::ift::{BinaryOp, CfgBuilder, ControlFlowGraph, LinkKind, Node, Nodes};
use sprig_common::lir::{Instruction, Item};
use sprig_common::{Register, Registers};

use crate::lower;
use crate::target::Target;

/// `sum = 0; i = 10; while i > 0 { sum = sum + i; i = i - 1 }; return sum`
fn sum_loop() -> (ControlFlowGraph, Nodes, Registers) {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();
    let sum = registers.fresh();
    let i = registers.fresh();

    let zero = nodes.constant(0);
    let init_sum = nodes.write(sum, zero);
    let ten = nodes.constant(10);
    let init_i = nodes.write(i, ten);

    let read_i = nodes.read(i);
    let zero = nodes.constant(0);
    let cond = nodes.binary(BinaryOp::Greater, read_i, zero);

    let read_sum = nodes.read(sum);
    let read_i = nodes.read(i);
    let added = nodes.binary(BinaryOp::Add, read_sum, read_i);
    let accumulate = nodes.write(sum, added);

    let read_i = nodes.read(i);
    let one = nodes.constant(1);
    let decremented = nodes.binary(BinaryOp::Subtract, read_i, one);
    let step = nodes.write(i, decremented);

    let read_sum = nodes.read(sum);
    let result = nodes.write(Register::RAX, read_sum);
    let ret = nodes.add(Node::Return {
        uses: vec![Register::RAX],
    });

    let cfg = CfgBuilder::with_entry(init_sum)
        .add_link(Some((init_sum, LinkKind::Unconditional)), init_i)
        .add_link(Some((init_i, LinkKind::Unconditional)), cond)
        .add_link(Some((cond, LinkKind::ConditionalTrue)), accumulate)
        .add_link(Some((accumulate, LinkKind::Unconditional)), step)
        .add_link(Some((step, LinkKind::Unconditional)), cond)
        .add_link(Some((cond, LinkKind::ConditionalFalse)), result)
        .add_link(Some((result, LinkKind::Unconditional)), ret)
        .build();

    (cfg, nodes, registers)
}

fn instructions(program: &[Item]) -> impl Iterator<Item = &Instruction> {
    program.iter().filter_map(Item::instruction)
}

#[test]
fn empty_graph_lowers_to_nothing() {
    let lowered = lower(
        &ControlFlowGraph::new(),
        &Nodes::new(),
        &mut Registers::new(),
        &Target::x86_64(),
    );

    assert!(lowered.program.is_empty());
    assert_eq!("", lowered.asm().unwrap());
}

#[test]
fn loop_lowers_to_allocated_assembly() {
    let (cfg, nodes, mut registers) = sum_loop();
    let lowered = lower(&cfg, &nodes, &mut registers, &Target::x86_64());

    assert_eq!(0, lowered.spilled_offset);
    assert!(instructions(&lowered.program).any(|inst| matches!(inst, Instruction::JmpIf(..))));
    assert!(matches!(
        instructions(&lowered.program).last(),
        Some(Instruction::Ret { .. })
    ));

    let asm = lowered.asm().unwrap();
    assert!(asm.contains("cmp "));
    assert!(asm.ends_with("    ret\n"));
    assert!(!asm.contains('%'));
}

#[test]
fn lowering_is_deterministic() {
    let (cfg, nodes, mut registers) = sum_loop();
    let first = lower(&cfg, &nodes, &mut registers, &Target::x86_64());

    let (cfg, nodes, mut registers) = sum_loop();
    let second = lower(&cfg, &nodes, &mut registers, &Target::x86_64());

    assert_eq!(first.asm().unwrap(), second.asm().unwrap());
}

#[test]
fn tight_palette_spills_but_still_assembles() {
    let (cfg, nodes, mut registers) = sum_loop();

    let mut target = Target::x86_64();
    target.palette.truncate(2);

    let lowered = lower(&cfg, &nodes, &mut registers, &target);

    assert_eq!(0, lowered.spilled_offset % 8);
    assert!(lowered.spilled_offset > 0);
    assert!(!lowered.asm().unwrap().contains('%'));
}
