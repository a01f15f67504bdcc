//! Small programs, already lowered to trees, to run the backend on.

use sprig_backend::alloc::SpillArea;
use sprig_common::frame::{Access, AccessError, Frame, Location, VariableId};
use sprig_common::ift::{BinaryOp, CfgBuilder, ControlFlowGraph, LinkKind, Node, NodeId, Nodes};
use sprig_common::{Register, Registers};

/// Registers a callee may clobber.
const CALLER_SAVED: [Register; 9] = [
    Register::RAX,
    Register::RCX,
    Register::RDX,
    Register::RSI,
    Register::RDI,
    Register::R8,
    Register::R9,
    Register::R10,
    Register::R11,
];

pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Result<Program, AccessError>,
}

impl Sample {
    pub fn build(&self) -> Result<Program, AccessError> {
        (self.build)()
    }
}

pub struct Program {
    pub cfg: ControlFlowGraph,
    pub nodes: Nodes,
    pub registers: Registers,
    pub spill_area: Option<SpillArea>,
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        name: "sum",
        description: "adds the numbers from ten down to one in a loop",
        build: sum,
    },
    Sample {
        name: "max",
        description: "returns the larger of its two arguments",
        build: max,
    },
    Sample {
        name: "call",
        description: "calls a function and adds one to its result",
        build: call,
    },
    Sample {
        name: "pressure",
        description: "keeps more values alive than there are registers",
        build: pressure,
    },
    Sample {
        name: "frame",
        description: "reads and writes frame variables, directly and through the display",
        build: frame,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|sample| sample.name == name)
}

/// Runs the trees one after the other.
fn sequence(trees: &[NodeId]) -> CfgBuilder {
    let mut builder = CfgBuilder::new();
    let mut previous = None;

    for tree in trees {
        builder.add_link(previous.map(|previous| (previous, LinkKind::Unconditional)), *tree);
        previous = Some(*tree);
    }

    builder
}

fn ret(nodes: &mut Nodes) -> NodeId {
    nodes.add(Node::Return {
        uses: vec![Register::RAX],
    })
}

fn sum() -> Result<Program, AccessError> {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();
    let total = registers.fresh();
    let counter = registers.fresh();

    let zero = nodes.constant(0);
    let init_total = nodes.write(total, zero);
    let ten = nodes.constant(10);
    let init_counter = nodes.write(counter, ten);

    let current = nodes.read(counter);
    let zero = nodes.constant(0);
    let check = nodes.binary(BinaryOp::Greater, current, zero);
    let check = nodes.labeled("loop", check);

    let old = nodes.read(total);
    let current = nodes.read(counter);
    let added = nodes.binary(BinaryOp::Add, old, current);
    let accumulate = nodes.write(total, added);

    let current = nodes.read(counter);
    let one = nodes.constant(1);
    let decremented = nodes.binary(BinaryOp::Subtract, current, one);
    let step = nodes.write(counter, decremented);

    let result = nodes.read(total);
    let result = nodes.write(Register::RAX, result);
    let done = ret(&mut nodes);

    let cfg = sequence(&[init_total, init_counter, check])
        .add_link(Some((check, LinkKind::ConditionalTrue)), accumulate)
        .add_link(Some((accumulate, LinkKind::Unconditional)), step)
        .add_link(Some((step, LinkKind::Unconditional)), check)
        .add_link(Some((check, LinkKind::ConditionalFalse)), result)
        .add_link(Some((result, LinkKind::Unconditional)), done)
        .build();

    Ok(Program {
        cfg,
        nodes,
        registers,
        spill_area: None,
    })
}

fn max() -> Result<Program, AccessError> {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();
    let a = registers.fresh();
    let b = registers.fresh();

    let first = nodes.read(Register::RDI);
    let take_a = nodes.write(a, first);
    let second = nodes.read(Register::RSI);
    let take_b = nodes.write(b, second);

    let left = nodes.read(a);
    let right = nodes.read(b);
    let check = nodes.binary(BinaryOp::Greater, left, right);

    let left = nodes.read(a);
    let return_a = nodes.write(Register::RAX, left);
    let right = nodes.read(b);
    let return_b = nodes.write(Register::RAX, right);
    let done = ret(&mut nodes);

    let cfg = sequence(&[take_a, take_b, check])
        .add_link(Some((check, LinkKind::ConditionalTrue)), return_a)
        .add_link(Some((check, LinkKind::ConditionalFalse)), return_b)
        .add_link(Some((return_a, LinkKind::Unconditional)), done)
        .add_link(Some((return_b, LinkKind::Unconditional)), done)
        .build();

    Ok(Program {
        cfg,
        nodes,
        registers,
        spill_area: None,
    })
}

fn call() -> Result<Program, AccessError> {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();
    let squared = registers.fresh();

    let seven = nodes.constant(7);
    let argument = nodes.write(Register::RDI, seven);
    let argument = nodes.labeled("main", argument);

    let square = nodes.label("square");
    let invoke = nodes.add(Node::Call {
        address: square,
        uses: vec![Register::RDI],
        defines: CALLER_SAVED.to_vec(),
    });

    let result = nodes.read(Register::RAX);
    let keep = nodes.write(squared, result);

    let kept = nodes.read(squared);
    let one = nodes.constant(1);
    let incremented = nodes.binary(BinaryOp::Add, kept, one);
    let result = nodes.write(Register::RAX, incremented);
    let done = ret(&mut nodes);

    let cfg = sequence(&[argument, invoke, keep, result, done]).build();

    Ok(Program {
        cfg,
        nodes,
        registers,
        spill_area: None,
    })
}

/// How many values `pressure` keeps alive at once.
const PRESSURE: i64 = 18;

fn pressure() -> Result<Program, AccessError> {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();
    let values: Vec<Register> = (0..PRESSURE).map(|_| registers.fresh()).collect();
    let total = registers.fresh();

    let mut trees = Vec::new();
    for (value, register) in (0..PRESSURE).zip(values.iter()) {
        let value = nodes.constant(value);
        trees.push(nodes.write(*register, value));
    }

    let first = nodes.read(values[0]);
    trees.push(nodes.write(total, first));

    for register in values.iter().skip(1) {
        let old = nodes.read(total);
        let value = nodes.read(*register);
        let added = nodes.binary(BinaryOp::Add, old, value);
        trees.push(nodes.write(total, added));
    }

    let result = nodes.read(total);
    trees.push(nodes.write(Register::RAX, result));
    trees.push(ret(&mut nodes));

    Ok(Program {
        cfg: sequence(&trees).build(),
        nodes,
        registers,
        spill_area: None,
    })
}

/// A procedure at depth 1 with `x` and `z` in memory and `y` in a register. `z` is read through
/// the display as a nested procedure would.
fn frame() -> Result<Program, AccessError> {
    let mut nodes = Nodes::new();
    let mut registers = Registers::new();

    let (x, y, z) = (VariableId(0), VariableId(1), VariableId(2));
    let frame = Frame::new(
        1,
        [
            (x, Location::Memory),
            (y, Location::Register),
            (z, Location::Memory),
        ],
        &mut registers,
    );

    let mut trees = Vec::new();

    // push rbp; mov rbp, rsp; sub rsp, size
    let rbp = nodes.read(Register::RBP);
    trees.push(nodes.add(Node::StackPush(rbp)));
    let rsp = nodes.read(Register::RSP);
    trees.push(nodes.write(Register::RBP, rsp));
    let rsp = nodes.read(Register::RSP);
    let size = nodes.constant(frame.size());
    let lowered = nodes.binary(BinaryOp::Subtract, rsp, size);
    trees.push(nodes.write(Register::RSP, lowered));

    let five = nodes.constant(5);
    trees.push(frame.write(&mut nodes, x, five, Access::Direct)?);

    let read_x = frame.read(&mut nodes, x, Access::Direct)?;
    let read_z = frame.read(&mut nodes, z, Access::Indirect)?;
    let added = nodes.binary(BinaryOp::Add, read_x, read_z);
    trees.push(frame.write(&mut nodes, y, added, Access::Direct)?);

    let read_y = frame.read(&mut nodes, y, Access::Direct)?;
    trees.push(frame.write(&mut nodes, z, read_y, Access::Direct)?);

    let read_y = frame.read(&mut nodes, y, Access::Direct)?;
    trees.push(nodes.write(Register::RAX, read_y));

    // mov rsp, rbp; pop rbp
    let rbp = nodes.read(Register::RBP);
    trees.push(nodes.write(Register::RSP, rbp));
    let popped = nodes.add(Node::StackPop);
    trees.push(nodes.write(Register::RBP, popped));
    trees.push(ret(&mut nodes));

    Ok(Program {
        cfg: sequence(&trees).build(),
        nodes,
        registers,
        spill_area: Some(SpillArea::below(Register::RBP, frame.size())),
    })
}
