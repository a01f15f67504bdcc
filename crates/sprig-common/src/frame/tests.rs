use super::{Access, AccessError, Frame, Location, VariableId, DISPLAY};
use crate::ift::{BinaryOp, Node, Nodes};
use crate::lir::Label;
use crate::{Register, Registers};

fn frame(registers: &mut Registers) -> Frame {
    Frame::new(
        2,
        vec![
            (VariableId(0), Location::Memory),
            (VariableId(1), Location::Register),
            (VariableId(2), Location::Memory),
        ],
        registers,
    )
}

#[test]
fn memory_variables_get_consecutive_slots() {
    let mut registers = Registers::new();
    let frame = frame(&mut registers);

    assert_eq!(16, frame.size());
    assert_eq!(2, frame.depth());
    assert!(frame.register_of(VariableId(0)).is_none());
    assert!(frame.register_of(VariableId(1)).is_some());
}

#[test]
fn direct_memory_read_is_relative_to_frame_pointer() {
    let mut registers = Registers::new();
    let mut nodes = Nodes::new();
    let frame = frame(&mut registers);

    let read = frame
        .read(&mut nodes, VariableId(2), Access::Direct)
        .unwrap();

    let Node::MemoryRead(address) = nodes[read] else {
        panic!("expected a memory read, got {:?}", nodes[read]);
    };
    let Node::Binary(BinaryOp::Subtract, base, offset) = nodes[address] else {
        panic!("expected a subtraction, got {:?}", nodes[address]);
    };

    assert_eq!(Node::RegisterRead(Register::RBP), nodes[base]);
    assert_eq!(Node::Const(16), nodes[offset]);
}

#[test]
fn indirect_memory_write_goes_through_display() {
    let mut registers = Registers::new();
    let mut nodes = Nodes::new();
    let frame = frame(&mut registers);
    let value = nodes.constant(7);

    let write = frame
        .write(&mut nodes, VariableId(0), value, Access::Indirect)
        .unwrap();

    let Node::MemoryWrite(address, stored) = nodes[write] else {
        panic!("expected a memory write, got {:?}", nodes[write]);
    };
    assert_eq!(value, stored);

    let Node::Binary(BinaryOp::Subtract, base, offset) = nodes[address] else {
        panic!("expected a subtraction, got {:?}", nodes[address]);
    };
    assert_eq!(Node::Const(8), nodes[offset]);

    let Node::MemoryRead(element) = nodes[base] else {
        panic!("expected a display load, got {:?}", nodes[base]);
    };
    let Node::Binary(BinaryOp::Add, table, entry) = nodes[element] else {
        panic!("expected a display index, got {:?}", nodes[element]);
    };
    assert_eq!(Node::MemoryLabel(Label::from(DISPLAY)), nodes[table]);
    assert_eq!(Node::Const(16), nodes[entry]);
}

#[test]
fn direct_register_access_uses_the_register() {
    let mut registers = Registers::new();
    let mut nodes = Nodes::new();
    let frame = frame(&mut registers);
    let register = frame.register_of(VariableId(1)).unwrap();

    let read = frame
        .read(&mut nodes, VariableId(1), Access::Direct)
        .unwrap();

    assert_eq!(Node::RegisterRead(register), nodes[read]);
}

#[test]
fn indirect_register_access_is_an_error() {
    let mut registers = Registers::new();
    let mut nodes = Nodes::new();
    let frame = frame(&mut registers);
    let value = nodes.constant(1);

    assert_eq!(
        Err(AccessError::IndirectRegisterAccess(VariableId(1))),
        frame.read(&mut nodes, VariableId(1), Access::Indirect)
    );
    assert_eq!(
        Err(AccessError::IndirectRegisterAccess(VariableId(1))),
        frame.write(&mut nodes, VariableId(1), value, Access::Indirect)
    );
}

#[test]
fn foreign_variables_are_rejected() {
    let mut registers = Registers::new();
    let mut nodes = Nodes::new();
    let frame = frame(&mut registers);

    assert_eq!(
        Err(AccessError::UnknownVariable(VariableId(9))),
        frame.read(&mut nodes, VariableId(9), Access::Direct)
    );
}
