use super::{Addressing, Arithmetic, Condition, Displacement, Flow, Instruction, Label, Shift};
use crate::{Register, Registers};

#[test]
fn division_reads_and_writes_implicit_registers() {
    let mut registers = Registers::new();
    let divisor = registers.fresh();

    let division = Instruction::DivR(divisor);

    assert_eq!(
        vec![Register::RAX, Register::RDX, divisor],
        division.uses()
    );
    assert_eq!(vec![Register::RAX, Register::RDX], division.defines());
    assert_eq!(vec![Register::RAX], Instruction::Cqo.uses());
    assert_eq!(vec![Register::RDX], Instruction::Cqo.defines());
}

#[test]
fn repeated_operands_are_listed_once() {
    let mut registers = Registers::new();
    let value = registers.fresh();

    assert_eq!(vec![value], Instruction::TestRR(value, value).uses());
    assert_eq!(
        vec![value],
        Instruction::Arithmetic(Arithmetic::Xor, value, value).uses()
    );
}

#[test]
fn shifts_read_the_count_register() {
    let mut registers = Registers::new();
    let value = registers.fresh();
    let shift = Instruction::Shift(Shift::Left, value);

    assert_eq!(vec![value, Register::RCX], shift.uses());
    assert_eq!(vec![value], shift.defines());
}

#[test]
fn register_call_uses_its_target() {
    let mut registers = Registers::new();
    let target = registers.fresh();
    let call = Instruction::CallR {
        target,
        uses: vec![Register::RDI],
        defines: vec![Register::RAX],
    };

    assert_eq!(vec![target, Register::RDI], call.uses());
    assert_eq!(vec![Register::RAX], call.defines());
    assert_eq!(Flow::Next, call.flow());
}

#[test]
fn memory_store_uses_address_and_source() {
    let mut registers = Registers::new();
    let base = registers.fresh();
    let value = registers.fresh();
    let store = Instruction::MoveMR {
        dest: Addressing::base(base, 8),
        src: value,
    };

    assert_eq!(vec![base, value], store.uses());
    assert!(store.defines().is_empty());
}

#[test]
fn control_flow_of_jumps() {
    let label = Label::from("loop");

    assert_eq!(Flow::Jump(&label), Instruction::Jmp(label.clone()).flow());
    assert_eq!(
        Flow::Branch(&label),
        Instruction::JmpIf(Condition::Less, label.clone()).flow()
    );
    assert_eq!(Flow::Exit, Instruction::Ret { uses: vec![] }.flow());
    assert_eq!(Flow::Exit, Instruction::JmpR(Register::RAX).flow());
}

#[test]
fn map_registers_rewrites_every_operand() {
    let mut registers = Registers::new();
    let base = registers.fresh();
    let index = registers.fresh();
    let dest = registers.fresh();

    let load = Instruction::MoveRM {
        dest,
        src: Addressing::BaseAndIndex {
            base,
            index,
            scale: 8,
            displacement: Displacement::Const(0),
        },
    };

    let mapped = load.map_registers(|register| {
        if register == base {
            Register::RBX
        } else if register == index {
            Register::RCX
        } else {
            Register::RAX
        }
    });

    let expected = Instruction::MoveRM {
        dest: Register::RAX,
        src: Addressing::BaseAndIndex {
            base: Register::RBX,
            index: Register::RCX,
            scale: 8,
            displacement: Displacement::Const(0),
        },
    };

    assert_eq!(expected, mapped);
}

#[test]
fn try_map_registers_stops_at_first_error() {
    let mut registers = Registers::new();
    let virt = registers.fresh();
    let instruction = Instruction::MoveRR {
        dest: Register::RAX,
        src: virt,
    };

    let res = instruction.try_map_registers(&mut |register| {
        if register.is_hardware() {
            Ok(register)
        } else {
            Err(register)
        }
    });

    assert_eq!(Err(virt), res);
}

#[test]
fn negated_conditions() {
    assert_eq!(Condition::GreaterOrEqual, Condition::Less.negate());
    assert_eq!(Condition::Greater, Condition::LessOrEqual.negate());
    assert_eq!(Condition::Zero, Condition::NotZero.negate());
    assert_eq!(Condition::Equal, Condition::Equal.negate().negate());
}

#[test]
fn nasm_text() {
    let cases = vec![
        (
            Instruction::MoveRM {
                dest: Register::RAX,
                src: Addressing::base(Register::RBP, -16),
            },
            "mov rax, qword [rbp - 16]",
        ),
        (
            Instruction::MoveMR {
                dest: Addressing::Base {
                    base: Register::RBX,
                    displacement: Displacement::Label(Label::from("table")),
                },
                src: Register::RCX,
            },
            "mov qword [rbx + table], rcx",
        ),
        (
            Instruction::Lea {
                dest: Register::RDI,
                address: Addressing::Displacement(Displacement::Label(Label::from("display"))),
            },
            "lea rdi, [display]",
        ),
        (
            Instruction::Arithmetic(Arithmetic::Mul, Register::R8, Register::R9),
            "imul r8, r9",
        ),
        (Instruction::SetR(Condition::LessOrEqual, Register::RSI), "setle sil"),
        (Instruction::Shift(Shift::Right, Register::R12), "sar r12, cl"),
        (
            Instruction::JmpIf(Condition::NotZero, Label::from("_3")),
            "jnz _3",
        ),
        (Instruction::MoveRR { dest: Register::RAX, src: Register::RSP }, "mov rax, rsp"),
        (Instruction::Ret { uses: vec![Register::RAX] }, "ret"),
    ];

    for (instruction, expected) in cases {
        assert_eq!(expected, instruction.to_string());
    }
}

#[test]
fn virtual_registers_are_numbered() {
    let mut registers = Registers::new();
    let virt = registers.fresh();

    assert_eq!("%16", virt.to_string());
    assert_eq!("%16b", virt.low().to_string());
    assert!(!virt.is_hardware());
}
