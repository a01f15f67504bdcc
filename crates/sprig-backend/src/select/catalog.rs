//! The x86-64 instruction patterns.
//!
//! The cost of an entry is the number of instructions its emitter produces, so the covering with
//! the least cost is the shortest one. Among equally short coverings the earlier entry wins.

use lazy_static::lazy_static;
use sprig_common::ift::{BinaryOp, NodeId, Nodes, UnaryOp};
use sprig_common::lir::{Addressing, Arithmetic, Condition, Displacement, Instruction, Shift};
use sprig_common::Register;

use super::cover::{Context, ContextKind, Emit, Matched, Pattern};
use super::pattern::{ArgumentPattern, IftPattern};

pub struct InstructionPattern {
    pub pattern: IftPattern,
    pub contexts: &'static [ContextKind],
    pub cost: u32,
    pub emit: fn(&mut Emit<'_>) -> Vec<Instruction>,
}

impl Pattern for InstructionPattern {
    fn try_match(&self, nodes: &Nodes, node: NodeId, context: &Context) -> Option<Matched> {
        if !self.contexts.contains(&context.kind()) {
            return None;
        }

        self.pattern
            .try_match(nodes, node)
            .map(|result| Matched {
                subtrees: result.subtrees,
                bindings: result.bindings,
            })
    }

    fn cost(&self) -> u32 {
        self.cost
    }

    fn emit(&self, emit: &mut Emit<'_>) -> Vec<Instruction> {
        (self.emit)(emit)
    }
}

const EFFECT: &[ContextKind] = &[ContextKind::Value, ContextKind::Unconditional];
const VALUE: &[ContextKind] = &[ContextKind::Value];
const CONDITION: &[ContextKind] = &[ContextKind::Conditional];

lazy_static! {
    pub static ref X86_64: Vec<InstructionPattern> = x86_64();
}

fn entry(
    pattern: IftPattern,
    contexts: &'static [ContextKind],
    cost: u32,
    emit: fn(&mut Emit<'_>) -> Vec<Instruction>,
) -> InstructionPattern {
    InstructionPattern {
        pattern,
        contexts,
        cost,
        emit,
    }
}

fn any() -> IftPattern {
    IftPattern::AnyNode
}

fn register(name: &'static str) -> IftPattern {
    IftPattern::RegisterRead(ArgumentPattern::named(name))
}

fn constant(name: &'static str) -> IftPattern {
    IftPattern::Const(ArgumentPattern::named(name))
}

fn label(name: &'static str) -> IftPattern {
    IftPattern::MemoryLabel(ArgumentPattern::named(name))
}

/// `label + any`, the shape of an indexed global.
fn indexed_label() -> IftPattern {
    IftPattern::binary(BinaryOp::Add, label("label"), any())
}

/// `reg - const`, the shape of a frame slot. The offset must be negatable to fit a displacement.
fn frame_slot() -> IftPattern {
    let offset = IftPattern::Const(ArgumentPattern::Where(
        |offset: &i64| offset.checked_neg().is_some(),
        Some("offset"),
    ));

    IftPattern::binary(BinaryOp::Subtract, register("base"), offset)
}

fn slot_address(emit: &Emit<'_>) -> Addressing {
    Addressing::base(
        emit.bindings.register("base"),
        -emit.bindings.constant("offset"),
    )
}

fn label_address(emit: &Emit<'_>, base: Register) -> Addressing {
    Addressing::Base {
        base,
        displacement: Displacement::Label(emit.bindings.label("label")),
    }
}

fn arithmetic() -> IftPattern {
    IftPattern::FirstOfNamed(
        "op",
        vec![
            ("add", IftPattern::operation(BinaryOp::Add)),
            ("sub", IftPattern::operation(BinaryOp::Subtract)),
            ("mul", IftPattern::operation(BinaryOp::Multiply)),
            ("and", IftPattern::operation(BinaryOp::BitAnd)),
            ("and", IftPattern::operation(BinaryOp::LogicalAnd)),
            ("or", IftPattern::operation(BinaryOp::BitOr)),
            ("xor", IftPattern::operation(BinaryOp::BitXor)),
            ("xor", IftPattern::operation(BinaryOp::LogicalXor)),
        ],
    )
}

fn arithmetic_op(choice: &str) -> Arithmetic {
    match choice {
        "add" => Arithmetic::Add,
        "sub" => Arithmetic::Sub,
        "mul" => Arithmetic::Mul,
        "and" => Arithmetic::And,
        "or" => Arithmetic::Or,
        "xor" => Arithmetic::Xor,
        choice => unreachable!("unknown arithmetic choice `{choice}`"),
    }
}

fn shift() -> IftPattern {
    IftPattern::FirstOfNamed(
        "op",
        vec![
            ("left", IftPattern::operation(BinaryOp::ShiftLeft)),
            ("right", IftPattern::operation(BinaryOp::ShiftRight)),
        ],
    )
}

/// Comparisons, keyed by the condition under which the comparison holds. Equality and logical
/// iff coincide on booleans.
fn comparison() -> IftPattern {
    IftPattern::FirstOfNamed(
        "cmp",
        vec![
            ("e", IftPattern::operation(BinaryOp::Equals)),
            ("e", IftPattern::operation(BinaryOp::LogicalIff)),
            ("ne", IftPattern::operation(BinaryOp::NotEquals)),
            ("l", IftPattern::operation(BinaryOp::Less)),
            ("le", IftPattern::operation(BinaryOp::LessOrEqual)),
            ("g", IftPattern::operation(BinaryOp::Greater)),
            ("ge", IftPattern::operation(BinaryOp::GreaterOrEqual)),
        ],
    )
}

fn comparison_condition(choice: &str) -> Condition {
    match choice {
        "e" => Condition::Equal,
        "ne" => Condition::NotEqual,
        "l" => Condition::Less,
        "le" => Condition::LessOrEqual,
        "g" => Condition::Greater,
        "ge" => Condition::GreaterOrEqual,
        choice => unreachable!("unknown comparison choice `{choice}`"),
    }
}

fn x86_64() -> Vec<InstructionPattern> {
    vec![
        // loads
        entry(IftPattern::load(frame_slot()), EFFECT, 1, |e| {
            vec![Instruction::MoveRM {
                dest: e.output,
                src: slot_address(e),
            }]
        }),
        entry(IftPattern::load(indexed_label()), EFFECT, 1, |e| {
            vec![Instruction::MoveRM {
                dest: e.output,
                src: label_address(e, e.input(0)),
            }]
        }),
        entry(IftPattern::load(any()), EFFECT, 1, |e| {
            vec![Instruction::MoveRM {
                dest: e.output,
                src: Addressing::base(e.input(0), 0),
            }]
        }),
        entry(label("label"), EFFECT, 1, |e| {
            vec![Instruction::Lea {
                dest: e.output,
                address: Addressing::Displacement(Displacement::Label(e.bindings.label("label"))),
            }]
        }),
        entry(register("reg"), EFFECT, 1, |e| {
            vec![Instruction::MoveRR {
                dest: e.output,
                src: e.bindings.register("reg"),
            }]
        }),
        entry(constant("const"), EFFECT, 1, |e| {
            vec![Instruction::MoveRI {
                dest: e.output,
                value: e.bindings.constant("const"),
            }]
        }),
        // stores
        entry(IftPattern::store(frame_slot(), any()), EFFECT, 1, |e| {
            vec![Instruction::MoveMR {
                dest: slot_address(e),
                src: e.input(0),
            }]
        }),
        entry(IftPattern::store(indexed_label(), any()), EFFECT, 1, |e| {
            vec![Instruction::MoveMR {
                dest: label_address(e, e.input(0)),
                src: e.input(1),
            }]
        }),
        entry(IftPattern::store(any(), any()), EFFECT, 1, |e| {
            vec![Instruction::MoveMR {
                dest: Addressing::base(e.input(0), 0),
                src: e.input(1),
            }]
        }),
        // register writes
        entry(
            IftPattern::write(ArgumentPattern::named("reg"), constant("const")),
            EFFECT,
            1,
            |e| {
                vec![Instruction::MoveRI {
                    dest: e.bindings.register("reg"),
                    value: e.bindings.constant("const"),
                }]
            },
        ),
        entry(
            IftPattern::write(ArgumentPattern::named("reg"), register("src")),
            EFFECT,
            1,
            |e| {
                vec![Instruction::MoveRR {
                    dest: e.bindings.register("reg"),
                    src: e.bindings.register("src"),
                }]
            },
        ),
        entry(
            IftPattern::write(ArgumentPattern::named("reg"), IftPattern::StackPop),
            EFFECT,
            1,
            |e| vec![Instruction::PopR(e.bindings.register("reg"))],
        ),
        entry(
            IftPattern::write(ArgumentPattern::named("reg"), any()),
            EFFECT,
            1,
            |e| {
                vec![Instruction::MoveRR {
                    dest: e.bindings.register("reg"),
                    src: e.input(0),
                }]
            },
        ),
        // stack
        entry(IftPattern::push(register("reg")), EFFECT, 1, |e| {
            vec![Instruction::PushR(e.bindings.register("reg"))]
        }),
        entry(IftPattern::push(constant("const")), EFFECT, 1, |e| {
            vec![Instruction::PushI(e.bindings.constant("const"))]
        }),
        entry(IftPattern::push(any()), EFFECT, 1, |e| {
            vec![Instruction::PushR(e.input(0))]
        }),
        entry(IftPattern::StackPop, EFFECT, 1, |e| {
            vec![Instruction::PopR(e.output)]
        }),
        // control transfer
        entry(
            IftPattern::JumpToRegister(ArgumentPattern::named("reg")),
            EFFECT,
            1,
            |e| vec![Instruction::JmpR(e.bindings.register("reg"))],
        ),
        entry(
            IftPattern::Call(
                Box::new(label("label")),
                ArgumentPattern::named("uses"),
                ArgumentPattern::named("defines"),
            ),
            EFFECT,
            1,
            |e| {
                vec![Instruction::CallL {
                    target: e.bindings.label("label"),
                    uses: e.bindings.registers("uses"),
                    defines: e.bindings.registers("defines"),
                }]
            },
        ),
        entry(
            IftPattern::Call(
                Box::new(any()),
                ArgumentPattern::named("uses"),
                ArgumentPattern::named("defines"),
            ),
            EFFECT,
            1,
            |e| {
                vec![Instruction::CallR {
                    target: e.input(0),
                    uses: e.bindings.registers("uses"),
                    defines: e.bindings.registers("defines"),
                }]
            },
        ),
        entry(
            IftPattern::Return(ArgumentPattern::named("uses")),
            EFFECT,
            1,
            |e| {
                vec![Instruction::Ret {
                    uses: e.bindings.registers("uses"),
                }]
            },
        ),
        // arithmetic
        entry(IftPattern::unary(UnaryOp::Negation, any()), EFFECT, 2, |e| {
            vec![
                Instruction::MoveRR {
                    dest: e.output,
                    src: e.input(0),
                },
                Instruction::NegR(e.output),
            ]
        }),
        entry(IftPattern::unary(UnaryOp::BitNegation, any()), EFFECT, 2, |e| {
            vec![
                Instruction::NotR(e.input(0)),
                Instruction::MoveRR {
                    dest: e.output,
                    src: e.input(0),
                },
            ]
        }),
        entry(arithmetic(), EFFECT, 2, |e| {
            let op = arithmetic_op(e.bindings.choice("op"));
            vec![
                Instruction::Arithmetic(op, e.input(0), e.input(1)),
                Instruction::MoveRR {
                    dest: e.output,
                    src: e.input(0),
                },
            ]
        }),
        entry(IftPattern::operation(BinaryOp::Divide), EFFECT, 4, |e| {
            let mut instructions = divide(e);
            instructions.push(Instruction::MoveRR {
                dest: e.output,
                src: Register::RAX,
            });
            instructions
        }),
        entry(IftPattern::operation(BinaryOp::Modulo), EFFECT, 4, |e| {
            let mut instructions = divide(e);
            instructions.push(Instruction::MoveRR {
                dest: e.output,
                src: Register::RDX,
            });
            instructions
        }),
        entry(shift(), EFFECT, 3, |e| {
            let op = match e.bindings.choice("op") {
                "left" => Shift::Left,
                _ => Shift::Right,
            };
            vec![
                Instruction::MoveRR {
                    dest: Register::RCX,
                    src: e.input(1),
                },
                Instruction::Shift(op, e.input(0)),
                Instruction::MoveRR {
                    dest: e.output,
                    src: e.input(0),
                },
            ]
        }),
        // logic
        entry(IftPattern::unary(UnaryOp::LogicalNegation, any()), VALUE, 2, |e| {
            vec![
                Instruction::MoveRI {
                    dest: e.output,
                    value: 1,
                },
                Instruction::Arithmetic(Arithmetic::Xor, e.output, e.input(0)),
            ]
        }),
        entry(
            IftPattern::unary(UnaryOp::LogicalNegation, any()),
            CONDITION,
            2,
            |e| {
                vec![
                    Instruction::TestRR(e.input(0), e.input(0)),
                    e.jump(Condition::Zero),
                ]
            },
        ),
        entry(IftPattern::operation(BinaryOp::LogicalXor), CONDITION, 2, |e| {
            vec![
                Instruction::Arithmetic(Arithmetic::Xor, e.input(0), e.input(1)),
                e.jump(Condition::NotZero),
            ]
        }),
        entry(IftPattern::operation(BinaryOp::LogicalAnd), CONDITION, 2, |e| {
            vec![
                Instruction::TestRR(e.input(0), e.input(1)),
                e.jump(Condition::NotZero),
            ]
        }),
        // comparisons
        entry(comparison(), VALUE, 3, |e| {
            let condition = comparison_condition(e.bindings.choice("cmp"));
            vec![
                Instruction::MoveRI {
                    dest: e.output,
                    value: 0,
                },
                Instruction::CmpRR(e.input(0), e.input(1)),
                Instruction::SetR(condition, e.output),
            ]
        }),
        entry(comparison(), CONDITION, 2, |e| {
            let condition = comparison_condition(e.bindings.choice("cmp"));
            vec![
                Instruction::CmpRR(e.input(0), e.input(1)),
                e.jump(condition),
            ]
        }),
        // plain values as conditions
        entry(register("reg"), CONDITION, 2, |e| {
            let reg = e.bindings.register("reg");
            vec![Instruction::TestRR(reg, reg), e.jump(Condition::NotZero)]
        }),
        entry(constant("const"), CONDITION, 3, |e| {
            let temporary = e.registers.fresh();
            vec![
                Instruction::MoveRI {
                    dest: temporary,
                    value: e.bindings.constant("const"),
                },
                Instruction::TestRR(temporary, temporary),
                e.jump(Condition::NotZero),
            ]
        }),
        entry(IftPattern::load(any()), CONDITION, 3, |e| {
            let temporary = e.registers.fresh();
            vec![
                Instruction::MoveRM {
                    dest: temporary,
                    src: Addressing::base(e.input(0), 0),
                },
                Instruction::TestRR(temporary, temporary),
                e.jump(Condition::NotZero),
            ]
        }),
    ]
}

/// `rax, rdx = left / right, left % right`
fn divide(e: &Emit<'_>) -> Vec<Instruction> {
    vec![
        Instruction::MoveRR {
            dest: Register::RAX,
            src: e.input(0),
        },
        Instruction::Cqo,
        Instruction::DivR(e.input(1)),
    ]
}
