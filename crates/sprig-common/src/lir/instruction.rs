use std::convert::Infallible;
use std::fmt;

use super::{Addressing, Condition, Label};
use crate::Register;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

impl Arithmetic {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "imul",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shift {
    Left,
    Right,
}

impl Shift {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Left => "sal",
            Self::Right => "sar",
        }
    }
}

/// Where control goes after an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow<'a> {
    /// Falls through to the next instruction.
    Next,
    /// Always continues at the label.
    Jump(&'a Label),
    /// Continues at the label or falls through.
    Branch(&'a Label),
    /// Leaves the procedure or jumps somewhere unknown.
    Exit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    MoveRR {
        dest: Register,
        src: Register,
    },
    MoveRM {
        dest: Register,
        src: Addressing,
    },
    MoveMR {
        dest: Addressing,
        src: Register,
    },
    MoveRI {
        dest: Register,
        value: i64,
    },
    Lea {
        dest: Register,
        address: Addressing,
    },

    PushR(Register),
    PushM(Addressing),
    PushI(i64),
    PopR(Register),
    PopM(Addressing),

    NegR(Register),
    NotR(Register),
    /// `op left, right`, leaving the result in `left`.
    Arithmetic(Arithmetic, Register, Register),
    /// Signed division of `rdx:rax`, quotient in `rax` and remainder in `rdx`.
    DivR(Register),
    /// Sign-extends `rax` into `rdx`.
    Cqo,
    /// Shifts the register by `cl`.
    Shift(Shift, Register),

    CmpRR(Register, Register),
    TestRR(Register, Register),
    SetR(Condition, Register),

    CallR {
        target: Register,
        uses: Vec<Register>,
        defines: Vec<Register>,
    },
    CallL {
        target: Label,
        uses: Vec<Register>,
        defines: Vec<Register>,
    },

    Jmp(Label),
    JmpIf(Condition, Label),
    JmpR(Register),
    Ret {
        uses: Vec<Register>,
    },
}

fn dedup(registers: Vec<Register>) -> Vec<Register> {
    let mut res = Vec::with_capacity(registers.len());
    for register in registers {
        if !res.contains(&register) {
            res.push(register);
        }
    }
    res
}

impl Instruction {
    /// Registers read by the instruction, without duplicates and in operand order.
    pub fn uses(&self) -> Vec<Register> {
        let registers = match self {
            Self::MoveRR { src, .. } => vec![*src],
            Self::MoveRM { src, .. } => src.registers(),
            Self::MoveMR { dest, src } => {
                let mut registers = dest.registers();
                registers.push(*src);
                registers
            }
            Self::MoveRI { .. } => vec![],
            Self::Lea { address, .. } => address.registers(),

            Self::PushR(register) => vec![*register],
            Self::PushM(address) | Self::PopM(address) => address.registers(),
            Self::PushI(_) | Self::PopR(_) => vec![],

            Self::NegR(register) | Self::NotR(register) | Self::SetR(_, register) => {
                vec![*register]
            }
            Self::Arithmetic(_, left, right)
            | Self::CmpRR(left, right)
            | Self::TestRR(left, right) => vec![*left, *right],
            Self::DivR(divisor) => vec![Register::RAX, Register::RDX, *divisor],
            Self::Cqo => vec![Register::RAX],
            Self::Shift(_, register) => vec![*register, Register::RCX],

            Self::CallR { target, uses, .. } => {
                let mut registers = vec![*target];
                registers.extend(uses.iter().copied());
                registers
            }
            Self::CallL { uses, .. } | Self::Ret { uses } => uses.clone(),

            Self::Jmp(_) | Self::JmpIf(..) => vec![],
            Self::JmpR(register) => vec![*register],
        };

        dedup(registers)
    }

    /// Registers written by the instruction, without duplicates and in operand order.
    pub fn defines(&self) -> Vec<Register> {
        let registers = match self {
            Self::MoveRR { dest, .. }
            | Self::MoveRM { dest, .. }
            | Self::MoveRI { dest, .. }
            | Self::Lea { dest, .. } => vec![*dest],
            Self::MoveMR { .. } => vec![],

            Self::PopR(register) => vec![*register],
            Self::PushR(_) | Self::PushM(_) | Self::PushI(_) | Self::PopM(_) => vec![],

            Self::NegR(register)
            | Self::NotR(register)
            | Self::SetR(_, register)
            | Self::Shift(_, register)
            | Self::Arithmetic(_, register, _) => vec![*register],
            Self::DivR(_) => vec![Register::RAX, Register::RDX],
            Self::Cqo => vec![Register::RDX],
            Self::CmpRR(..) | Self::TestRR(..) => vec![],

            Self::CallR { defines, .. } | Self::CallL { defines, .. } => defines.clone(),

            Self::Jmp(_) | Self::JmpIf(..) | Self::JmpR(_) | Self::Ret { .. } => vec![],
        };

        dedup(registers)
    }

    pub fn flow(&self) -> Flow<'_> {
        match self {
            Self::Jmp(label) => Flow::Jump(label),
            Self::JmpIf(_, label) => Flow::Branch(label),
            Self::JmpR(_) | Self::Ret { .. } => Flow::Exit,
            _ => Flow::Next,
        }
    }

    /// The `(dest, src)` pair of a register to register move.
    pub fn as_copy(&self) -> Option<(Register, Register)> {
        match self {
            Self::MoveRR { dest, src } => Some((*dest, *src)),
            _ => None,
        }
    }

    pub fn map_registers(&self, mut f: impl FnMut(Register) -> Register) -> Self {
        match self.try_map_registers(&mut |register| Ok::<_, Infallible>(f(register))) {
            Ok(instruction) => instruction,
            Err(never) => match never {},
        }
    }

    /// Rebuilds the instruction with every register operand, explicit or listed, passed through
    /// `f`. Implicit operands such as the `rax` of `cqo` are left alone.
    pub fn try_map_registers<E>(
        &self,
        f: &mut impl FnMut(Register) -> Result<Register, E>,
    ) -> Result<Self, E> {
        let mut all = |registers: &[Register]| -> Result<Vec<Register>, E> {
            registers.iter().map(|register| f(*register)).collect()
        };

        let res = match self {
            Self::CallR {
                target,
                uses,
                defines,
            } => {
                let uses = all(uses)?;
                let defines = all(defines)?;
                Self::CallR {
                    target: f(*target)?,
                    uses,
                    defines,
                }
            }
            Self::CallL {
                target,
                uses,
                defines,
            } => Self::CallL {
                target: target.clone(),
                uses: all(uses)?,
                defines: all(defines)?,
            },
            Self::Ret { uses } => Self::Ret { uses: all(uses)? },

            Self::MoveRR { dest, src } => Self::MoveRR {
                dest: f(*dest)?,
                src: f(*src)?,
            },
            Self::MoveRM { dest, src } => Self::MoveRM {
                dest: f(*dest)?,
                src: src.try_map_registers(f)?,
            },
            Self::MoveMR { dest, src } => Self::MoveMR {
                dest: dest.try_map_registers(f)?,
                src: f(*src)?,
            },
            Self::MoveRI { dest, value } => Self::MoveRI {
                dest: f(*dest)?,
                value: *value,
            },
            Self::Lea { dest, address } => Self::Lea {
                dest: f(*dest)?,
                address: address.try_map_registers(f)?,
            },

            Self::PushR(register) => Self::PushR(f(*register)?),
            Self::PushM(address) => Self::PushM(address.try_map_registers(f)?),
            Self::PushI(value) => Self::PushI(*value),
            Self::PopR(register) => Self::PopR(f(*register)?),
            Self::PopM(address) => Self::PopM(address.try_map_registers(f)?),

            Self::NegR(register) => Self::NegR(f(*register)?),
            Self::NotR(register) => Self::NotR(f(*register)?),
            Self::Arithmetic(op, left, right) => Self::Arithmetic(*op, f(*left)?, f(*right)?),
            Self::DivR(register) => Self::DivR(f(*register)?),
            Self::Cqo => Self::Cqo,
            Self::Shift(op, register) => Self::Shift(*op, f(*register)?),

            Self::CmpRR(left, right) => Self::CmpRR(f(*left)?, f(*right)?),
            Self::TestRR(left, right) => Self::TestRR(f(*left)?, f(*right)?),
            Self::SetR(condition, register) => Self::SetR(*condition, f(*register)?),

            Self::Jmp(label) => Self::Jmp(label.clone()),
            Self::JmpIf(condition, label) => Self::JmpIf(*condition, label.clone()),
            Self::JmpR(register) => Self::JmpR(f(*register)?),
        };

        Ok(res)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoveRR { dest, src } => write!(f, "mov {dest}, {src}"),
            Self::MoveRM { dest, src } => write!(f, "mov {dest}, qword [{src}]"),
            Self::MoveMR { dest, src } => write!(f, "mov qword [{dest}], {src}"),
            Self::MoveRI { dest, value } => write!(f, "mov {dest}, {value}"),
            Self::Lea { dest, address } => write!(f, "lea {dest}, [{address}]"),

            Self::PushR(register) => write!(f, "push {register}"),
            Self::PushM(address) => write!(f, "push qword [{address}]"),
            Self::PushI(value) => write!(f, "push {value}"),
            Self::PopR(register) => write!(f, "pop {register}"),
            Self::PopM(address) => write!(f, "pop qword [{address}]"),

            Self::NegR(register) => write!(f, "neg {register}"),
            Self::NotR(register) => write!(f, "not {register}"),
            Self::Arithmetic(op, left, right) => write!(f, "{} {left}, {right}", op.mnemonic()),
            Self::DivR(register) => write!(f, "idiv {register}"),
            Self::Cqo => write!(f, "cqo"),
            Self::Shift(op, register) => write!(f, "{} {register}, cl", op.mnemonic()),

            Self::CmpRR(left, right) => write!(f, "cmp {left}, {right}"),
            Self::TestRR(left, right) => write!(f, "test {left}, {right}"),
            Self::SetR(condition, register) => {
                write!(f, "set{} {}", condition.suffix(), register.low())
            }

            Self::CallR { target, .. } => write!(f, "call {target}"),
            Self::CallL { target, .. } => write!(f, "call {target}"),

            Self::Jmp(label) => write!(f, "jmp {label}"),
            Self::JmpIf(condition, label) => write!(f, "j{} {label}", condition.suffix()),
            Self::JmpR(register) => write!(f, "jmp {register}"),
            Self::Ret { .. } => write!(f, "ret"),
        }
    }
}
