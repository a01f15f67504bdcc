use std::fmt;

use super::Label;
use crate::Register;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Displacement {
    Const(i64),
    Label(Label),
}

/// An x86-64 memory operand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Addressing {
    Displacement(Displacement),
    Base {
        base: Register,
        displacement: Displacement,
    },
    BaseAndIndex {
        base: Register,
        index: Register,
        scale: u8,
        displacement: Displacement,
    },
    IndexAndDisplacement {
        index: Register,
        scale: u8,
        displacement: Displacement,
    },
}

impl Addressing {
    /// `[base + offset]`
    pub fn base(base: Register, offset: i64) -> Self {
        Self::Base {
            base,
            displacement: Displacement::Const(offset),
        }
    }

    pub fn registers(&self) -> Vec<Register> {
        match self {
            Self::Displacement(_) => vec![],
            Self::Base { base, .. } => vec![*base],
            Self::BaseAndIndex { base, index, .. } => vec![*base, *index],
            Self::IndexAndDisplacement { index, .. } => vec![*index],
        }
    }

    pub fn try_map_registers<E>(
        &self,
        f: &mut impl FnMut(Register) -> Result<Register, E>,
    ) -> Result<Self, E> {
        Ok(match self {
            Self::Displacement(displacement) => Self::Displacement(displacement.clone()),
            Self::Base { base, displacement } => Self::Base {
                base: f(*base)?,
                displacement: displacement.clone(),
            },
            Self::BaseAndIndex {
                base,
                index,
                scale,
                displacement,
            } => Self::BaseAndIndex {
                base: f(*base)?,
                index: f(*index)?,
                scale: *scale,
                displacement: displacement.clone(),
            },
            Self::IndexAndDisplacement {
                index,
                scale,
                displacement,
            } => Self::IndexAndDisplacement {
                index: f(*index)?,
                scale: *scale,
                displacement: displacement.clone(),
            },
        })
    }
}

impl fmt::Display for Displacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{value}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Writes the displacement as a trailing term, eliding a zero constant.
fn offset(f: &mut fmt::Formatter<'_>, displacement: &Displacement) -> fmt::Result {
    match displacement {
        Displacement::Const(0) => Ok(()),
        Displacement::Const(value) if *value < 0 => write!(f, " - {}", value.unsigned_abs()),
        Displacement::Const(value) => write!(f, " + {value}"),
        Displacement::Label(label) => write!(f, " + {label}"),
    }
}

impl fmt::Display for Addressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Displacement(displacement) => write!(f, "{displacement}"),
            Self::Base { base, displacement } => {
                write!(f, "{base}")?;
                offset(f, displacement)
            }
            Self::BaseAndIndex {
                base,
                index,
                scale,
                displacement,
            } => {
                write!(f, "{base} + {index}*{scale}")?;
                offset(f, displacement)
            }
            Self::IndexAndDisplacement {
                index,
                scale,
                displacement,
            } => {
                write!(f, "{index}*{scale}")?;
                offset(f, displacement)
            }
        }
    }
}
