use std::fmt;

use super::Instruction;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a linear program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Item {
    Label(Label),
    Instruction(Instruction),
}

impl Item {
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            Self::Instruction(instruction) => Some(instruction),
            Self::Label(_) => None,
        }
    }
}

impl From<Instruction> for Item {
    fn from(instruction: Instruction) -> Self {
        Self::Instruction(instruction)
    }
}

impl From<Label> for Item {
    fn from(label: Label) -> Self {
        Self::Label(label)
    }
}
