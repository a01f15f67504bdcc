#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Condition {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Zero,
    NotZero,
}

impl Condition {
    /// The condition that holds exactly when `self` does not.
    pub fn negate(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::Less => Self::GreaterOrEqual,
            Self::LessOrEqual => Self::Greater,
            Self::Greater => Self::LessOrEqual,
            Self::GreaterOrEqual => Self::Less,
            Self::Zero => Self::NotZero,
            Self::NotZero => Self::Zero,
        }
    }

    /// The condition code suffix shared by `jcc` and `setcc`.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Equal => "e",
            Self::NotEqual => "ne",
            Self::Less => "l",
            Self::LessOrEqual => "le",
            Self::Greater => "g",
            Self::GreaterOrEqual => "ge",
            Self::Zero => "z",
            Self::NotZero => "nz",
        }
    }
}
