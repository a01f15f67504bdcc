use std::fmt;

const HARDWARE_COUNT: usize = 16;

const NAMES: [&str; HARDWARE_COUNT] = [
    "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15",
];

const LOW_NAMES: [&str; HARDWARE_COUNT] = [
    "al", "bl", "cl", "dl", "sil", "dil", "bpl", "spl", "r8b", "r9b", "r10b", "r11b", "r12b",
    "r13b", "r14b", "r15b",
];

/// A storage location prior to allocation. The first sixteen ids name the x86-64 general purpose
/// registers, every other id is a virtual register handed out by [`Registers`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Register(usize);

impl Register {
    pub const RAX: Self = Self(0);
    pub const RBX: Self = Self(1);
    pub const RCX: Self = Self(2);
    pub const RDX: Self = Self(3);
    pub const RSI: Self = Self(4);
    pub const RDI: Self = Self(5);
    pub const RBP: Self = Self(6);
    pub const RSP: Self = Self(7);
    pub const R8: Self = Self(8);
    pub const R9: Self = Self(9);
    pub const R10: Self = Self(10);
    pub const R11: Self = Self(11);
    pub const R12: Self = Self(12);
    pub const R13: Self = Self(13);
    pub const R14: Self = Self(14);
    pub const R15: Self = Self(15);

    pub const HARDWARE: [Self; HARDWARE_COUNT] = [
        Self::RAX,
        Self::RBX,
        Self::RCX,
        Self::RDX,
        Self::RSI,
        Self::RDI,
        Self::RBP,
        Self::RSP,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    pub fn id(&self) -> usize {
        self.0
    }

    pub fn is_hardware(&self) -> bool {
        self.0 < HARDWARE_COUNT
    }

    /// The 64-bit assembler name, if this is a hardware register.
    pub fn name(&self) -> Option<&'static str> {
        NAMES.get(self.0).copied()
    }

    /// The name of the lowest byte, as used by `setcc`.
    pub fn low_name(&self) -> Option<&'static str> {
        LOW_NAMES.get(self.0).copied()
    }

    pub fn low(self) -> LowByte {
        LowByte(self)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "%{}", self.0),
        }
    }
}

/// Displays the lowest byte of a register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LowByte(Register);

impl fmt::Display for LowByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.low_name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "%{}b", self.0.id()),
        }
    }
}

/// Source of fresh virtual registers. Ids are handed out in increasing order, so two factories
/// driven through the same sequence of calls produce the same registers.
#[derive(Debug)]
pub struct Registers {
    next: usize,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            next: HARDWARE_COUNT,
        }
    }

    pub fn fresh(&mut self) -> Register {
        let register = Register(self.next);
        self.next += 1;
        register
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
