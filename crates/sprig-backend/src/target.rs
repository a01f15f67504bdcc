use sprig_common::Register;

use crate::alloc::SpillArea;

/// The registers of a machine as seen by the allocator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    /// Registers that always stand for themselves.
    pub hardware: Vec<Register>,
    /// Registers handed out to virtual registers, in order of preference. Spill staging reserves
    /// registers from the front.
    pub palette: Vec<Register>,
    pub spill_area: SpillArea,
}

impl Target {
    /// Every general purpose register except `rsp` and `rbp` is allocatable.
    pub fn x86_64() -> Self {
        Self {
            hardware: Register::HARDWARE.to_vec(),
            palette: vec![
                Register::R11,
                Register::R10,
                Register::R9,
                Register::R8,
                Register::RSI,
                Register::RDI,
                Register::RCX,
                Register::RDX,
                Register::RAX,
                Register::RBX,
                Register::R12,
                Register::R13,
                Register::R14,
                Register::R15,
            ],
            spill_area: SpillArea::default(),
        }
    }

    pub fn with_spill_area(self, spill_area: SpillArea) -> Self {
        Self { spill_area, ..self }
    }
}
