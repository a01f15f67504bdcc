//! The back half of the compiler: from trees of intermediate form to allocated x86-64 code.

use std::collections::HashMap;

use log::info;
use sprig_common::ift::{ControlFlowGraph, Nodes};
use sprig_common::lir::Item;
use sprig_common::{Register, Registers};

use crate::alloc::{allocate_with_spills, ColoringAllocator};
use crate::emit::EmitError;
use crate::select::{DynamicCovering, X86_64};
use crate::target::Target;

pub mod alloc;
pub mod emit;
pub mod linearize;
pub mod liveness;
pub mod select;
pub mod target;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Lowered {
    pub program: Vec<Item>,
    pub allocation: HashMap<Register, Register>,
    /// Bytes of stack needed for spilled registers.
    pub spilled_offset: i64,
}

impl Lowered {
    pub fn asm(&self) -> Result<String, EmitError> {
        emit::asm(&self.program, &self.allocation)
    }
}

/// Selects instructions for every tree, orders them and allocates registers.
pub fn lower(
    cfg: &ControlFlowGraph,
    nodes: &Nodes,
    registers: &mut Registers,
    target: &Target,
) -> Lowered {
    let covering = DynamicCovering::new(X86_64.as_slice());
    let program = linearize::linearize(cfg, nodes, &covering, registers);

    let graphs = liveness::liveness_graphs(&program);
    let allocated = allocate_with_spills(&program, &graphs, target, &ColoringAllocator, registers);

    info!(
        "lowered {} items into {}, spilling {} bytes",
        program.len(),
        allocated.program.len(),
        allocated.spilled_offset
    );

    Lowered {
        program: allocated.program,
        allocation: allocated.allocation,
        spilled_offset: allocated.spilled_offset,
    }
}

#[cfg(test)]
mod tests;
