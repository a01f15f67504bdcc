//! Register allocation by graph coloring.
//!
//! [`coalesce`] merges move related registers and orders the result for coloring,
//! [`ColoringAllocator`] assigns colors in that order, and [`allocate_with_spills`] keeps
//! reserving registers until every spilled value can be staged through one of them.

use std::collections::HashMap;

use sprig_common::Register;

use crate::liveness::LivenessGraphs;

pub use coloring::ColoringAllocator;
pub use graph::{coalesce, CoalescedNode};
pub use spill::{allocate_with_spills, Allocated, SpillArea};

mod coloring;
mod graph;
mod spill;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AllocationResult {
    /// The color of every register that got one.
    pub allocated: HashMap<Register, Register>,
    /// Registers that could not be colored.
    pub spilled: Vec<Register>,
}

pub trait Allocator {
    /// Colors the registers of `graphs` with colors from `available`. Registers in `self_colored`
    /// always get themselves as their color, whether or not they are available.
    fn allocate(
        &self,
        graphs: &LivenessGraphs,
        self_colored: &[Register],
        available: &[Register],
    ) -> AllocationResult;
}
