use std::collections::{BTreeSet, HashMap};

use log::{debug, info, trace};
use sprig_common::lir::{Addressing, Instruction, Item};
use sprig_common::{Register, Registers, WORD_SIZE};

use super::{AllocationResult, Allocator};
use crate::liveness::LivenessGraphs;
use crate::target::Target;

/// Where spilled values live. Slot `n` is `n` words away from the base, starting at 1.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpillArea {
    base: Register,
    offset: i64,
    downward: bool,
}

impl SpillArea {
    /// Slots at `[base + n * 8]`.
    pub fn above(base: Register) -> Self {
        Self {
            base,
            offset: 0,
            downward: false,
        }
    }

    /// Slots at `[base - (offset + n * 8)]`, for an area placed below a frame of `offset` bytes.
    pub fn below(base: Register, offset: i64) -> Self {
        Self {
            base,
            offset,
            downward: true,
        }
    }

    pub fn slot(&self, index: i64) -> Addressing {
        let distance = self.offset + index * WORD_SIZE;
        if self.downward {
            Addressing::base(self.base, -distance)
        } else {
            Addressing::base(self.base, distance)
        }
    }
}

impl Default for SpillArea {
    fn default() -> Self {
        Self::above(Register::RSP)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Allocated {
    /// Colors of the registers that were not spilled.
    pub allocation: HashMap<Register, Register>,
    /// The program with spilled registers replaced by reserved ones and staged through memory.
    pub program: Vec<Item>,
    /// Bytes taken by the spill slots.
    pub spilled_offset: i64,
}

/// Allocates registers, reserving more and more palette registers for staging spilled values
/// until every instruction can be rewritten. Panics if even reserving the whole palette does not
/// suffice.
pub fn allocate_with_spills<A: Allocator>(
    program: &[Item],
    graphs: &LivenessGraphs,
    target: &Target,
    allocator: &A,
    registers: &mut Registers,
) -> Allocated {
    info!("beginning register allocation");

    let mut reserved = 0;
    loop {
        if reserved > target.palette.len() {
            panic!(
                "cannot stage spills with {} registers",
                target.palette.len()
            );
        }

        let (staging, usable) = target.palette.split_at(reserved);
        let result = allocator.allocate(graphs, &target.hardware, usable);
        let spilled: BTreeSet<Register> = result.spilled.iter().copied().collect();

        let needed = program
            .iter()
            .filter_map(Item::instruction)
            .map(|instruction| spilled_operands(instruction, &spilled).len())
            .max()
            .unwrap_or(0);

        if needed <= reserved {
            debug!(
                "{} spilled registers staged through {} reserved",
                spilled.len(),
                reserved
            );

            let spiller = Spiller {
                staging,
                area: &target.spill_area,
                slots: pack(graphs, &spilled, allocator, registers),
                spilled,
                result,
            };

            return spiller.finish(program);
        }

        trace!("{needed} spilled operands need more than {reserved} reserved registers");
        reserved += 1;
    }
}

/// The spilled registers of an instruction, uses first.
fn spilled_operands(instruction: &Instruction, spilled: &BTreeSet<Register>) -> Vec<Register> {
    let mut operands: Vec<Register> = instruction
        .uses()
        .into_iter()
        .filter(|register| spilled.contains(register))
        .collect();

    for defined in instruction.defines() {
        if spilled.contains(&defined) && !operands.contains(&defined) {
            operands.push(defined);
        }
    }

    operands
}

/// Assigns every spilled register a 1-based slot, sharing slots between registers that never
/// interfere.
fn pack<A: Allocator>(
    graphs: &LivenessGraphs,
    spilled: &BTreeSet<Register>,
    allocator: &A,
    registers: &mut Registers,
) -> HashMap<Register, i64> {
    if spilled.is_empty() {
        return HashMap::new();
    }

    let graphs = graphs.induced_subgraph(spilled);
    let slots: Vec<Register> = spilled.iter().map(|_| registers.fresh()).collect();
    let packing = allocator.allocate(&graphs, &slots, &slots);

    let used: Vec<Register> = slots
        .iter()
        .copied()
        .filter(|slot| packing.allocated.values().any(|color| color == slot))
        .collect();

    packing
        .allocated
        .iter()
        .filter_map(|(register, color)| {
            let index = used.iter().position(|slot| slot == color)?;
            Some((*register, index as i64 + 1))
        })
        .collect()
}

struct Spiller<'a> {
    staging: &'a [Register],
    area: &'a SpillArea,
    slots: HashMap<Register, i64>,
    spilled: BTreeSet<Register>,
    result: AllocationResult,
}

impl Spiller<'_> {
    pub fn finish(self, program: &[Item]) -> Allocated {
        let mut rewritten = Vec::with_capacity(program.len());

        for item in program {
            match item {
                Item::Label(_) => rewritten.push(item.clone()),
                Item::Instruction(instruction) => self.rewrite(instruction, &mut rewritten),
            }
        }

        let before = rewritten.len();
        rewritten.retain(|item| !self.is_dead_move(item));
        trace!("removed {} dead moves", before - rewritten.len());

        let spilled_offset = self.slots.values().copied().max().unwrap_or(0) * WORD_SIZE;

        Allocated {
            allocation: self.result.allocated,
            program: rewritten,
            spilled_offset,
        }
    }

    fn rewrite(&self, instruction: &Instruction, out: &mut Vec<Item>) {
        let operands = spilled_operands(instruction, &self.spilled);
        if operands.is_empty() {
            out.push(instruction.clone().into());
            return;
        }

        let staged: HashMap<Register, Register> = operands
            .iter()
            .copied()
            .zip(self.staging.iter().copied())
            .collect();

        for used in instruction.uses() {
            if let Some(staging) = staged.get(&used) {
                out.push(
                    Instruction::MoveRM {
                        dest: *staging,
                        src: self.slot(used),
                    }
                    .into(),
                );
            }
        }

        let mapped = instruction.map_registers(|register| {
            staged.get(&register).copied().unwrap_or(register)
        });
        out.push(mapped.into());

        for defined in instruction.defines() {
            if let Some(staging) = staged.get(&defined) {
                out.push(
                    Instruction::MoveMR {
                        dest: self.slot(defined),
                        src: *staging,
                    }
                    .into(),
                );
            }
        }
    }

    fn slot(&self, register: Register) -> Addressing {
        match self.slots.get(&register) {
            Some(index) => self.area.slot(*index),
            None => panic!("spilled register {register} has no slot"),
        }
    }

    fn is_dead_move(&self, item: &Item) -> bool {
        let Some((dest, src)) = item.instruction().and_then(Instruction::as_copy) else {
            return false;
        };

        self.resolve(dest) == self.resolve(src)
    }

    /// The final color of a register of the rewritten program.
    fn resolve(&self, register: Register) -> Register {
        self.result
            .allocated
            .get(&register)
            .copied()
            .unwrap_or(register)
    }
}
