//! Accessing the variables of a procedure frame from its own body or from a nested procedure.
//!
//! Memory-resident variables live below the frame pointer in word-sized slots. A nested
//! procedure cannot use `rbp` to reach them, so it goes through the display: a global table
//! holding the frame pointer of the most recent activation at each static depth.

use std::collections::HashMap;

use log::trace;
use thiserror::Error;

use crate::ift::{BinaryOp, NodeId, Nodes};
use crate::{Register, Registers, WORD_SIZE};

/// Label of the display table.
pub const DISPLAY: &str = "display";

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VariableId(pub usize);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Location {
    Memory,
    Register,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Access {
    /// From the procedure owning the frame.
    Direct,
    /// From a nested procedure, through the display.
    Indirect,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AccessError {
    #[error("variable {0:?} is kept in a register and has no address to access indirectly")]
    IndirectRegisterAccess(VariableId),

    #[error("variable {0:?} does not belong to this frame")]
    UnknownVariable(VariableId),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    Memory(i64),
    Register(Register),
}

#[derive(Debug)]
pub struct Frame {
    depth: u64,
    slots: HashMap<VariableId, Slot>,
    size: i64,
}

impl Frame {
    /// Lays out the variables in the order given. Register-resident variables each get a fresh
    /// virtual register.
    pub fn new(
        depth: u64,
        variables: impl IntoIterator<Item = (VariableId, Location)>,
        registers: &mut Registers,
    ) -> Self {
        let mut slots = HashMap::new();
        let mut size = 0;

        for (variable, location) in variables {
            let slot = match location {
                Location::Memory => {
                    size += WORD_SIZE;
                    Slot::Memory(size)
                }
                Location::Register => Slot::Register(registers.fresh()),
            };

            slots.insert(variable, slot);
        }

        trace!("laid out frame at depth {depth} with {size} bytes of variables");

        Self { depth, slots, size }
    }

    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// Bytes taken by memory-resident variables below the frame pointer.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// The register holding a register-resident variable.
    pub fn register_of(&self, variable: VariableId) -> Option<Register> {
        match self.slots.get(&variable) {
            Some(Slot::Register(register)) => Some(*register),
            _ => None,
        }
    }

    pub fn read(
        &self,
        nodes: &mut Nodes,
        variable: VariableId,
        access: Access,
    ) -> Result<NodeId, AccessError> {
        match self.slot(variable, access)? {
            Slot::Register(register) => Ok(nodes.read(register)),
            Slot::Memory(offset) => {
                let address = self.address(nodes, offset, access);
                Ok(nodes.load(address))
            }
        }
    }

    pub fn write(
        &self,
        nodes: &mut Nodes,
        variable: VariableId,
        value: NodeId,
        access: Access,
    ) -> Result<NodeId, AccessError> {
        match self.slot(variable, access)? {
            Slot::Register(register) => Ok(nodes.write(register, value)),
            Slot::Memory(offset) => {
                let address = self.address(nodes, offset, access);
                Ok(nodes.store(address, value))
            }
        }
    }

    fn slot(&self, variable: VariableId, access: Access) -> Result<Slot, AccessError> {
        match (self.slots.get(&variable), access) {
            (None, _) => Err(AccessError::UnknownVariable(variable)),
            (Some(Slot::Register(_)), Access::Indirect) => {
                Err(AccessError::IndirectRegisterAccess(variable))
            }
            (Some(slot), _) => Ok(*slot),
        }
    }

    /// `base - offset`, where the base is `rbp` or this frame's display entry.
    fn address(&self, nodes: &mut Nodes, offset: i64, access: Access) -> NodeId {
        let base = match access {
            Access::Direct => nodes.read(Register::RBP),
            Access::Indirect => {
                let display = nodes.label(DISPLAY);
                let entry = nodes.constant(WORD_SIZE * self.depth as i64);
                let element = nodes.binary(BinaryOp::Add, display, entry);
                nodes.load(element)
            }
        };

        let offset = nodes.constant(offset);
        nodes.binary(BinaryOp::Subtract, base, offset)
    }
}

#[cfg(test)]
mod tests;
