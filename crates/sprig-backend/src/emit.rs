//! Rendering an allocated program as NASM assembly.

use std::collections::HashMap;
use std::fmt::{self, Write};

use log::trace;
use sprig_common::lir::Item;
use sprig_common::Register;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("register {0} was never allocated")]
    Unallocated(Register),

    #[error(transparent)]
    Format(#[from] fmt::Error),
}

/// Writes the program with every virtual register replaced by its color. Hardware registers are
/// written as themselves.
pub fn asm(program: &[Item], allocation: &HashMap<Register, Register>) -> Result<String, EmitError> {
    let mut res = String::new();

    for item in program {
        match item {
            Item::Label(label) => writeln!(res, "{label}:")?,
            Item::Instruction(instruction) => {
                let instruction = instruction.try_map_registers(&mut |register| {
                    if register.is_hardware() {
                        Ok(register)
                    } else {
                        allocation
                            .get(&register)
                            .copied()
                            .ok_or(EmitError::Unallocated(register))
                    }
                })?;

                writeln!(res, "    {instruction}")?;
            }
        }
    }

    trace!("emitted {} lines", program.len());
    Ok(res)
}
