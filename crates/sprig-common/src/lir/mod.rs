//! The linear form: a flat list of labels and x86-64 instructions that still refer to virtual
//! registers until allocation has run.

pub use addressing::{Addressing, Displacement};
pub use condition::Condition;
pub use instruction::{Arithmetic, Flow, Instruction, Shift};
pub use item::{Item, Label};

mod addressing;
mod condition;
mod instruction;
mod item;

#[cfg(test)]
mod tests;
