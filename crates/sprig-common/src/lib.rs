pub mod frame;
pub mod ift;
pub mod lir;
pub mod pretty;

pub use register::{LowByte, Register, Registers};

mod register;

/// Size in bytes of a machine word, a stack slot and a display entry.
pub const WORD_SIZE: i64 = 8;
