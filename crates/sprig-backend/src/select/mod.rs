//! Instruction selection by tree-pattern covering.

pub use catalog::{InstructionPattern, X86_64};
pub use cover::{Context, ContextKind, Covering, DynamicCovering, Emit, Matched, Pattern};
pub use pattern::{Argument, ArgumentPattern, Bindable, Bindings, IftPattern, MatchResult};

mod catalog;
mod cover;
mod pattern;
