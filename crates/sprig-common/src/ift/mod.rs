//! Intermediate form trees and the control flow graph that strings their roots together.
//!
//! Nodes are stored in a [`Nodes`] arena and referred to by [`NodeId`]. Two structurally equal
//! trees are still different trees: every map keyed on nodes is keyed on the handle.

pub use builder::CfgBuilder;
pub use cfg::{ControlFlowGraph, LinkKind, Successors};
pub use node::{BinaryOp, Node, NodeId, Nodes, UnaryOp};

mod builder;
mod cfg;
mod node;
