use std::ops::Index;

use crate::lir::Label;
use crate::Register;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOp {
    Negation,
    LogicalNegation,
    BitNegation,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    /// Both operands are evaluated; there is no short circuiting at this level.
    LogicalAnd,
    LogicalXor,
    LogicalIff,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Const(i64),
    RegisterRead(Register),
    RegisterWrite(Register, NodeId),
    MemoryRead(NodeId),
    MemoryWrite(NodeId, NodeId),
    MemoryLabel(Label),
    Unary(UnaryOp, NodeId),
    Binary(BinaryOp, NodeId, NodeId),
    StackPush(NodeId),
    StackPop,
    JumpToRegister(Register),
    Call {
        address: NodeId,
        uses: Vec<Register>,
        defines: Vec<Register>,
    },
    Return {
        uses: Vec<Register>,
    },
    /// Gives the wrapped node a fixed label in the linear program.
    Labeled(Label, NodeId),
    NoOp,
}

impl Node {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::RegisterWrite(_, value)
            | Self::MemoryRead(value)
            | Self::Unary(_, value)
            | Self::StackPush(value)
            | Self::Labeled(_, value) => vec![*value],
            Self::MemoryWrite(left, right) | Self::Binary(_, left, right) => vec![*left, *right],
            Self::Call { address, .. } => vec![*address],
            Self::Const(_)
            | Self::RegisterRead(_)
            | Self::MemoryLabel(_)
            | Self::StackPop
            | Self::JumpToRegister(_)
            | Self::Return { .. }
            | Self::NoOp => vec![],
        }
    }
}

/// Arena owning every tree node of a procedure.
#[derive(Clone, Debug, Default)]
pub struct Nodes {
    nodes: Vec<Node>,
}

impl Nodes {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows labeled wrappers down to the node doing the work.
    pub fn unlabeled(&self, mut id: NodeId) -> NodeId {
        while let Node::Labeled(_, inner) = self.get(id) {
            id = *inner;
        }
        id
    }

    pub fn constant(&mut self, value: i64) -> NodeId {
        self.add(Node::Const(value))
    }

    pub fn read(&mut self, register: Register) -> NodeId {
        self.add(Node::RegisterRead(register))
    }

    pub fn write(&mut self, register: Register, value: NodeId) -> NodeId {
        self.add(Node::RegisterWrite(register, value))
    }

    pub fn load(&mut self, address: NodeId) -> NodeId {
        self.add(Node::MemoryRead(address))
    }

    pub fn store(&mut self, address: NodeId, value: NodeId) -> NodeId {
        self.add(Node::MemoryWrite(address, value))
    }

    pub fn label(&mut self, label: impl Into<Label>) -> NodeId {
        self.add(Node::MemoryLabel(label.into()))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.add(Node::Unary(op, operand))
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.add(Node::Binary(op, left, right))
    }

    pub fn labeled(&mut self, label: impl Into<Label>, node: NodeId) -> NodeId {
        self.add(Node::Labeled(label.into(), node))
    }

    pub fn no_op(&mut self) -> NodeId {
        self.add(Node::NoOp)
    }
}

impl Index<NodeId> for Nodes {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id)
    }
}
