use pretty::{Arena, DocAllocator, DocBuilder};

use crate::ift::{BinaryOp, ControlFlowGraph, Node, NodeId, Nodes, Successors, UnaryOp};
use crate::lir::Item;

pub struct Prettier<'a> {
    nodes: &'a Nodes,
    allocator: Arena<'a>,
    width: usize,
}

impl<'a> Prettier<'a> {
    pub fn new(nodes: &'a Nodes) -> Self {
        Self {
            nodes,
            allocator: Arena::new(),
            width: 80,
        }
    }

    pub fn with_width(self, width: usize) -> Self {
        Self { width, ..self }
    }

    #[must_use]
    pub fn pretty_tree(&'a self, root: NodeId) -> String {
        self.render(self.doc_node(root))
    }

    /// Every root of the graph followed by where control goes next.
    #[must_use]
    pub fn pretty_cfg(&'a self, cfg: &ControlFlowGraph) -> String {
        let doc = self.allocator.intersperse(
            cfg.roots.iter().map(|root| self.doc_root(cfg, *root)),
            self.allocator.hardline(),
        );
        self.render(doc)
    }

    #[must_use]
    pub fn pretty_program(&'a self, program: &[Item]) -> String {
        let doc = self.allocator.intersperse(
            program.iter().map(|item| match item {
                Item::Label(label) => self.allocator.text(format!("{label}:")),
                Item::Instruction(instruction) => {
                    self.allocator.text(format!("    {instruction}"))
                }
            }),
            self.allocator.hardline(),
        );
        self.render(doc)
    }

    fn render(&'a self, doc: DocBuilder<'a, Arena<'a>>) -> String {
        let mut res = String::new();
        match doc.render_fmt(self.width, &mut res) {
            Ok(()) => res,
            Err(_) => unreachable!("rendering into a string does not fail"),
        }
    }

    fn doc_root(&'a self, cfg: &ControlFlowGraph, root: NodeId) -> DocBuilder<'a, Arena<'a>> {
        let marker = if cfg.entry == Some(root) { "entry " } else { "" };
        let edges = match cfg.successors(root) {
            Successors::Terminal => self.allocator.nil(),
            Successors::Unconditional(next) => self
                .allocator
                .line()
                .append(self.allocator.text(format!("-> #{}", next.index()))),
            Successors::Conditional { on_true, on_false } => {
                self.allocator.line().append(self.allocator.text(format!(
                    "? #{} : #{}",
                    on_true.index(),
                    on_false.index()
                )))
            }
        };

        self.allocator
            .text(format!("{marker}#{}", root.index()))
            .append(self.allocator.line().append(self.doc_node(root)).nest(2))
            .append(edges.nest(2))
            .group()
    }

    fn doc_node(&'a self, node: NodeId) -> DocBuilder<'a, Arena<'a>> {
        match self.nodes.get(node) {
            Node::Const(value) => {
                self.doc_form("const", vec![self.allocator.text(value.to_string())])
            }
            Node::RegisterRead(register) => {
                self.doc_form("read", vec![self.allocator.text(register.to_string())])
            }
            Node::RegisterWrite(register, value) => self.doc_form(
                "write",
                vec![
                    self.allocator.text(register.to_string()),
                    self.doc_node(*value),
                ],
            ),
            Node::MemoryRead(address) => self.doc_form("load", vec![self.doc_node(*address)]),
            Node::MemoryWrite(address, value) => self.doc_form(
                "store",
                vec![self.doc_node(*address), self.doc_node(*value)],
            ),
            Node::MemoryLabel(label) => {
                self.doc_form("label", vec![self.allocator.text(label.to_string())])
            }
            Node::Unary(op, operand) => {
                self.doc_form(unary_name(*op), vec![self.doc_node(*operand)])
            }
            Node::Binary(op, left, right) => self.doc_form(
                binary_name(*op),
                vec![self.doc_node(*left), self.doc_node(*right)],
            ),
            Node::StackPush(value) => self.doc_form("push", vec![self.doc_node(*value)]),
            Node::StackPop => self.doc_form("pop", vec![]),
            Node::JumpToRegister(register) => {
                self.doc_form("jump", vec![self.allocator.text(register.to_string())])
            }
            Node::Call { address, .. } => self.doc_form("call", vec![self.doc_node(*address)]),
            Node::Return { .. } => self.doc_form("return", vec![]),
            Node::Labeled(label, inner) => self
                .allocator
                .text(format!("{label}:"))
                .append(self.allocator.space())
                .append(self.doc_node(*inner)),
            Node::NoOp => self.doc_form("nop", vec![]),
        }
    }

    fn doc_form(
        &'a self,
        name: &'static str,
        args: Vec<DocBuilder<'a, Arena<'a>>>,
    ) -> DocBuilder<'a, Arena<'a>> {
        let args = if args.is_empty() {
            self.allocator.nil()
        } else {
            self.allocator
                .line()
                .append(self.allocator.intersperse(args, self.allocator.line()))
                .nest(2)
        };

        self.allocator
            .text("(")
            .append(self.allocator.text(name))
            .append(args)
            .append(self.allocator.text(")"))
            .group()
    }
}

fn unary_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Negation => "neg",
        UnaryOp::LogicalNegation => "not",
        UnaryOp::BitNegation => "bitnot",
    }
}

fn binary_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Subtract => "sub",
        BinaryOp::Multiply => "mul",
        BinaryOp::Divide => "div",
        BinaryOp::Modulo => "mod",
        BinaryOp::BitAnd => "bitand",
        BinaryOp::BitOr => "bitor",
        BinaryOp::BitXor => "bitxor",
        BinaryOp::ShiftLeft => "shl",
        BinaryOp::ShiftRight => "shr",
        BinaryOp::Equals => "eq",
        BinaryOp::NotEquals => "ne",
        BinaryOp::Less => "lt",
        BinaryOp::LessOrEqual => "le",
        BinaryOp::Greater => "gt",
        BinaryOp::GreaterOrEqual => "ge",
        BinaryOp::LogicalAnd => "and",
        BinaryOp::LogicalXor => "xor",
        BinaryOp::LogicalIff => "iff",
    }
}
