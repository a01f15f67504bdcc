use std::collections::HashMap;

use sprig_common::ift::{BinaryOp, Node, NodeId, Nodes, UnaryOp};
use sprig_common::lir::Label;
use sprig_common::Register;

/// A non-tree value captured while matching.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Argument {
    Constant(i64),
    Register(Register),
    Label(Label),
    Registers(Vec<Register>),
    /// Which alternative of a named choice matched.
    Choice(&'static str),
}

pub trait Bindable: Clone + PartialEq {
    fn into_argument(self) -> Argument;
}

impl Bindable for i64 {
    fn into_argument(self) -> Argument {
        Argument::Constant(self)
    }
}

impl Bindable for Register {
    fn into_argument(self) -> Argument {
        Argument::Register(self)
    }
}

impl Bindable for Label {
    fn into_argument(self) -> Argument {
        Argument::Label(self)
    }
}

impl Bindable for Vec<Register> {
    fn into_argument(self) -> Argument {
        Argument::Registers(self)
    }
}

/// Arguments bound by name during a match. The typed getters panic when the name is unbound or
/// bound to another kind of value, since that means the pattern and its emitter disagree.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bindings {
    values: HashMap<&'static str, Argument>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &'static str, argument: Argument) {
        self.values.insert(name, argument);
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.values.get(name)
    }

    pub fn constant(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(Argument::Constant(value)) => *value,
            other => panic!("expected a constant bound to `{name}`, found {other:?}"),
        }
    }

    pub fn register(&self, name: &str) -> Register {
        match self.get(name) {
            Some(Argument::Register(register)) => *register,
            other => panic!("expected a register bound to `{name}`, found {other:?}"),
        }
    }

    pub fn label(&self, name: &str) -> Label {
        match self.get(name) {
            Some(Argument::Label(label)) => label.clone(),
            other => panic!("expected a label bound to `{name}`, found {other:?}"),
        }
    }

    pub fn registers(&self, name: &str) -> Vec<Register> {
        match self.get(name) {
            Some(Argument::Registers(registers)) => registers.clone(),
            other => panic!("expected registers bound to `{name}`, found {other:?}"),
        }
    }

    pub fn choice(&self, name: &str) -> &'static str {
        match self.get(name) {
            Some(Argument::Choice(choice)) => choice,
            other => panic!("expected a choice bound to `{name}`, found {other:?}"),
        }
    }

    fn extend(&mut self, other: Bindings) {
        self.values.extend(other.values);
    }
}

/// Matches a leaf argument of a node, optionally binding it under a name.
#[derive(Clone)]
pub enum ArgumentPattern<T> {
    Any(Option<&'static str>),
    In(Vec<T>, Option<&'static str>),
    Where(fn(&T) -> bool, Option<&'static str>),
}

impl<T: Bindable> ArgumentPattern<T> {
    pub fn any() -> Self {
        Self::Any(None)
    }

    pub fn named(name: &'static str) -> Self {
        Self::Any(Some(name))
    }

    fn matches(&self, value: &T, bindings: &mut Bindings) -> bool {
        let (matches, name) = match self {
            Self::Any(name) => (true, name),
            Self::In(values, name) => (values.contains(value), name),
            Self::Where(predicate, name) => (predicate(value), name),
        };

        if let (true, Some(name)) = (matches, name) {
            bindings.bind(*name, value.clone().into_argument());
        }

        matches
    }
}

/// The shape of an IFT subtree. Every [`IftPattern::AnyNode`] leaf becomes a subtree that has to
/// be covered separately, as a value.
#[derive(Clone)]
pub enum IftPattern {
    AnyNode,
    /// The first alternative that matches.
    FirstOf(Vec<IftPattern>),
    /// Like `FirstOf`, also binding the key of the alternative under the name.
    FirstOfNamed(&'static str, Vec<(&'static str, IftPattern)>),

    Const(ArgumentPattern<i64>),
    RegisterRead(ArgumentPattern<Register>),
    RegisterWrite(ArgumentPattern<Register>, Box<IftPattern>),
    MemoryRead(Box<IftPattern>),
    MemoryWrite(Box<IftPattern>, Box<IftPattern>),
    MemoryLabel(ArgumentPattern<Label>),
    Unary(UnaryOp, Box<IftPattern>),
    Binary(BinaryOp, Box<IftPattern>, Box<IftPattern>),
    StackPush(Box<IftPattern>),
    StackPop,
    JumpToRegister(ArgumentPattern<Register>),
    Call(
        Box<IftPattern>,
        ArgumentPattern<Vec<Register>>,
        ArgumentPattern<Vec<Register>>,
    ),
    Return(ArgumentPattern<Vec<Register>>),
}

/// The parts of a matched tree that the pattern did not consume.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MatchResult {
    pub subtrees: Vec<NodeId>,
    pub bindings: Bindings,
}

impl MatchResult {
    fn extend(&mut self, other: MatchResult) {
        self.subtrees.extend(other.subtrees);
        self.bindings.extend(other.bindings);
    }
}

impl IftPattern {
    pub fn unary(op: UnaryOp, operand: IftPattern) -> Self {
        Self::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, left: IftPattern, right: IftPattern) -> Self {
        Self::Binary(op, Box::new(left), Box::new(right))
    }

    /// A binary operation on two arbitrary subtrees.
    pub fn operation(op: BinaryOp) -> Self {
        Self::binary(op, Self::AnyNode, Self::AnyNode)
    }

    pub fn load(address: IftPattern) -> Self {
        Self::MemoryRead(Box::new(address))
    }

    pub fn store(address: IftPattern, value: IftPattern) -> Self {
        Self::MemoryWrite(Box::new(address), Box::new(value))
    }

    pub fn write(register: ArgumentPattern<Register>, value: IftPattern) -> Self {
        Self::RegisterWrite(register, Box::new(value))
    }

    pub fn push(value: IftPattern) -> Self {
        Self::StackPush(Box::new(value))
    }

    pub fn try_match(&self, nodes: &Nodes, node: NodeId) -> Option<MatchResult> {
        let mut result = MatchResult::default();
        self.match_into(nodes, node, &mut result).then_some(result)
    }

    fn match_into(&self, nodes: &Nodes, node: NodeId, result: &mut MatchResult) -> bool {
        match (self, nodes.get(node)) {
            (Self::AnyNode, _) => {
                result.subtrees.push(node);
                true
            }

            (Self::FirstOf(alternatives), _) => {
                match alternatives.iter().find_map(|alt| alt.try_match(nodes, node)) {
                    Some(inner) => {
                        result.extend(inner);
                        true
                    }
                    None => false,
                }
            }

            (Self::FirstOfNamed(name, alternatives), _) => {
                let found = alternatives
                    .iter()
                    .find_map(|(key, alt)| alt.try_match(nodes, node).map(|inner| (*key, inner)));

                match found {
                    Some((key, inner)) => {
                        result.extend(inner);
                        result.bindings.bind(*name, Argument::Choice(key));
                        true
                    }
                    None => false,
                }
            }

            (Self::Const(pattern), Node::Const(value)) => {
                pattern.matches(value, &mut result.bindings)
            }

            (Self::RegisterRead(pattern), Node::RegisterRead(register)) => {
                pattern.matches(register, &mut result.bindings)
            }

            (Self::RegisterWrite(pattern, value), Node::RegisterWrite(register, node)) => {
                pattern.matches(register, &mut result.bindings)
                    && value.match_into(nodes, *node, result)
            }

            (Self::MemoryRead(address), Node::MemoryRead(node)) => {
                address.match_into(nodes, *node, result)
            }

            (Self::MemoryWrite(address, value), Node::MemoryWrite(at, node)) => {
                address.match_into(nodes, *at, result) && value.match_into(nodes, *node, result)
            }

            (Self::MemoryLabel(pattern), Node::MemoryLabel(label)) => {
                pattern.matches(label, &mut result.bindings)
            }

            (Self::Unary(op, operand), Node::Unary(actual, node)) => {
                op == actual && operand.match_into(nodes, *node, result)
            }

            (Self::Binary(op, left, right), Node::Binary(actual, l, r)) => {
                op == actual
                    && left.match_into(nodes, *l, result)
                    && right.match_into(nodes, *r, result)
            }

            (Self::StackPush(value), Node::StackPush(node)) => {
                value.match_into(nodes, *node, result)
            }

            (Self::StackPop, Node::StackPop) => true,

            (Self::JumpToRegister(pattern), Node::JumpToRegister(register)) => {
                pattern.matches(register, &mut result.bindings)
            }

            (
                Self::Call(address, uses, defines),
                Node::Call {
                    address: node,
                    uses: used,
                    defines: defined,
                },
            ) => {
                address.match_into(nodes, *node, result)
                    && uses.matches(used, &mut result.bindings)
                    && defines.matches(defined, &mut result.bindings)
            }

            (Self::Return(uses), Node::Return { uses: used }) => {
                uses.matches(used, &mut result.bindings)
            }

            _ => false,
        }
    }
}
