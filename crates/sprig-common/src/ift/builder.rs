use std::collections::HashMap;

use super::{ControlFlowGraph, LinkKind, NodeId};

/// Incrementally assembles a [`ControlFlowGraph`] out of trees and smaller graphs.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    entry: Option<NodeId>,
    roots: Vec<NodeId>,
    unconditional: HashMap<NodeId, NodeId>,
    on_true: HashMap<NodeId, NodeId>,
    on_false: HashMap<NodeId, NodeId>,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(entry: NodeId) -> Self {
        let mut builder = Self::new();
        builder.set_entry(entry);
        builder
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Adds `to` as a root and, if `from` is given, the edge leading to it. The first destination
    /// added to an empty builder becomes the entry.
    pub fn add_link(&mut self, from: Option<(NodeId, LinkKind)>, to: NodeId) -> &mut Self {
        self.link(from, to, true);
        self
    }

    /// Links every final root to `to`. Roots still missing one conditional edge receive that edge
    /// regardless of `kind`, unless `kind` asks for the other one.
    pub fn add_links_from_final_roots(&mut self, kind: LinkKind, to: NodeId) -> &mut Self {
        for (root, needed) in self.build().final_roots() {
            let kind = match (needed, kind) {
                (LinkKind::Unconditional, kind) => kind,
                (needed, LinkKind::Unconditional) => needed,
                (needed, kind) if needed == kind => kind,
                (needed, kind) => panic!("root {root:?} needs a {needed:?} link, not {kind:?}"),
            };

            self.link(Some((root, kind)), to, true);
        }

        if self.entry.is_none() {
            self.set_entry(to);
        }

        self
    }

    pub fn add_all_from(&mut self, cfg: &ControlFlowGraph, take_entry: bool) -> &mut Self {
        if self.entry.is_none() && take_entry {
            self.entry = cfg.entry;
        }

        for root in cfg.roots.iter() {
            self.add_root(*root);
        }

        self.unconditional.extend(cfg.unconditional.iter());
        self.on_true.extend(cfg.on_true.iter());
        self.on_false.extend(cfg.on_false.iter());
        self
    }

    /// Continues every final root into the entry of `cfg`.
    pub fn merge_unconditionally(&mut self, cfg: &ControlFlowGraph) -> &mut Self {
        let Some(entry) = cfg.entry else {
            return self;
        };

        for root in self.build().final_roots() {
            self.link(Some(root), entry, false);
        }

        self.add_all_from(cfg, true)
    }

    /// Branches from every final root into `on_true` or `on_false`.
    pub fn merge_conditionally(
        &mut self,
        on_true: &ControlFlowGraph,
        on_false: &ControlFlowGraph,
    ) -> &mut Self {
        let (Some(true_entry), Some(false_entry)) = (on_true.entry, on_false.entry) else {
            panic!("both branches of a conditional need an entry");
        };

        for (root, needed) in self.build().final_roots() {
            assert_eq!(
                LinkKind::Unconditional,
                needed,
                "root {root:?} already branches"
            );

            self.link(Some((root, LinkKind::ConditionalTrue)), true_entry, false);
            self.link(Some((root, LinkKind::ConditionalFalse)), false_entry, false);
        }

        self.add_all_from(on_true, false);
        self.add_all_from(on_false, false)
    }

    pub fn add_single_tree(&mut self, node: NodeId) -> &mut Self {
        let single = ControlFlowGraph {
            roots: vec![node],
            entry: Some(node),
            ..Default::default()
        };

        self.merge_unconditionally(&single)
    }

    pub fn build(&self) -> ControlFlowGraph {
        ControlFlowGraph {
            roots: self.roots.clone(),
            entry: self.entry,
            unconditional: self.unconditional.clone(),
            on_true: self.on_true.clone(),
            on_false: self.on_false.clone(),
        }
    }

    fn set_entry(&mut self, entry: NodeId) {
        assert!(
            self.entry.is_none(),
            "control flow graph already has an entry"
        );
        self.entry = Some(entry);
        self.add_root(entry);
    }

    fn add_root(&mut self, node: NodeId) {
        if !self.roots.contains(&node) {
            self.roots.push(node);
        }
    }

    fn link(&mut self, from: Option<(NodeId, LinkKind)>, to: NodeId, add_destination: bool) {
        if add_destination {
            self.add_root(to);
        }

        if let Some((from, kind)) = from {
            self.add_root(from);

            let links = match kind {
                LinkKind::Unconditional => &mut self.unconditional,
                LinkKind::ConditionalTrue => &mut self.on_true,
                LinkKind::ConditionalFalse => &mut self.on_false,
            };

            links.insert(from, to);
        }

        if self.entry.is_none() && add_destination {
            self.set_entry(to);
        }
    }
}
