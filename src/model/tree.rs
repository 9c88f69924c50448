//! Ordered arena tree with per-source attribute bags.
//!
//! Each tree holds one organizational hierarchy. Nodes are stored in an
//! arena and addressed by [`NodeId`]; parent links are indices rather than
//! shared references, so reparenting is an O(1) index splice instead of a
//! pointer-graph rewrite.
//!
//! A node carries:
//!
//! - a mandatory display `name`,
//! - an ordered map from source label → attribute bag (the same office can
//!   accumulate bags from several datasets as merges progress),
//! - an ordered child list, owned by the node.
//!
//! # Invariants
//!
//! - Exactly one root per tree; the root is never detached.
//! - No cycles: [`Tree::reparent`] refuses to make a node an ancestor of
//!   itself.
//! - Every attached non-root node appears in exactly one parent's child
//!   list.
//!
//! Attribute bags are [`serde_json::Map`]s: sources contribute arbitrarily
//! shaped records (scalars, lists, nested maps) with no schema shared
//! between them.
//!
//! `NodeId`s are only meaningful for the tree that issued them. Nodes moved
//! across trees with [`Tree::adopt_from`] receive fresh ids in the adopting
//! tree; the donor keeps an empty husk so its remaining ids stay stable.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use serde_json::Map;
use serde_json::Value;

/// One source's attribute bag: an arbitrary JSON object.
pub type AttrBag = Map<String, Value>;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Index of a node within its [`Tree`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// NodeData
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
struct NodeData {
    /// Display name (not the matching key — see `model::name`).
    name: String,
    /// Attribute bags keyed by source label, in lexical label order.
    sources: BTreeMap<String, AttrBag>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A single rooted hierarchy.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Create a tree containing only a root node with the given display name.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = NodeData {
            name: root_name.into(),
            ..NodeData::default()
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Append a new child under `parent` and return its id.
    ///
    /// # Panics
    /// Panics if `parent` is not a node of this tree.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        assert!(parent.index() < self.nodes.len(), "unknown parent node");
        let id = NodeId(u32::try_from(self.nodes.len()).expect("arena overflow"));
        self.nodes.push(NodeData {
            name: name.into(),
            parent: Some(parent),
            ..NodeData::default()
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Display name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    /// Parent of a node, `None` for the root (and for detached nodes).
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Ordered children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Whether `id` is the tree root.
    #[must_use]
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// All attribute bags on a node, keyed by source label in lexical order.
    #[must_use]
    pub fn sources(&self, id: NodeId) -> &BTreeMap<String, AttrBag> {
        &self.nodes[id.index()].sources
    }

    /// The attribute bag contributed by `label`, if any.
    #[must_use]
    pub fn source_attrs(&self, id: NodeId, label: &str) -> Option<&AttrBag> {
        self.nodes[id.index()].sources.get(label)
    }

    /// Set the attribute bag for `label`, replacing any existing bag under
    /// that label wholesale. There is no field-level union.
    pub fn set_source_attrs(&mut self, id: NodeId, label: impl Into<String>, bag: AttrBag) {
        self.nodes[id.index()].sources.insert(label.into(), bag);
    }

    /// Slash-separated path of display names from the root, for diagnostics.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        let mut names = vec![self.name(id)];
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            names.push(self.name(parent));
            cursor = parent;
        }
        names.reverse();
        let mut out = String::new();
        for name in names {
            out.push('/');
            out.push_str(name);
        }
        out
    }

    /// Node ids in breadth-first order starting at the root.
    ///
    /// Children are visited in their stored order, so the result is
    /// deterministic for a given tree shape.
    #[must_use]
    pub fn level_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        out
    }

    /// Remove `id` from its parent's child list, leaving it (and its
    /// subtree) detached. No-op for the root and for already-detached nodes.
    ///
    /// Sibling order of the remaining children is preserved.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        let siblings = &mut self.nodes[parent.index()].children;
        if let Some(pos) = siblings.iter().position(|&c| c == id) {
            siblings.remove(pos);
        }
    }

    /// Move `child` (and its subtree) under `new_parent` within this tree.
    ///
    /// The child is removed from its old parent's ordered child list and
    /// appended to the new parent's; its back-reference is updated.
    ///
    /// # Panics
    /// Panics if the move would create a cycle, i.e. if `new_parent` is
    /// `child` itself or lies inside `child`'s subtree.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        assert!(
            !self.is_within(new_parent, child),
            "reparenting {} under {} would create a cycle",
            self.path(child),
            self.path(new_parent),
        );
        self.detach(child);
        self.nodes[child.index()].parent = Some(new_parent);
        self.nodes[new_parent.index()].children.push(child);
    }

    /// Whether `id` lies within the subtree rooted at `ancestor`
    /// (inclusive).
    fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Transfer the subtree rooted at `node` out of `donor` and append it
    /// under `new_parent` in this tree. Returns the subtree root's id in
    /// this tree.
    ///
    /// Ownership moves wholesale: names and attribute bags are taken from
    /// the donor (which keeps empty husks so its other ids stay valid), and
    /// child order is preserved throughout the subtree.
    ///
    /// # Panics
    /// Panics if `node` is the donor's root.
    pub fn adopt_from(&mut self, donor: &mut Self, node: NodeId, new_parent: NodeId) -> NodeId {
        assert!(!donor.is_root(node), "cannot adopt a tree's root node");
        donor.detach(node);
        let adopted = self.graft(donor, node, new_parent);
        self.nodes[new_parent.index()].children.push(adopted);
        adopted
    }

    fn graft(&mut self, donor: &mut Self, node: NodeId, parent: NodeId) -> NodeId {
        let husk = &mut donor.nodes[node.index()];
        let name = std::mem::take(&mut husk.name);
        let sources = std::mem::take(&mut husk.sources);
        let children = std::mem::take(&mut husk.children);
        husk.parent = None;

        let id = NodeId(u32::try_from(self.nodes.len()).expect("arena overflow"));
        self.nodes.push(NodeData {
            name,
            sources,
            parent: Some(parent),
            children: Vec::with_capacity(children.len()),
        });
        for child in children {
            let grafted = self.graft(donor, child, id);
            self.nodes[id.index()].children.push(grafted);
        }
        id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
