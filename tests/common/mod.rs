//! Shared helpers for orgmerge integration tests.
//!
//! Trees are built directly through the model API — no importer is
//! involved — with the convention that a node's display name equals its
//! bag name unless a test says otherwise.

use orgmerge::model::name::full_name;
use orgmerge::model::tree::{AttrBag, NodeId, Tree};
use serde_json::{Value, json};

/// Attribute bag containing only a `name` field.
pub fn bag(name: &str) -> AttrBag {
    let Value::Object(map) = json!({ "name": name }) else {
        unreachable!()
    };
    map
}

/// Create a tree whose root carries a bag under `label`.
pub fn rooted(label: &str, root_name: &str) -> Tree {
    let mut tree = Tree::new(root_name);
    tree.set_source_attrs(tree.root(), label, bag(root_name));
    tree
}

/// Append a child with a `label` bag naming it `name`.
pub fn add(tree: &mut Tree, parent: NodeId, label: &str, name: &str) -> NodeId {
    let id = tree.add_child(parent, name);
    tree.set_source_attrs(id, label, bag(name));
    id
}

/// First node whose resolved full name under `label` equals `name`.
pub fn find(tree: &Tree, label: &str, name: &str) -> Option<NodeId> {
    tree.level_order()
        .into_iter()
        .find(|&id| full_name(tree, id, label) == Ok(name))
}
