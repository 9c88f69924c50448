//! Best-name resolution for a node under a given source label.
//!
//! Matching keys come from attribute bags, not from the display name: the
//! display name may carry importer decorations (source prefixes, record
//! ids) that would poison similarity scoring.

use serde_json::Value;

use crate::error::MergeError;

use super::tree::{AttrBag, NodeId, Tree};

/// Resolve the best full name for `node` under `label`.
///
/// Prefers the `name` field of the bag contributed by `label`; if that
/// source is absent (or its `name` is not a string), falls back to the
/// first bag in lexical label order that carries one. Lexical order makes
/// the fallback deterministic when a node has accumulated bags from
/// several merges.
///
/// # Errors
/// Returns [`MergeError::MissingName`] if no bag on the node has a string
/// `name` — such a node should never have been imported.
pub fn full_name<'t>(tree: &'t Tree, node: NodeId, label: &str) -> Result<&'t str, MergeError> {
    if let Some(bag) = tree.source_attrs(node, label)
        && let Some(name) = bag_name(bag)
    {
        return Ok(name);
    }
    for bag in tree.sources(node).values() {
        if let Some(name) = bag_name(bag) {
            return Ok(name);
        }
    }
    Err(MergeError::MissingName {
        path: tree.path(node),
    })
}

fn bag_name(bag: &AttrBag) -> Option<&str> {
    bag.get("name").and_then(Value::as_str)
}
