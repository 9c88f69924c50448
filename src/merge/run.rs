//! Merge orchestration: drive the match pipeline and splice the trees.
//!
//! [`merge`] reconciles one source tree into the base tree:
//!
//! 1. Build both name indices and the similarity matrix once, over every
//!    node of both trees.
//! 2. Walk source nodes in reversed level order — deepest first. By the
//!    time an ancestor is evaluated, any child that found its own match
//!    has already been absorbed and detached, so the ancestor's bulk
//!    child-transfer moves only the children that remain.
//! 3. Per node: select candidates, refine with ancestor context, and apply
//!    the threshold decision.
//!
//! A node that clears the threshold is consumed: its attribute bag for the
//! source label replaces the selection's bag under that label (whole-bag
//! replace, never a field-level union), its remaining children are
//! transferred onto the selection, and the node is detached from its
//! source-tree parent. Skipped nodes stay in the source tree untouched,
//! together with whatever children are still attached — unmatched branches
//! are never grafted onto the base and are discarded with the source tree.
//!
//! Every per-node decision is local: one node's "no match" never affects
//! another's. The only failures are precondition violations
//! ([`crate::error::MergeError`]), which abort the whole call.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::MergeError;
use crate::model::name::full_name;
use crate::model::tree::Tree;

use super::candidates;
use super::matrix::{NameIndex, SimilarityMatrix};
use super::score;

/// Default accept/reject cutoff on the 0–100 score scale.
pub const DEFAULT_THRESHOLD: f64 = 90.0;

// ---------------------------------------------------------------------------
// MergeStats
// ---------------------------------------------------------------------------

/// Per-call accounting of terminal node states.
///
/// Every source node lands in exactly one bucket; there is no retry or
/// backtracking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Attributes absorbed, children relocated, node detached.
    pub merged: usize,
    /// Candidates existed but none cleared the threshold.
    pub skipped_low_score: usize,
    /// Nothing cleared the relaxed candidate floor.
    pub skipped_no_candidates: usize,
}

impl MergeStats {
    /// Total number of source nodes processed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.merged + self.skipped_low_score + self.skipped_no_candidates
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Merge `source` into `base`, mutating `base` in place.
///
/// `threshold` is the accept cutoff on the 0–100 scale; candidate
/// admission uses the relaxed floor `0.8 × threshold`. The source tree is
/// cannibalized — matched nodes are consumed and their subtrees moved —
/// and should be discarded afterwards.
///
/// Successive calls fold any number of sources into one base; later
/// merges see the nodes (and fallback names) earlier merges added.
///
/// # Errors
/// Returns a [`MergeError`] on precondition violations: a node with no
/// name under any source, or a similarity-matrix coverage gap. The base
/// tree may have absorbed part of the source when that happens; treat the
/// call as all-or-nothing and the base as tainted on error.
pub fn merge(
    base: &mut Tree,
    base_label: &str,
    source: &mut Tree,
    source_label: &str,
    threshold: f64,
) -> Result<MergeStats, MergeError> {
    let source_index = NameIndex::build(source, source_label)?;
    let base_index = NameIndex::build(base, base_label)?;
    info!(
        source = source_label,
        base = base_label,
        "calculating string similarity against the base tree"
    );
    let matrix = SimilarityMatrix::build(&source_index, &base_index);

    // Deepest nodes first: children settle before their ancestors move
    // whatever is left.
    let mut order = source.level_order();
    order.reverse();

    info!(source = source_label, "checking for matches against the base tree");
    let mut stats = MergeStats::default();
    for node in order {
        let name = full_name(source, node, source_label)?.to_owned();
        let mut cands = candidates::select(&matrix, &base_index, &name, threshold);
        if cands.is_empty() {
            debug!(name = %name, "no candidates");
            stats.skipped_no_candidates += 1;
            continue;
        }
        debug!(count = cands.len(), name = %name, "checking candidates");

        let Some((selection, best)) = score::refine(
            &mut cands,
            source,
            node,
            source_label,
            base,
            base_label,
            &matrix,
        )?
        else {
            stats.skipped_no_candidates += 1;
            continue;
        };

        if best > threshold {
            info!(
                "{best:.1}: selected candidate {} for {}",
                base.path(selection),
                source.path(node)
            );
            if let Some(bag) = source.source_attrs(node, source_label).cloned() {
                base.set_source_attrs(selection, source_label, bag);
            }
            let children = source.children(node).to_vec();
            for child in children {
                debug!(child = %source.path(child), "merging child");
                base.adopt_from(source, child, selection);
            }
            source.detach(node);
            stats.merged += 1;
        } else {
            debug!(
                "{best:.1}: skipped candidate {} for {}",
                base.path(selection),
                source.path(node)
            );
            stats.skipped_low_score += 1;
        }
    }

    info!(
        merged = stats.merged,
        skipped_low_score = stats.skipped_low_score,
        skipped_no_candidates = stats.skipped_no_candidates,
        "merge complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;

    use super::*;
    use crate::model::tree::{AttrBag, NodeId};

    fn bag(name: &str) -> AttrBag {
        let Value::Object(map) = json!({ "name": name }) else {
            unreachable!()
        };
        map
    }

    fn add(tree: &mut Tree, parent: NodeId, label: &str, name: &str) -> NodeId {
        let id = tree.add_child(parent, name);
        tree.set_source_attrs(id, label, bag(name));
        id
    }

    fn rooted(label: &str, root_name: &str) -> Tree {
        let mut tree = Tree::new(root_name);
        tree.set_source_attrs(tree.root(), label, bag(root_name));
        tree
    }

    #[test]
    fn stats_buckets_are_exhaustive() {
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        add(&mut base, base_root, "base", "Department of Defense");

        let mut source = rooted("src", "gov");
        let source_root = source.root();
        add(&mut source, source_root, "src", "Department of Defense");
        add(&mut source, source_root, "src", "Zzqx Unrelated Entity 42");

        let stats = merge(&mut base, "base", &mut source, "src", 90.0).unwrap();
        assert_eq!(stats.merged, 2); // root + DoD
        assert_eq!(stats.skipped_no_candidates, 1);
        assert_eq!(stats.skipped_low_score, 0);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn nameless_node_aborts_the_call() {
        let mut base = rooted("base", "gov");
        let mut source = rooted("src", "gov");
        source.add_child(source.root(), "nameless");
        let err = merge(&mut base, "base", &mut source, "src", 90.0).unwrap_err();
        assert!(matches!(err, MergeError::MissingName { .. }));
    }

    #[test]
    fn low_score_candidates_are_counted_not_merged() {
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        add(&mut base, base_root, "base", "Office of Policy Planning");

        let mut source = rooted("src", "xyz unrelated root");
        let source_root = source.root();
        // Close enough for the relaxed floor, not for the threshold.
        add(&mut source, source_root, "src", "Office of Policy");

        let stats = merge(&mut base, "base", &mut source, "src", 90.0).unwrap();
        assert_eq!(stats.merged, 0);
        assert_eq!(stats.skipped_low_score, 1);
        assert_eq!(stats.skipped_no_candidates, 1); // the source root
        // Base gained nothing.
        assert_eq!(base.level_order().len(), 2);
    }
}
