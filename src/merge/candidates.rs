//! Candidate selection: narrow the matrix column to a short ranked list.
//!
//! Admission uses a relaxed floor of `0.8 × threshold` rather than the
//! threshold itself: a borderline name match under the right parent can
//! still be boosted over the real threshold by the ancestor-weighted
//! scorer, so it must survive this step.
//!
//! Ordering is fully deterministic: score descending, then base name
//! ascending, then truncate to the top [`CANDIDATE_CAP`] names. Each
//! surviving name expands to every base node carrying it (duplicate names
//! are expected), preserving rank order — the scorer breaks final-score
//! ties in favor of the earlier-ranked candidate.

use crate::model::tree::NodeId;

use super::matrix::{NameIndex, SimilarityMatrix};

/// Maximum number of base names admitted per source name.
pub const CANDIDATE_CAP: usize = 5;

/// Fraction of the merge threshold used as the admission floor.
pub const FLOOR_RATIO: f64 = 0.8;

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A base-tree node admitted for scoring, with its running blended score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// The base-tree node.
    pub node: NodeId,
    /// Name-similarity score on admission; mutated in place by the
    /// ancestor-weighted scorer.
    pub score: f64,
}

/// Select candidates for `source_name` from the matrix column.
///
/// Returns an empty list when nothing clears the relaxed floor — the
/// "no match" outcome, not an error. An unknown `source_name` also yields
/// no candidates.
#[must_use]
pub fn select(
    matrix: &SimilarityMatrix,
    base_index: &NameIndex,
    source_name: &str,
    threshold: f64,
) -> Vec<Candidate> {
    let floor = threshold * FLOOR_RATIO;
    let mut ranked: Vec<(&str, f64)> = matrix
        .column(source_name)
        .map(|column| column.filter(|&(_, score)| score > floor).collect())
        .unwrap_or_default();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(CANDIDATE_CAP);

    let mut candidates: Vec<Candidate> = Vec::new();
    for (name, score) in ranked {
        for &node in base_index.nodes(name) {
            // One node has one name, so a repeat should not happen; if it
            // somehow does, keep the higher score.
            if let Some(existing) = candidates.iter_mut().find(|c| c.node == node) {
                if score > existing.score {
                    existing.score = score;
                }
            } else {
                candidates.push(Candidate { node, score });
            }
        }
    }
    candidates
}
