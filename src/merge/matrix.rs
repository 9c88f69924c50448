//! Name indexing and all-pairs similarity matrix construction.
//!
//! For each tree a [`NameIndex`] maps every resolved full name to the nodes
//! carrying it — duplicates are legitimate and expected (identically-named
//! offices nested under different parents). The [`SimilarityMatrix`] then
//! scores every (base name, source name) pair once, so candidate selection
//! and the ancestor climb are lookups, never re-computation.
//!
//! The matrix is dense: O(distinct base names × distinct source names)
//! cells. That cost is inherent to the fuzzy-matching requirement; there is
//! deliberately no blocking prefilter, which would trade recall for speed.
//!
//! Both indices are built over **all** nodes of their tree, in level order.
//! The ancestor-weighted scorer looks up arbitrary ancestor pairs, so any
//! name missing from the matrix is a construction defect
//! ([`MergeError::MatrixGap`]), not a case to paper over with a zero.

use std::collections::BTreeMap;
use std::collections::HashMap;

use tracing::debug;

use crate::error::MergeError;
use crate::model::name::full_name;
use crate::model::tree::{NodeId, Tree};
use crate::similarity::{indel_ratio, token_sort_key};

// ---------------------------------------------------------------------------
// NameIndex
// ---------------------------------------------------------------------------

/// Resolved full name → nodes carrying that name, for one tree.
///
/// Nodes sharing a name are kept in level-order discovery order; names
/// iterate lexically (`BTreeMap`), so downstream consumers inherit a
/// deterministic order with no extra sorting.
#[derive(Clone, Debug)]
pub struct NameIndex {
    names: BTreeMap<String, Vec<NodeId>>,
}

impl NameIndex {
    /// Index every node of `tree` by its resolved full name under `label`.
    ///
    /// # Errors
    /// Returns [`MergeError::MissingName`] if any node resolves to no name
    /// at all (an importer defect — fail fast rather than index a hole).
    pub fn build(tree: &Tree, label: &str) -> Result<Self, MergeError> {
        let mut names: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for node in tree.level_order() {
            let name = full_name(tree, node, label)?;
            names.entry(name.to_owned()).or_default().push(node);
        }
        Ok(Self { names })
    }

    /// Nodes whose resolved name is exactly `name` (empty if unknown).
    #[must_use]
    pub fn nodes(&self, name: &str) -> &[NodeId] {
        self.names.get(name).map_or(&[], Vec::as_slice)
    }

    /// All distinct names, lexically ordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the index holds no names (an empty tree cannot exist, so
    /// this is only true for a default-constructed index in tests).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SimilarityMatrix
// ---------------------------------------------------------------------------

/// Dense (base name × source name) similarity table, scores in [0, 100].
///
/// Built fresh per merge invocation and scoped to it: once the merge starts
/// mutating the base tree, newly adopted nodes are *not* added to the
/// matrix — exactly the snapshot semantics the orchestrator wants.
#[derive(Clone, Debug)]
pub struct SimilarityMatrix {
    base_names: Vec<String>,
    source_names: Vec<String>,
    base_rows: HashMap<String, usize>,
    source_cols: HashMap<String, usize>,
    /// Row-major: `scores[row × source_names.len() + col]`.
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Score every source name against every base name.
    pub fn build(source: &NameIndex, base: &NameIndex) -> Self {
        let base_names: Vec<String> = base.names().map(str::to_owned).collect();
        let source_names: Vec<String> = source.names().map(str::to_owned).collect();
        debug!(
            base = base_names.len(),
            source = source_names.len(),
            "computing similarity matrix"
        );

        // Normalize + token-sort each distinct name once, not once per pair.
        let base_keys: Vec<String> = base_names.iter().map(|n| token_sort_key(n)).collect();
        let source_keys: Vec<String> = source_names.iter().map(|n| token_sort_key(n)).collect();

        let mut scores = Vec::with_capacity(base_names.len() * source_names.len());
        for base_key in &base_keys {
            for source_key in &source_keys {
                scores.push(indel_ratio(base_key, source_key));
            }
        }

        let base_rows = base_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let source_cols = source_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        Self {
            base_names,
            source_names,
            base_rows,
            source_cols,
            scores,
        }
    }

    /// Score for a (source name, base name) pair, `None` if either name is
    /// not covered by the matrix.
    #[must_use]
    pub fn score(&self, source_name: &str, base_name: &str) -> Option<f64> {
        let row = *self.base_rows.get(base_name)?;
        let col = *self.source_cols.get(source_name)?;
        Some(self.scores[row * self.source_names.len() + col])
    }

    /// Score for a (source name, base name) pair, failing loudly on a miss.
    ///
    /// # Errors
    /// Returns [`MergeError::MatrixGap`] if the pair is not covered — a
    /// matrix-construction defect, since both indices span whole trees.
    pub fn lookup(&self, source_name: &str, base_name: &str) -> Result<f64, MergeError> {
        self.score(source_name, base_name)
            .ok_or_else(|| MergeError::MatrixGap {
                source_name: source_name.to_owned(),
                base_name: base_name.to_owned(),
            })
    }

    /// The column for `source_name`: every base name with its score, in
    /// lexical base-name order. `None` if the source name is unknown.
    pub fn column(&self, source_name: &str) -> Option<impl Iterator<Item = (&str, f64)>> {
        let col = *self.source_cols.get(source_name)?;
        let width = self.source_names.len();
        Some(
            self.base_names
                .iter()
                .enumerate()
                .map(move |(row, name)| (name.as_str(), self.scores[row * width + col])),
        )
    }
}
