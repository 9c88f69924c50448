//! Error types for the merge engine.
//!
//! Both variants are precondition violations: they mean the caller handed
//! the engine a malformed tree, or the engine built an incomplete
//! similarity matrix. Neither occurs in normal operation — a source node
//! that simply finds no match is an expected outcome, not an error, and is
//! reported through [`crate::merge::MergeStats`] instead.
//!
//! A merge is all-or-nothing: the first precondition violation aborts the
//! whole call and the base tree should be considered unusable for that
//! source.

use std::fmt;

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Unified error type for merge operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeError {
    /// A node carries no `name` field under any source's attribute bag.
    ///
    /// The upstream importer is expected to filter such records out before
    /// they ever reach a tree; a nameless node cannot be matched against
    /// anything.
    MissingName {
        /// Display-name path of the offending node.
        path: String,
    },

    /// The similarity matrix has no entry for a name pair it was asked for.
    ///
    /// The matrix is built over every node of both trees, so a miss means
    /// the matrix was constructed from the wrong name indices. This must
    /// surface loudly rather than degrade into a zero score.
    MatrixGap {
        /// The source-tree name of the missing pair.
        source_name: String,
        /// The base-tree name of the missing pair.
        base_name: String,
    },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName { path } => {
                write!(
                    f,
                    "node {path} has no name under any source; \
                     the importer should have dropped it"
                )
            }
            Self::MatrixGap {
                source_name,
                base_name,
            } => {
                write!(
                    f,
                    "similarity matrix has no entry for {source_name:?} x {base_name:?}; \
                     the matrix must cover all nodes of both trees"
                )
            }
        }
    }
}

impl std::error::Error for MergeError {}
