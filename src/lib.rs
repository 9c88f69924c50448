//! orgmerge — reconcile independently-sourced organizational hierarchies.
//!
//! Each source dataset yields a tree of named entities with its own
//! attribute records. [`merge::merge`] folds a source tree into a growing
//! base tree by fuzzy-matching node names, using ancestor-context
//! similarity to disambiguate repeated names, and splicing matched
//! subtrees in place.
//!
//! The engine consumes already-built trees and mutates the base tree;
//! acquiring raw records, building trees from flat record lists, and
//! serializing results are collaborators outside this crate. The expected
//! driver loop is sequential: build the base tree, then merge sources into
//! it one at a time, each merge seeing everything the previous ones added.

pub mod error;
pub mod merge;
pub mod model;
pub mod process;
pub mod similarity;
pub mod telemetry;
