//! Fuzzy-matching tree merge engine.
//!
//! Implements the match-and-splice pipeline: index names, score all pairs
//! once, then per source node select → refine → decide. Each phase is a
//! separate module.
//!
//! - **matrix**: per-tree name indices and the dense all-pairs similarity
//!   table.
//! - **candidates**: narrow one matrix column to a short ranked list above
//!   the relaxed floor.
//! - **score**: blend ancestor-context similarity into each candidate to
//!   disambiguate repeated names.
//! - **run**: traversal order, threshold decision, attribute merge, and
//!   subtree reparenting.
//!
//! # Determinism guarantee
//!
//! The same two trees and threshold always produce the same merged tree:
//! name indices iterate lexically, candidate ranking has a total order
//! (score, then base name, then admission rank), and traversal is reversed
//! level order. Nothing depends on hash-map iteration.

pub mod candidates;
pub mod matrix;
pub mod run;
pub mod score;

pub use run::{DEFAULT_THRESHOLD, MergeStats, merge};
