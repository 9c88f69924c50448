//! Ancestor-weighted candidate re-scoring.
//!
//! Identical leaf names recur under different branches — two "Office of
//! Policy" units under two agencies. Lineage similarity disambiguates
//! them: each candidate's score is blended with the similarity of
//! successive ancestor pairs, at geometrically diminishing weight, so the
//! nearest parents dominate and remote ancestry barely registers.
//!
//! The climb walks both parent chains in lockstep and stops as soon as
//! either lineage reaches its root; asymmetric tree depths are expected,
//! not an error. It is a bounded loop over two cursors, not recursion —
//! lineage depth never touches the call stack.

use tracing::debug;

use crate::error::MergeError;
use crate::model::name::full_name;
use crate::model::tree::{NodeId, Tree};

use super::candidates::Candidate;
use super::matrix::SimilarityMatrix;

/// Weight applied to the first blended ancestor pair is half of this; each
/// further pair halves it again.
const INITIAL_FACTOR: f64 = 0.5;

/// Blend ancestor-context similarity into each candidate's score, then
/// pick the winner.
///
/// For a candidate pair (source node, base node), the climb starts at the
/// two parents and repeats while both cursors are below their roots:
/// halve the factor, look up the parents' name similarity in the matrix,
/// fold it in as `(score + parent_score × factor) / (1 + factor)`, then
/// step both cursors up. Root candidates (or a root source node) skip
/// blending entirely.
///
/// Returns the candidate with the highest final score; ties go to the
/// earlier-ranked candidate. `None` when `candidates` is empty.
///
/// # Errors
/// - [`MergeError::MissingName`] if an ancestor resolves to no name.
/// - [`MergeError::MatrixGap`] if an ancestor pair is missing from the
///   matrix — a construction defect that must not decay into a zero score.
pub fn refine(
    candidates: &mut [Candidate],
    source: &Tree,
    source_node: NodeId,
    source_label: &str,
    base: &Tree,
    base_label: &str,
    matrix: &SimilarityMatrix,
) -> Result<Option<(NodeId, f64)>, MergeError> {
    for candidate in candidates.iter_mut() {
        if source.is_root(source_node) || base.is_root(candidate.node) {
            // Already at a root; no parents to consult.
            continue;
        }
        let (Some(mut s), Some(mut b)) = (source.parent(source_node), base.parent(candidate.node))
        else {
            continue;
        };
        let mut factor = INITIAL_FACTOR;
        while !source.is_root(s) && !base.is_root(b) {
            factor *= 0.5;
            let source_name = full_name(source, s, source_label)?;
            let base_name = full_name(base, b, base_label)?;
            let parent_score = matrix.lookup(source_name, base_name)?;
            candidate.score = (candidate.score + parent_score * factor) / (1.0 + factor);
            debug!(
                score = candidate.score,
                parent_score,
                factor,
                source = source_name,
                base = base_name,
                "blended ancestor pair"
            );
            let (Some(next_s), Some(next_b)) = (source.parent(s), base.parent(b)) else {
                break;
            };
            s = next_s;
            b = next_b;
        }
    }

    let mut best: Option<&Candidate> = None;
    for candidate in candidates.iter() {
        let better = match best {
            None => true,
            Some(current) => candidate.score > current.score,
        };
        if better {
            best = Some(candidate);
        }
    }
    Ok(best.map(|c| (c.node, c.score)))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use serde_json::json;

    use super::*;
    use crate::merge::candidates;
    use crate::merge::matrix::NameIndex;
    use crate::model::tree::AttrBag;

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

    struct Fixture {
        base: Tree,
        source: Tree,
        matrix: SimilarityMatrix,
        base_index: NameIndex,
    }

    impl Fixture {
        fn new(base: Tree, source: Tree) -> Self {
            let base_index = NameIndex::build(&base, "base").unwrap();
            let source_index = NameIndex::build(&source, "src").unwrap();
            let matrix = SimilarityMatrix::build(&source_index, &base_index);
            Self {
                base,
                source,
                matrix,
                base_index,
            }
        }

        fn refine(&self, source_node: NodeId, name: &str, threshold: f64) -> (NodeId, f64) {
            let mut cands =
                candidates::select(&self.matrix, &self.base_index, name, threshold);
            assert!(!cands.is_empty());
            refine(
                &mut cands,
                &self.source,
                source_node,
                "src",
                &self.base,
                "base",
                &self.matrix,
            )
            .unwrap()
            .unwrap()
        }
    }

    // -- Root handling --

    #[test]
    fn root_candidates_keep_their_score() {
        let base = rooted("base", "United States Government");
        let mut source = rooted("src", "United States Government");
        let source_root = source.root();
        let child = add(&mut source, source_root, "src", "United States Government");
        let fixture = Fixture::new(base, source);

        // Candidate is the base root: no blending, score stays exactly 100.
        let (node, score) = fixture.refine(child, "United States Government", 90.0);
        assert!(fixture.base.is_root(node));
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parents_directly_under_roots_skip_blending() {
        // Both parents exist but are the roots themselves: the climb's loop
        // condition fails immediately, so the leaf score is untouched.
        let mut base = rooted("base", "gov base");
        let base_root = base.root();
        add(&mut base, base_root, "base", "Office of Policy");
        let mut source = rooted("src", "gov source");
        let source_root = source.root();
        let leaf = add(&mut source, source_root, "src", "Office of Policy");
        let fixture = Fixture::new(base, source);

        let (_, score) = fixture.refine(leaf, "Office of Policy", 90.0);
        assert!((score - 100.0).abs() < f64::EPSILON);
    }

    // -- Blend arithmetic --

    #[test]
    fn single_ancestor_pair_blends_at_quarter_factor() {
        // base: root → "Agency Beta" → "Office of Policy"
        // source: root → "Agency Betta" → "Office of Policy"
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        let beta = add(&mut base, base_root, "base", "Agency Beta");
        add(&mut base, beta, "base", "Office of Policy");

        let mut source = rooted("src", "gov");
        let source_root = source.root();
        let betta = add(&mut source, source_root, "src", "Agency Betta");
        let leaf = add(&mut source, betta, "src", "Office of Policy");

        let fixture = Fixture::new(base, source);
        let parent_score = fixture.matrix.lookup("Agency Betta", "Agency Beta").unwrap();
        let expected = (100.0 + parent_score * 0.25) / 1.25;

        let (_, score) = fixture.refine(leaf, "Office of Policy", 90.0);
        assert!((score - expected).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn asymmetric_depths_stop_at_the_shallower_root() {
        // Source lineage is deeper than the base lineage; the climb stops
        // once the base cursor reaches its root, leaving exactly one
        // blended pair.
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        let dept = add(&mut base, base_root, "base", "Department of Energy");
        add(&mut base, dept, "base", "Office of Science");

        let mut source = rooted("src", "gov");
        let source_root = source.root();
        let layer1 = add(&mut source, source_root, "src", "Umbrella Programs");
        let layer2 = add(&mut source, layer1, "src", "Department of Energy");
        let leaf = add(&mut source, layer2, "src", "Office of Science");

        let fixture = Fixture::new(base, source);
        let pair = fixture
            .matrix
            .lookup("Department of Energy", "Department of Energy")
            .unwrap();
        let expected = (100.0 + pair * 0.25) / 1.25;

        let (_, score) = fixture.refine(leaf, "Office of Science", 90.0);
        assert!((score - expected).abs() < 1e-9);
    }

    // -- Disambiguation & ties --

    #[test]
    fn lineage_similarity_disambiguates_duplicate_names() {
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        let alpha = add(&mut base, base_root, "base", "Agency Alpha");
        let under_alpha = add(&mut base, alpha, "base", "Office of Policy");
        let beta = add(&mut base, base_root, "base", "Agency Beta");
        let under_beta = add(&mut base, beta, "base", "Office of Policy");

        let mut source = rooted("src", "gov");
        let source_root = source.root();
        let betta = add(&mut source, source_root, "src", "Agency Betta");
        let leaf = add(&mut source, betta, "src", "Office of Policy");

        let fixture = Fixture::new(base, source);
        let (node, score) = fixture.refine(leaf, "Office of Policy", 90.0);
        assert_eq!(node, under_beta);
        assert_ne!(node, under_alpha);
        assert!(score > 90.0);
    }

    #[test]
    fn equal_final_scores_keep_the_first_ranked_candidate() {
        // Two identically-named base offices under identically-named
        // parents: every blend is identical, so the earlier-ranked (first
        // discovered in level order) candidate wins.
        let mut base = rooted("base", "gov");
        let base_root = base.root();
        let first_parent = add(&mut base, base_root, "base", "Agency Gamma");
        let first_office = add(&mut base, first_parent, "base", "Office of Policy");
        let second_parent = add(&mut base, base_root, "base", "Agency Gamma");
        let _second_office = add(&mut base, second_parent, "base", "Office of Policy");

        let mut source = rooted("src", "gov");
        let source_root = source.root();
        let parent = add(&mut source, source_root, "src", "Agency Gamma");
        let leaf = add(&mut source, parent, "src", "Office of Policy");

        let fixture = Fixture::new(base, source);
        let (node, _) = fixture.refine(leaf, "Office of Policy", 90.0);
        assert_eq!(node, first_office);
    }

    // -- Empty input --

    #[test]
    fn empty_candidate_list_returns_none() {
        let base = rooted("base", "gov");
        let source = rooted("src", "gov");
        let fixture = Fixture::new(base, source);
        let result = refine(
            &mut [],
            &fixture.source,
            fixture.source.root(),
            "src",
            &fixture.base,
            "base",
            &fixture.matrix,
        );
        assert_eq!(result.unwrap(), None);
    }
}
