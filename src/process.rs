//! Per-node tree processors, and the name normalizer.
//!
//! Processors run over a freshly imported single-source tree before it is
//! handed to the merge engine. They repair cosmetic damage in the raw
//! records — inconsistent whitespace, SHOUTING CASE, self-referential
//! acronyms — and store the result as a *separate* `normalized_name`
//! field. The matching key (`name`) is never rewritten: matching already
//! normalizes aggressively on its own, and exporters want the cleaned
//! form, not the matcher's lossy one.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::MergeError;
use crate::model::tree::{NodeId, Tree};

/// Words kept lowercase inside a title, except in leading position.
const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "of", "on", "or", "the",
    "to", "v", "v.", "via", "vs", "vs.",
];

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// A per-node pass over one source's tree.
pub trait Processor {
    /// Process a single node.
    ///
    /// # Errors
    /// Implementations surface precondition violations as [`MergeError`].
    fn process_node(&self, tree: &mut Tree, node: NodeId) -> Result<(), MergeError>;

    /// Run the processor over every node in level order.
    ///
    /// # Errors
    /// Propagates the first node failure; the pass is not resumed.
    fn run(&self, tree: &mut Tree) -> Result<(), MergeError> {
        for node in tree.level_order() {
            self.process_node(tree, node)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NameNormalizer
// ---------------------------------------------------------------------------

/// Normalizes raw organization names for one source label.
///
/// `words` is a lowercase dictionary of terms safe to title-case (real
/// words, place names, person names); `acronyms` is a lowercase set of
/// known acronyms, which are subtracted from the dictionary so that "NASA"
/// is never rewritten as "Nasa". Loading those sets from wherever they
/// live is the driver's business.
pub struct NameNormalizer {
    source: String,
    words: BTreeSet<String>,
}

impl NameNormalizer {
    /// Build a normalizer for `source`.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        words: BTreeSet<String>,
        acronyms: &BTreeSet<String>,
    ) -> Self {
        let words = words
            .into_iter()
            .filter(|w| !acronyms.contains(w))
            .collect();
        Self {
            source: source.into(),
            words,
        }
    }

    /// Normalize one raw name.
    #[must_use]
    pub fn normalize(&self, name: &str) -> String {
        let spaced = fix_whitespace(name);
        let mut tokens: Vec<String> = spaced.split_whitespace().map(str::to_owned).collect();
        self.fix_capitalization(&mut tokens);
        fix_embedded_acronyms(&mut tokens);
        tokens.join(" ")
    }

    /// Title-case dictionary words and lowercase small words (except in
    /// leading position).
    fn fix_capitalization(&self, tokens: &mut [String]) {
        for (i, token) in tokens.iter_mut().enumerate() {
            let lower = token.to_lowercase();
            if self.words.contains(&lower) {
                *token = title_case(token);
            }
            if i > 0 && SMALL_WORDS.contains(&lower.as_str()) {
                *token = lower;
            }
        }
    }
}

impl Processor for NameNormalizer {
    fn process_node(&self, tree: &mut Tree, node: NodeId) -> Result<(), MergeError> {
        let Some(bag) = tree.source_attrs(node, &self.source) else {
            // Nodes contributed by other sources have nothing to normalize.
            return Ok(());
        };
        let Some(raw) = bag.get("name").and_then(Value::as_str) else {
            return Err(MergeError::MissingName {
                path: tree.path(node),
            });
        };
        let normalized = self.normalize(raw);
        if normalized != raw {
            debug!(from = raw, to = %normalized, "updated name");
        }
        let mut bag = bag.clone();
        bag.insert("normalized_name".to_owned(), Value::String(normalized));
        tree.set_source_attrs(node, self.source.clone(), bag);
        Ok(())
    }
}

/// Space out dashes and slashes, then collapse duplicate, leading, and
/// trailing whitespace: `" Dept -of/Education "` → `"Dept - of / Education"`.
fn fix_whitespace(name: &str) -> String {
    let spaced = name.replace('-', " - ").replace('/', " / ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_case(token: &str) -> String {
    let mut chars = token.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
    })
}

/// Delete an acronym at either end of a name that spells out the name's
/// own initials: `"OPM Office of Personnel Management"` drops the leading
/// `"OPM"`, and the trailing form drops a trailing one.
fn fix_embedded_acronyms(tokens: &mut Vec<String>) {
    let mut initials = String::new();
    let mut first: Option<(usize, String)> = None;
    let mut last: Option<(usize, String)> = None;
    for (i, token) in tokens.iter().enumerate() {
        let leading_caps = token
            .chars()
            .take_while(|c| c.is_ascii_uppercase())
            .count();
        if leading_caps >= 2 {
            if first.is_none() {
                first = Some((i, token.clone()));
            }
            last = Some((i, token.clone()));
        }
        if let Some(c) = token.chars().next()
            && c.is_uppercase()
        {
            initials.push(c);
        }
    }
    let count = initials.chars().count();
    if count <= 1 {
        return;
    }
    let without_first: String = initials.chars().skip(1).collect();
    let without_last: String = initials.chars().take(count - 1).collect();

    let mut remove = Vec::new();
    if let Some((i, token)) = first
        && token == without_first
    {
        remove.push(i);
    }
    if let Some((i, token)) = last
        && token == without_last
        && !remove.contains(&i)
    {
        remove.push(i);
    }
    remove.sort_unstable();
    for i in remove.into_iter().rev() {
        tokens.remove(i);
    }
}
