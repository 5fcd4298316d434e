//! Suggestion-At-A-Time (SAAT) query evaluation tree (C3): a small tagged
//! enum replaces the original engine's recursive pointer tree, so ownership
//! of postings-list cursors is tracked by the Rust type system instead of
//! manual `free_querytree_memory` bookkeeping (spec §4.3).

pub mod disjunction;
pub mod leaf;
pub mod phrase;

use crate::error::Result;
use crate::types::{DocNum, WordPos};

pub use disjunction::DisjunctionNode;
pub use leaf::WordLeaf;
pub use phrase::PhraseNode;

/// One node of the SAAT tree. Top-level query terms are evaluated as
/// siblings by the candidate engine (C4); this enum only represents a
/// single term/phrase/disjunction's internal shape.
#[derive(Debug, Clone)]
pub enum SaatNode {
    Word(WordLeaf),
    Phrase(PhraseNode),
    Disjunction(DisjunctionNode),
}

impl SaatNode {
    pub fn curdoc(&self) -> DocNum {
        match self {
            SaatNode::Word(w) => w.curdoc,
            SaatNode::Phrase(p) => p.curdoc,
            SaatNode::Disjunction(d) => d.curdoc,
        }
    }

    pub fn curwpos(&self) -> WordPos {
        match self {
            SaatNode::Word(w) => w.curwpos,
            SaatNode::Phrase(p) => p.curwpos,
            SaatNode::Disjunction(d) => d.curwpos,
        }
    }

    pub fn exhausted(&self) -> bool {
        match self {
            SaatNode::Word(w) => w.exhausted,
            SaatNode::Phrase(p) => p.exhausted,
            SaatNode::Disjunction(d) => d.exhausted,
        }
    }

    /// Collect every leaf term string under this node, used by the
    /// ranker's primacy feature ("first doc word equals some query word",
    /// spec §4.5) which has to look past phrases and disjunctions down to
    /// their individual words.
    pub fn collect_leaf_terms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            SaatNode::Word(w) => out.push(&w.term),
            SaatNode::Phrase(p) => out.extend(p.children().iter().map(|c| c.term.as_str())),
            SaatNode::Disjunction(d) => {
                for child in &d.children {
                    child.collect_leaf_terms(out);
                }
            }
        }
    }

    pub fn skipto(&mut self, desired_doc: DocNum, desired_wpos: WordPos, index: &[u8]) -> Result<()> {
        match self {
            SaatNode::Word(w) => w.skipto(desired_doc, desired_wpos, index),
            SaatNode::Phrase(p) => p.skipto(desired_doc, desired_wpos, index),
            SaatNode::Disjunction(d) => d.skipto(desired_doc, desired_wpos, index),
        }
    }

    pub fn advance_within_doc(&mut self, index: &[u8]) -> Result<u32> {
        match self {
            SaatNode::Word(w) => w.advance_within_doc(index),
            SaatNode::Phrase(p) => {
                p.advance_within_doc(index)?;
                Ok(1)
            }
            SaatNode::Disjunction(d) => {
                d.advance_within_doc(index)?;
                Ok(1)
            }
        }
    }

    /// Occurrence count used to choose a pivot/anchor term among siblings
    /// (the rarest term drives relaxed-AND candidate generation, spec §4.4).
    pub fn occurrence_count(&self) -> u64 {
        match self {
            SaatNode::Word(w) => w.occurrence_count(),
            SaatNode::Phrase(p) => p.occurrence_estimate(),
            SaatNode::Disjunction(d) => d.children.iter().map(|c| c.occurrence_count()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::vocab::Payload;

    #[test]
    fn word_node_dispatches_to_leaf_state() {
        let leaf = WordLeaf::new("cat", 1, 1.0, 1, Payload::Inline { doc: DocNum(7), wpos: 0 });
        let mut node = SaatNode::Word(leaf);
        assert!(!node.exhausted());
        node.skipto(DocNum(0), 0, &[]).unwrap();
        assert_eq!(node.curdoc(), DocNum(7));
    }
}
