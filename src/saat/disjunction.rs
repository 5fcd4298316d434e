//! SAAT disjunction node: the parent's `(doc, wpos)` is always the minimum
//! over its unexhausted children — `MACdisjrule2` in the original engine.

use crate::error::Result;
use crate::saat::SaatNode;
use crate::types::{DocNum, WordPos};

#[derive(Debug, Clone)]
pub struct DisjunctionNode {
    pub children: Vec<SaatNode>,
    pub curdoc: DocNum,
    pub curwpos: WordPos,
    pub exhausted: bool,
}

impl DisjunctionNode {
    /// `curdoc`/`curwpos` are not meaningful until the first [`skipto`]
    /// call — construction alone cannot decode anything for children whose
    /// postings live in the (not-yet-available) mapped index.
    pub fn new(children: Vec<SaatNode>) -> Self {
        let exhausted = children.iter().all(|c| c.exhausted());
        DisjunctionNode {
            children,
            curdoc: DocNum(0),
            curwpos: 0,
            exhausted,
        }
    }

    /// Recompute `(curdoc, curwpos)` as the minimum over unexhausted
    /// children, matching `MACdisjrule2`.
    fn recompute_min(&mut self) {
        let mut best_doc = DocNum::EXHAUSTED;
        let mut best_wpos = WordPos::MAX;
        for child in &self.children {
            if child.exhausted() {
                continue;
            }
            if child.curdoc() < best_doc || (child.curdoc() == best_doc && child.curwpos() < best_wpos) {
                best_doc = child.curdoc();
                best_wpos = child.curwpos();
            }
        }
        self.curdoc = best_doc;
        self.curwpos = best_wpos;
        self.exhausted = best_doc == DocNum::EXHAUSTED;
    }

    pub fn skipto(&mut self, desired_doc: DocNum, desired_wpos: WordPos, index: &[u8]) -> Result<()> {
        // Each child's own `skipto` is a cheap no-op if it's already at or
        // past the target, so there's no need to pre-filter here — and
        // pre-filtering on `curdoc`/`curwpos` would be wrong for a child
        // that hasn't decoded its first posting yet.
        for child in &mut self.children {
            if !child.exhausted() {
                child.skipto(desired_doc, desired_wpos, index)?;
            }
        }
        self.recompute_min();
        Ok(())
    }

    /// Advance every child currently sitting at `curdoc` past this
    /// document, then recompute the new minimum.
    pub fn advance_within_doc(&mut self, index: &[u8]) -> Result<()> {
        let doc = self.curdoc;
        for child in &mut self.children {
            if !child.exhausted() && child.curdoc() == doc {
                child.skipto(DocNum(doc.0 + 1), 0, index)?;
            }
        }
        self.recompute_min();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::vocab::Payload;
    use crate::saat::leaf::WordLeaf;

    #[test]
    fn adopts_minimum_docnum_across_children() {
        let a = WordLeaf::new("a", 1, 1.0, 1, Payload::Inline { doc: DocNum(9), wpos: 0 });
        let b = WordLeaf::new("b", 1, 1.0, 1, Payload::Inline { doc: DocNum(3), wpos: 0 });
        let mut node = DisjunctionNode::new(vec![SaatNode::Word(a), SaatNode::Word(b)]);
        node.skipto(DocNum(0), 0, &[]).unwrap();
        assert_eq!(node.curdoc, DocNum(3));
    }

    #[test]
    fn exhausted_when_all_children_exhausted() {
        let a = WordLeaf::new("a", 0, 1.0, 1, Payload::Offset(0));
        let node = DisjunctionNode::new(vec![SaatNode::Word(a)]);
        assert!(node.exhausted);
    }
}
