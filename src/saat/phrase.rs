//! SAAT phrase node: verifies word adjacency by anchoring on the rarest
//! child term and probing the others at the expected offset (spec §4.3).

use crate::error::Result;
use crate::saat::leaf::WordLeaf;
use crate::types::{DocNum, WordPos};

#[derive(Debug, Clone)]
pub struct PhraseNode {
    /// Children in phrase order; child `i`'s expected word position is
    /// `anchor_wpos - anchor_offset + i`.
    children: Vec<WordLeaf>,
    anchor_idx: usize,
    pub curdoc: DocNum,
    pub curwpos: WordPos,
    pub exhausted: bool,
}

impl PhraseNode {
    pub fn new(children: Vec<WordLeaf>) -> Self {
        assert!(children.len() >= 2, "a phrase needs at least two words");
        let anchor_idx = children
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.occurrence_count())
            .map(|(i, _)| i)
            .unwrap_or(0);
        let exhausted = children.iter().any(|c| c.occurrence_count() == 0);
        PhraseNode {
            children,
            anchor_idx,
            curdoc: DocNum(0),
            curwpos: 0,
            exhausted,
        }
    }

    fn anchor(&mut self) -> &mut WordLeaf {
        &mut self.children[self.anchor_idx]
    }

    /// The anchor child's occurrence count, used as this phrase's rarity
    /// estimate when the candidate engine orders sibling terms.
    pub fn occurrence_estimate(&self) -> u64 {
        self.children[self.anchor_idx].occurrence_count()
    }

    pub fn children(&self) -> &[WordLeaf] {
        &self.children
    }

    /// Given the anchor sitting on a candidate position, verify all other
    /// children are present at their expected offsets in the same document.
    /// On success, sets `curdoc`/`curwpos` to the phrase's start position.
    /// On failure, advances the anchor past this candidate and retries,
    /// looping until a match is found or the anchor is exhausted.
    fn sync_from_anchor(&mut self, index: &[u8]) -> Result<()> {
        loop {
            if self.anchor().exhausted {
                self.exhausted = true;
                self.curdoc = DocNum::EXHAUSTED;
                return Ok(());
            }
            let anchor_doc = self.anchor().curdoc;
            let anchor_wpos = self.anchor().curwpos;

            let mut all_match = true;
            for i in 0..self.children.len() {
                if i == self.anchor_idx {
                    continue;
                }
                let target = anchor_wpos as i64 - self.anchor_idx as i64 + i as i64;
                if target < 0 {
                    all_match = false;
                    break;
                }
                let target = target as WordPos;
                self.children[i].skipto(anchor_doc, target, index)?;
                let child = &self.children[i];
                if child.curdoc != anchor_doc || child.curwpos != target {
                    all_match = false;
                    break;
                }
            }

            if all_match {
                self.curdoc = anchor_doc;
                self.curwpos = anchor_wpos - self.anchor_idx as WordPos;
                self.exhausted = false;
                return Ok(());
            }

            // Retry at the next candidate: advance the anchor past this
            // word position within the same document.
            self.anchor().skipto(anchor_doc, anchor_wpos + 1, index)?;
        }
    }

    pub fn skipto(&mut self, desired_doc: DocNum, desired_wpos: WordPos, index: &[u8]) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        let anchor_target = desired_wpos + self.anchor_idx as WordPos;
        self.anchor().skipto(desired_doc, anchor_target, index)?;
        self.sync_from_anchor(index)
    }

    /// Advance to the next phrase occurrence, possibly within the same doc.
    pub fn advance_within_doc(&mut self, index: &[u8]) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        let doc = self.curdoc;
        let wpos = self.curwpos;
        self.anchor().skipto(doc, wpos + self.anchor_idx as WordPos + 1, index)?;
        self.sync_from_anchor(index)
    }
}
