//! SAAT word leaf: iterates one term's postings list in document order,
//! exploiting skip blocks to jump whole runs without decoding every
//! posting (spec §4.3, "O(√N) seeks via periodic skip blocks").

use crate::error::Result;
use crate::index::inverted::{decode_posting, try_read_skip_block, Posting};
use crate::index::vocab::Payload;
use crate::types::{DocNum, WordPos};

#[derive(Debug, Clone)]
pub struct WordLeaf {
    pub term: String,
    payload: Payload,
    occurrence_count: u64,
    pub qidf: f64,
    /// How many times this word appears at top level in the query — used
    /// by the ranker's term-frequency feature, not by iteration itself.
    pub repetition_count: u32,

    pos: usize,
    posting_num: u64,
    pub curdoc: DocNum,
    pub curwpos: WordPos,
    pub exhausted: bool,
    /// Occurrences of this term seen within the current document so far
    /// (filled in by [`WordLeaf::term_frequency_in_current_doc`]).
    pub tf: u32,
}

impl WordLeaf {
    pub fn new(term: impl Into<String>, occurrence_count: u64, qidf: f64, repetition_count: u32, payload: Payload) -> Self {
        WordLeaf {
            term: term.into(),
            payload,
            occurrence_count,
            qidf,
            repetition_count,
            pos: 0,
            posting_num: 0,
            curdoc: DocNum(0),
            curwpos: 0,
            exhausted: occurrence_count == 0,
            tf: 0,
        }
    }

    pub fn occurrence_count(&self) -> u64 {
        self.occurrence_count
    }

    fn decode_next(&mut self, index: &[u8]) -> Result<Option<Posting>> {
        if self.exhausted {
            return Ok(None);
        }
        if self.posting_num >= self.occurrence_count {
            self.exhausted = true;
            self.curdoc = DocNum::EXHAUSTED;
            return Ok(None);
        }

        let posting = match self.payload {
            Payload::Inline { doc, wpos } => {
                debug_assert_eq!(self.occurrence_count, 1);
                Posting { doc, wpos }
            }
            Payload::Offset(offset) => {
                if self.posting_num == 0 {
                    self.pos = offset as usize;
                }
                while let Some((_block, new_pos)) = try_read_skip_block(index, self.pos)? {
                    self.pos = new_pos;
                }
                let prev_doc = if self.posting_num == 0 { 0 } else { self.curdoc.0 };
                let (posting, new_pos) = decode_posting(index, self.pos, prev_doc)?;
                self.pos = new_pos;
                posting
            }
        };

        self.posting_num += 1;
        self.curdoc = posting.doc;
        self.curwpos = posting.wpos as WordPos;
        if self.posting_num >= self.occurrence_count {
            // One more call will report exhausted, but the current posting
            // is still valid and must be returned.
        }
        Ok(Some(posting))
    }

    /// Advance to the first posting at or past `(desired_doc, desired_wpos)`,
    /// using skip blocks to bypass whole runs that end before `desired_doc`.
    pub fn skipto(&mut self, desired_doc: DocNum, desired_wpos: WordPos, index: &[u8]) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        if self.posting_num == 0 {
            self.decode_next(index)?;
            if self.exhausted {
                return Ok(());
            }
        }

        loop {
            let wpos_satisfied = desired_wpos == crate::types::DONT_CARE || self.curwpos >= desired_wpos;
            if self.curdoc > desired_doc || (self.curdoc == desired_doc && wpos_satisfied) {
                return Ok(());
            }

            // Try a whole-run skip if we're sitting just before a skip
            // block and it still ends before where we need to go.
            if let Payload::Offset(_) = self.payload {
                if let Some((block, after_block)) = try_read_skip_block(index, self.pos)? {
                    if block.last_docnum < desired_doc.0 {
                        self.pos = after_block + block.length as usize;
                        self.posting_num += block.count as u64;
                        self.curdoc = DocNum(block.last_docnum);
                        self.curwpos = 0;
                        if self.posting_num >= self.occurrence_count {
                            self.exhausted = true;
                            self.curdoc = DocNum::EXHAUSTED;
                            return Ok(());
                        }
                        continue;
                    }
                }
            }

            if self.decode_next(index)?.is_none() {
                return Ok(());
            }
        }
    }

    /// Advance within the current document, counting repeated occurrences
    /// of this word in it (for the BM25 term-frequency feature). Leaves the
    /// cursor on the first posting of the next document (or exhausted).
    pub fn advance_within_doc(&mut self, index: &[u8]) -> Result<u32> {
        let doc = self.curdoc;
        let mut count = if self.exhausted { 0 } else { 1 };
        loop {
            if self.decode_next(index)?.is_none() {
                break;
            }
            if self.curdoc != doc {
                break;
            }
            count += 1;
        }
        self.tf = count;
        Ok(count)
    }
}
