//! Doctable entry packing/unpacking: one 8-byte little-endian word per
//! document, packing word-count, forward-file offset, a quantized static
//! score, and a Bloom signature (spec §3).
//!
//! Field order, low-to-high bit, mirrors `DTE_WDCNT/DOCOFF/DOCSCORE/
//! DOCBLOOM` in the original `QBASHQ_lib.c`: word-count occupies the low
//! bits, then offset, then score, then Bloom signature in the high bits.

use crate::error::{Error, ErrorKind, Result};

pub const ENTRY_BYTES: usize = 8;

/// Bit widths for the four packed fields. Validated to sum to 64 at
/// construction (spec §3: "Exact bit widths are configured once and
/// validated at load").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub wordcount_bits: u32,
    pub offset_bits: u32,
    pub score_bits: u32,
    pub bloom_bits: u32,
}

impl Layout {
    pub fn new(wordcount_bits: u32, offset_bits: u32, score_bits: u32, bloom_bits: u32) -> Result<Self> {
        let total = wordcount_bits + offset_bits + score_bits + bloom_bits;
        if total != 64 {
            return Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("doctable bit widths sum to {total}, must sum to 64"),
            ));
        }
        Ok(Layout {
            wordcount_bits,
            offset_bits,
            score_bits,
            bloom_bits,
        })
    }

    /// The layout used by reference QBASHER indexes: 6-bit word count
    /// (saturating at 63), 40-bit forward offset, 8-bit score, 10-bit
    /// Bloom signature.
    pub fn reference() -> Self {
        Layout::new(6, 40, 8, 10).expect("reference layout sums to 64")
    }

    fn wordcount_mask(&self) -> u64 {
        (1u64 << self.wordcount_bits) - 1
    }

    fn offset_mask(&self) -> u64 {
        (1u64 << self.offset_bits) - 1
    }

    fn offset_shift(&self) -> u32 {
        self.wordcount_bits
    }

    fn score_mask(&self) -> u64 {
        (1u64 << self.score_bits) - 1
    }

    fn score_shift(&self) -> u32 {
        self.wordcount_bits + self.offset_bits
    }

    fn bloom_mask(&self) -> u64 {
        (1u64 << self.bloom_bits) - 1
    }

    fn bloom_shift(&self) -> u32 {
        self.wordcount_bits + self.offset_bits + self.score_bits
    }

    pub fn max_word_count(&self) -> u64 {
        self.wordcount_mask()
    }

    pub fn bloom_width(&self) -> u32 {
        self.bloom_bits
    }

    /// Pack one entry. `word_count` saturates at the field's max rather
    /// than wrapping (spec §3: "saturating at a maximum"). `score` must be
    /// in `[0,1]`; `bloom_signature` is truncated to the field width.
    pub fn pack(&self, word_count: u64, forward_offset: u64, score: f64, bloom_signature: u64) -> u64 {
        let wc = word_count.min(self.wordcount_mask());
        let off = forward_offset & self.offset_mask();
        let quantized_score = ((score.clamp(0.0, 1.0)) * self.score_mask() as f64).round() as u64 & self.score_mask();
        let bloom = bloom_signature & self.bloom_mask();

        wc | (off << self.offset_shift())
            | (quantized_score << self.score_shift())
            | (bloom << self.bloom_shift())
    }

    pub fn unpack(&self, entry: u64) -> DoctableEntry {
        let word_count = entry & self.wordcount_mask();
        let forward_offset = (entry >> self.offset_shift()) & self.offset_mask();
        let quantized_score = (entry >> self.score_shift()) & self.score_mask();
        let score = quantized_score as f64 / self.score_mask() as f64;
        let bloom_signature = (entry >> self.bloom_shift()) & self.bloom_mask();

        DoctableEntry {
            word_count,
            forward_offset,
            score,
            bloom_signature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoctableEntry {
    pub word_count: u64,
    pub forward_offset: u64,
    pub score: f64,
    pub bloom_signature: u64,
}

/// Read and unpack the entry for `docnum` directly out of the mapped
/// doctable slice.
pub fn entry_at(doctable: &[u8], layout: &Layout, docnum: u64) -> Result<DoctableEntry> {
    let start = docnum as usize * ENTRY_BYTES;
    let bytes = doctable
        .get(start..start + ENTRY_BYTES)
        .ok_or_else(|| Error::new(ErrorKind::Internal, format!("docnum {docnum} out of range")))?;
    let raw = u64::from_le_bytes(bytes.try_into().unwrap());
    Ok(layout.unpack(raw))
}
