//! Vocabulary lookup (C2): binary search over the sorted, fixed-size vocab
//! records; IDF quantization/recovery (spec §4.2).

use crate::error::{Error, ErrorKind, Result};
use crate::types::DocNum;

const OCCURRENCE_BYTES: usize = 5;
const QIDF_BYTES: usize = 1;
const PAYLOAD_BYTES: usize = 6;

/// Fixed-size vocab record layout: `term_max_len + 1` bytes for the
/// null-terminated term, then occurrence count, quantized IDF, and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabLayout {
    pub term_max_len: usize,
}

impl VocabLayout {
    pub fn record_size(&self) -> usize {
        self.term_max_len + 1 + OCCURRENCE_BYTES + QIDF_BYTES + PAYLOAD_BYTES
    }

    fn term_field_len(&self) -> usize {
        self.term_max_len + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// `occurrence_count == 1`: the single posting is inlined directly.
    Inline { doc: DocNum, wpos: u8 },
    /// Otherwise: byte offset of this term's postings list in the inverted file.
    Offset(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabEntry<'a> {
    pub term: &'a [u8],
    pub occurrence_count: u64,
    pub quantized_idf: u8,
    pub payload: Payload,
}

/// IDF for a quantized byte `q` given `N` documents: `q * ln(N) / 255`
/// (spec §4.2).
pub fn idf_from_quantized(q: u8, total_docs: u64) -> f64 {
    if total_docs == 0 {
        return 0.0;
    }
    q as f64 * (total_docs as f64).ln() / 255.0
}

/// Inverse of [`idf_from_quantized`]: `q = round(idf * 255 / ln(N))`
/// (spec Glossary, "Quantized IDF").
pub fn quantize_idf(idf: f64, total_docs: u64) -> u8 {
    if total_docs <= 1 {
        return 0;
    }
    let log_n = (total_docs as f64).ln();
    if log_n <= 0.0 {
        return 0;
    }
    ((idf * 255.0 / log_n).round().clamp(0.0, 255.0)) as u8
}

fn read_record<'a>(vocab: &'a [u8], layout: &VocabLayout, index: usize) -> Result<VocabEntry<'a>> {
    let rec_size = layout.record_size();
    let start = index * rec_size;
    let rec = vocab
        .get(start..start + rec_size)
        .ok_or_else(|| Error::new(ErrorKind::Internal, "vocab record index out of range"))?;

    let term_field = &rec[..layout.term_field_len()];
    let term_len = term_field.iter().position(|&b| b == 0).unwrap_or(term_field.len());
    let term = &term_field[..term_len];

    let mut p = layout.term_field_len();
    let mut occurrence_count = 0u64;
    for i in 0..OCCURRENCE_BYTES {
        occurrence_count |= (rec[p + i] as u64) << (8 * i);
    }
    p += OCCURRENCE_BYTES;

    let quantized_idf = rec[p];
    p += QIDF_BYTES;

    let payload_bytes = &rec[p..p + PAYLOAD_BYTES];
    let payload = if occurrence_count == 1 {
        // Inline single posting: docnum (5 bytes) + word position (1 byte).
        let mut doc = 0u64;
        for i in 0..5 {
            doc |= (payload_bytes[i] as u64) << (8 * i);
        }
        Payload::Inline { doc: DocNum(doc), wpos: payload_bytes[5] }
    } else {
        let mut offset = 0u64;
        for (i, &b) in payload_bytes.iter().enumerate() {
            offset |= (b as u64) << (8 * i);
        }
        Payload::Offset(offset)
    };

    Ok(VocabEntry { term, occurrence_count, quantized_idf, payload })
}

/// Binary search the vocab file for `term`. `term` must already be
/// lowercased and (if configured) diacritic-stripped by the preprocessor —
/// vocab lookup itself does no normalization (spec §4.2).
pub fn lookup<'a>(vocab: &'a [u8], layout: &VocabLayout, term: &[u8]) -> Result<Option<VocabEntry<'a>>> {
    let rec_size = layout.record_size();
    if rec_size == 0 || vocab.len() % rec_size != 0 {
        return Err(Error::new(ErrorKind::Internal, "vocab file size is not a multiple of the record size"));
    }
    let num_records = vocab.len() / rec_size;
    if num_records == 0 {
        return Ok(None);
    }

    let mut lo = 0usize;
    let mut hi = num_records;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let entry = read_record(vocab, layout, mid)?;
        match entry.term.cmp(term) {
            std::cmp::Ordering::Equal => return Ok(Some(entry)),
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
        }
    }
    Ok(None)
}

/// Encode one vocab record, used by tests and by anything building a vocab
/// file in memory (e.g. fixtures).
pub fn encode_record(layout: &VocabLayout, term: &[u8], occurrence_count: u64, quantized_idf: u8, payload: Payload) -> Vec<u8> {
    assert!(term.len() <= layout.term_max_len, "term exceeds term_max_len");
    let mut rec = vec![0u8; layout.record_size()];
    rec[..term.len()].copy_from_slice(term);

    let mut p = layout.term_field_len();
    for i in 0..OCCURRENCE_BYTES {
        rec[p + i] = ((occurrence_count >> (8 * i)) & 0xff) as u8;
    }
    p += OCCURRENCE_BYTES;
    rec[p] = quantized_idf;
    p += QIDF_BYTES;

    match payload {
        Payload::Inline { doc, wpos } => {
            for i in 0..5 {
                rec[p + i] = ((doc.0 >> (8 * i)) & 0xff) as u8;
            }
            rec[p + 5] = wpos;
        }
        Payload::Offset(offset) => {
            for i in 0..PAYLOAD_BYTES {
                rec[p + i] = ((offset >> (8 * i)) & 0xff) as u8;
            }
        }
    }
    rec
}
