//! Index Mapper (C1): opens and memory-maps the four index files, validates
//! the header, and derives the collection-wide constants every other module
//! needs (spec §4.1).

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Error, ErrorKind, Result};
use crate::index::doctable::Layout as DoctableLayout;
use crate::index::header::Header;
use crate::index::vocab::VocabLayout;

/// One read-only memory mapping, following the teacher's `MmapFile`.
struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::new(ErrorKind::Io, format!("opening {}: {e}", path.display()))
        })?;
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| {
                Error::new(ErrorKind::OutOfMemory, format!("mmap'ing {}: {e}", path.display()))
            })?
        };
        Ok(MappedFile { mmap })
    }

    fn as_slice(&self) -> &[u8] {
        &self.mmap[..]
    }

    fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Hint to the OS that this whole mapping will be needed soon, ahead of
    /// the page-touch pass in `warmup()` (spec §4.1 `warm_indexes`). Mirrors
    /// the teacher's own preference for calling directly into `libc` for OS
    /// primitives (`storage::file_lock`'s raw `flock`) rather than routing
    /// through a wrapper crate.
    #[cfg(unix)]
    fn advise_willneed(&self) {
        if self.mmap.is_empty() {
            return;
        }
        unsafe {
            libc::madvise(self.mmap.as_ptr() as *mut libc::c_void, self.mmap.len(), libc::MADV_WILLNEED);
        }
    }

    #[cfg(not(unix))]
    fn advise_willneed(&self) {}
}

/// The four files a QBASHER index is split across, plus the derived
/// constants needed by the vocabulary lookup, SAAT, candidate, and ranking
/// layers.
pub struct IndexEnvironment {
    inverted: MappedFile,
    forward: MappedFile,
    vocab: MappedFile,
    doctable: MappedFile,

    header: Header,
    doctable_layout: DoctableLayout,
    vocab_layout: VocabLayout,

    num_documents: u64,
    total_postings: u64,
    avg_doc_length: f64,
    /// 256-entry table: does byte `b` break tokens, and if so, is it an
    /// "operator" character passed through to the query parser (spec §4.1,
    /// §8 "Other_token_breakers" / "Query_meta_chars").
    token_breakers: [bool; 256],
    query_meta_chars: [bool; 256],
    expect_cp1252: bool,
}

fn mark_chars(table: &mut [bool; 256], chars: &str) {
    for b in chars.bytes() {
        table[b as usize] = true;
    }
    // Default whitespace breakers are always active regardless of what the
    // header declares explicitly.
    for ws in [b' ', b'\t', b'\r', b'\n'] {
        table[ws as usize] = true;
    }
}

impl IndexEnvironment {
    /// Open an index rooted at `stem` (e.g. `/data/myindex` maps
    /// `/data/myindex.if`, `.forward`, `.vocab`, `.dt`).
    pub fn open(stem: &Path) -> Result<Self> {
        let inverted_path = with_ext(stem, "if");
        let forward_path = with_ext(stem, "forward");
        let vocab_path = with_ext(stem, "vocab");
        let doctable_path = with_ext(stem, "dt");

        Self::open_paths(&inverted_path, &forward_path, &vocab_path, &doctable_path)
    }

    /// Open and validate all four mapped files, logging a
    /// [`tracing::error!`] before returning on any fatal failure (header
    /// mismatch, missing file, mmap failure) — per spec §7, a fatal error
    /// here means the process cannot reliably serve any query at all.
    pub fn open_paths(inverted_path: &Path, forward_path: &Path, vocab_path: &Path, doctable_path: &Path) -> Result<Self> {
        Self::open_paths_inner(inverted_path, forward_path, vocab_path, doctable_path)
            .inspect_err(|e| tracing::error!(error = %e, code = e.numeric_code(), "fatal: failed to open index environment"))
    }

    fn open_paths_inner(
        inverted_path: &Path,
        forward_path: &Path,
        vocab_path: &Path,
        doctable_path: &Path,
    ) -> Result<Self> {
        let inverted = MappedFile::open(inverted_path)?;
        let forward = MappedFile::open(forward_path)?;
        let vocab = MappedFile::open(vocab_path)?;
        let doctable = MappedFile::open(doctable_path)?;

        let header = Header::parse(inverted.as_slice())?;
        header.validate(forward.len(), doctable.len(), vocab.len())?;
        verify_trailing_marker(inverted.as_slice())?;

        let num_documents = header.num_documents()? as u64;
        let total_postings = header.total_postings()? as u64;

        let doctable_layout = DoctableLayout::reference();
        // Term length is derived from the vocab file's declared record
        // size, which must evenly divide its mapped length (spec §4.2).
        let vocab_layout = derive_vocab_layout(vocab.len())?;

        let avg_doc_length = if num_documents == 0 {
            0.0
        } else {
            // Forward-file total word count isn't separately declared;
            // approximate from total postings, which is exact for a
            // single-field index (spec §4.1 Open Question: avdoclen source).
            total_postings as f64 / num_documents as f64
        };

        let mut token_breakers = [false; 256];
        mark_chars(&mut token_breakers, header.other_token_breakers()?);
        let mut query_meta_chars = [false; 256];
        mark_chars(&mut query_meta_chars, header.query_meta_chars()?);

        let expect_cp1252 = header.expect_cp1252()?;

        Ok(IndexEnvironment {
            inverted,
            forward,
            vocab,
            doctable,
            header,
            doctable_layout,
            vocab_layout,
            num_documents,
            total_postings,
            avg_doc_length,
            token_breakers,
            query_meta_chars,
            expect_cp1252,
        })
    }

    pub fn inverted_bytes(&self) -> &[u8] {
        self.inverted.as_slice()
    }

    pub fn forward_bytes(&self) -> &[u8] {
        self.forward.as_slice()
    }

    pub fn vocab_bytes(&self) -> &[u8] {
        self.vocab.as_slice()
    }

    pub fn doctable_bytes(&self) -> &[u8] {
        self.doctable.as_slice()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn doctable_layout(&self) -> &DoctableLayout {
        &self.doctable_layout
    }

    pub fn vocab_layout(&self) -> &VocabLayout {
        &self.vocab_layout
    }

    pub fn num_documents(&self) -> u64 {
        self.num_documents
    }

    pub fn total_postings(&self) -> u64 {
        self.total_postings
    }

    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    pub fn is_token_breaker(&self, byte: u8) -> bool {
        self.token_breakers[byte as usize]
    }

    pub fn is_query_meta_char(&self, byte: u8) -> bool {
        self.query_meta_chars[byte as usize]
    }

    pub fn expect_cp1252(&self) -> bool {
        self.expect_cp1252
    }

    pub fn inverted_header_len(&self) -> usize {
        self.header.header_len
    }

    /// Touch every page of every mapped file once, forcing the OS to
    /// populate the page cache up front rather than paying fault latency
    /// during the first queries (spec §4.1 `warm_indexes`).
    pub fn warmup(&self) {
        for file in [&self.inverted, &self.forward, &self.vocab, &self.doctable] {
            file.advise_willneed();
            let mut checksum: u64 = 0;
            for chunk in file.as_slice().chunks(4096) {
                checksum = checksum.wrapping_add(chunk[0] as u64);
            }
            std::hint::black_box(checksum);
        }
    }
}

/// The inverted file ends with an 8-byte little-endian integer equal to its
/// own total size, a cheap self-consistency check against truncation
/// (spec §4.1).
fn verify_trailing_marker(inverted: &[u8]) -> Result<()> {
    if inverted.len() < 8 {
        return Err(Error::new(ErrorKind::HeaderMismatch, "inverted file is too short to hold its trailing self-size marker"));
    }
    let marker_bytes: [u8; 8] = inverted[inverted.len() - 8..].try_into().unwrap();
    let marker = u64::from_le_bytes(marker_bytes);
    if marker != inverted.len() as u64 {
        return Err(Error::new(
            ErrorKind::HeaderMismatch,
            format!("inverted file trailing self-size marker ({marker}) does not match actual file size ({})", inverted.len()),
        ));
    }
    Ok(())
}

fn with_ext(stem: &Path, ext: &str) -> PathBuf {
    let mut p = stem.to_path_buf();
    let file_name = p.file_name().map(|n| n.to_owned()).unwrap_or_default();
    let mut name = file_name.to_string_lossy().into_owned();
    name.push('.');
    name.push_str(ext);
    p.set_file_name(name);
    p
}

fn derive_vocab_layout(vocab_size: usize) -> Result<VocabLayout> {
    // Candidate term lengths the reference builder emits records for;
    // pick whichever evenly divides the mapped file (spec Open Question:
    // vocab term_max_len isn't declared in the header, so it's recovered
    // from file geometry rather than assumed fixed).
    const RECORD_OVERHEAD: usize = 1 + 5 + 1 + 6; // null terminator + occurrence + qidf + payload
    for term_max_len in [15, 31, 63, 127] {
        let layout = VocabLayout { term_max_len };
        if vocab_size % layout.record_size() == 0 {
            return Ok(layout);
        }
    }
    let _ = RECORD_OVERHEAD;
    Err(Error::new(
        ErrorKind::HeaderMismatch,
        format!("vocab file size {vocab_size} does not divide evenly by any known record size"),
    ))
}
