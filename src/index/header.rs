//! The inverted file's ASCII header prologue: lines of `Key: value\n`.
//!
//! Grounded on spec §4.1/§6: the header must declare `Index_format`,
//! `QBASHER version`, `Query_meta_chars`, `Other_token_breakers`, the four
//! declared file sizes, `Total postings`, `Number of documents`, and
//! optionally `expect_cp1252`.

use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};

/// Must match the format this crate was built to read. Mirrors the
/// compile-time `Index_format` constant validated in the original C engine.
pub const EXPECTED_INDEX_FORMAT: &str = "2";

pub struct Header {
    fields: HashMap<String, String>,
    /// Byte length of the header block including its own terminator, so the
    /// caller knows where posting data starts.
    pub header_len: usize,
}

impl Header {
    /// Parse `Key: value\n` lines from the start of `bytes` until a blank
    /// line or a line that doesn't contain `": "`. Returns the parsed
    /// fields and the byte offset immediately after the header.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut fields = HashMap::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let rest = &bytes[pos..];
            let nl = rest.iter().position(|&b| b == b'\n').ok_or_else(|| {
                Error::new(ErrorKind::HeaderMismatch, "inverted file header has no terminating newline")
            })?;
            let line = &rest[..nl];
            pos += nl + 1;
            if line.is_empty() {
                break;
            }
            let line_str = std::str::from_utf8(line)
                .map_err(|_| Error::new(ErrorKind::HeaderMismatch, "header line is not valid UTF-8"))?;
            let Some((key, value)) = line_str.split_once(": ") else {
                // First non-`Key: value` line ends the header block.
                pos -= nl + 1;
                break;
            };
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Header { fields, header_len: pos })
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.fields
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::new(ErrorKind::HeaderMismatch, format!("missing required header key '{key}'")))
    }

    pub fn get_usize(&self, key: &str) -> Result<usize> {
        self.get(key)?
            .parse()
            .map_err(|_| Error::new(ErrorKind::HeaderMismatch, format!("header key '{key}' is not a valid integer")))
    }

    pub fn get_bool_opt(&self, key: &str, default: bool) -> Result<bool> {
        match self.fields.get(key).map(|s| s.as_str()) {
            None => Ok(default),
            Some("TRUE") => Ok(true),
            Some("FALSE") => Ok(false),
            Some(other) => Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("header key '{key}' must be TRUE or FALSE, got '{other}'"),
            )),
        }
    }

    /// Validate the fixed/required fields against the sizes the caller
    /// observed on disk, returning a distinct error per mismatched field
    /// (spec §4.1: "refuses to proceed with a distinct error code per
    /// field").
    pub fn validate(
        &self,
        forward_size: usize,
        doctable_size: usize,
        vocab_size: usize,
    ) -> Result<()> {
        if self.get("Index_format")? != EXPECTED_INDEX_FORMAT {
            return Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("Index_format '{}' does not match expected '{EXPECTED_INDEX_FORMAT}'", self.get("Index_format")?),
            ));
        }
        self.get("QBASHER version")?;
        self.get("Query_meta_chars")?;
        self.get("Other_token_breakers")?;

        let declared_forward = self.get_usize("Size of .forward")?;
        if declared_forward != forward_size {
            return Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("Size of .forward ({declared_forward}) does not match mapped file size ({forward_size})"),
            ));
        }
        let declared_doctable = self.get_usize("Size of .dt")?;
        if declared_doctable != doctable_size {
            return Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("Size of .dt ({declared_doctable}) does not match mapped file size ({doctable_size})"),
            ));
        }
        let declared_vocab = self.get_usize("Size of .vocab")?;
        if declared_vocab != vocab_size {
            return Err(Error::new(
                ErrorKind::HeaderMismatch,
                format!("Size of .vocab ({declared_vocab}) does not match mapped file size ({vocab_size})"),
            ));
        }
        self.get_usize("Total postings")?;
        self.get_usize("Number of documents")?;
        Ok(())
    }

    pub fn query_meta_chars(&self) -> Result<&str> {
        self.get("Query_meta_chars")
    }

    pub fn other_token_breakers(&self) -> Result<&str> {
        self.get("Other_token_breakers")
    }

    pub fn total_postings(&self) -> Result<usize> {
        self.get_usize("Total postings")
    }

    pub fn num_documents(&self) -> Result<usize> {
        self.get_usize("Number of documents")
    }

    pub fn expect_cp1252(&self) -> Result<bool> {
        self.get_bool_opt("expect_cp1252", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(forward: usize, dt: usize, vocab: usize) -> Vec<u8> {
        format!(
            "Index_format: 2\nQBASHER version: 9.9\nQuery_meta_chars: %\"[]~/\nOther_token_breakers: \n\
             Size of .forward: {forward}\nSize of .dt: {dt}\nSize of .vocab: {vocab}\n\
             Total postings: 10\nNumber of documents: 2\n\n"
        )
        .into_bytes()
    }

    #[test]
    fn parses_well_formed_header() {
        let bytes = sample_header(100, 16, 64);
        let h = Header::parse(&bytes).unwrap();
        assert_eq!(h.num_documents().unwrap(), 2);
        assert_eq!(h.total_postings().unwrap(), 10);
    }

    #[test]
    fn validate_rejects_size_mismatch() {
        let bytes = sample_header(100, 16, 64);
        let h = Header::parse(&bytes).unwrap();
        assert!(h.validate(99, 16, 64).is_err());
    }

    #[test]
    fn validate_accepts_matching_sizes() {
        let bytes = sample_header(100, 16, 64);
        let h = Header::parse(&bytes).unwrap();
        assert!(h.validate(100, 16, 64).is_ok());
    }

    #[test]
    fn missing_key_is_header_mismatch() {
        let bytes = b"Index_format: 2\n\n".to_vec();
        let h = Header::parse(&bytes).unwrap();
        assert_eq!(h.get("QBASHER version").unwrap_err().kind, ErrorKind::HeaderMismatch);
    }
}
