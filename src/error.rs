use std::fmt;

/// Severity of an [`Error`], per spec §7.
///
/// `Fatal` means the engine cannot reliably serve any query (bad index
/// header, mmap failure, allocation failure in the load path). `Query`
/// means one query failed but the index and other queries are fine.
/// `Warning` means processing continued in spite of the condition (e.g. a
/// substitution rule failed to compile and was dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning = 0,
    Query = 1,
    Fatal = 2,
}

/// Broad category of an [`Error`], used only to build the numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Unknown = 0,
    Io = 1,
    Memory = 2,
    Syscall = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Index header failed validation (format id, version, declared size, ...).
    HeaderMismatch,
    /// A file couldn't be opened, mapped, or read.
    Io,
    /// mmap/alloc failed.
    OutOfMemory,
    /// Malformed query syntax (unbalanced quotes/brackets, bad option token).
    Parse,
    /// An internal invariant was violated (corrupt postings, bad offset, ...).
    Internal,
    /// A requested entity (term, variant, option) wasn't found.
    NotFound,
    /// An argument value was out of range or otherwise not acceptable.
    InvalidArgument,
}

impl ErrorKind {
    fn severity(self) -> Severity {
        match self {
            ErrorKind::HeaderMismatch | ErrorKind::OutOfMemory | ErrorKind::Internal => {
                Severity::Fatal
            }
            ErrorKind::Io => Severity::Fatal,
            ErrorKind::Parse | ErrorKind::NotFound | ErrorKind::InvalidArgument => Severity::Query,
        }
    }

    fn category(self) -> Category {
        match self {
            ErrorKind::Io => Category::Io,
            ErrorKind::OutOfMemory => Category::Memory,
            ErrorKind::HeaderMismatch | ErrorKind::Internal => Category::Unknown,
            ErrorKind::Parse | ErrorKind::NotFound | ErrorKind::InvalidArgument => {
                Category::Unknown
            }
        }
    }

    /// Stable per-field code within its category, used to build the full
    /// numeric code. Distinct fields of the header get distinct codes so
    /// callers can tell which declared size or constant mismatched.
    fn code(self) -> u32 {
        match self {
            ErrorKind::HeaderMismatch => 1,
            ErrorKind::Io => 2,
            ErrorKind::OutOfMemory => 3,
            ErrorKind::Parse => 4,
            ErrorKind::Internal => 5,
            ErrorKind::NotFound => 6,
            ErrorKind::InvalidArgument => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error {
            kind,
            context: context.into(),
        }
    }

    /// `severity*100000 + category*10000 + code`, per spec §6.
    pub fn numeric_code(&self) -> u32 {
        self.kind.severity() as u32 * 100_000 + self.kind.category() as u32 * 10_000 + self.kind.code()
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.numeric_code(), self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("bad regex: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Human-readable explanation for a numeric error code, mirroring
/// `explain_error()` in `error_explanations.c`. Returns `None` for codes
/// this crate never emits.
pub fn explain(numeric_code: u32) -> Option<&'static str> {
    let kind_code = numeric_code % 10_000;
    match kind_code {
        1 => Some("index header failed validation against the compiled-in format identifier"),
        2 => Some("an index file could not be opened, mapped, or read"),
        3 => Some("memory mapping or allocation failed"),
        4 => Some("the query or option string was malformed"),
        5 => Some("an internal invariant was violated"),
        6 => Some("the requested entity was not found"),
        7 => Some("an argument value was out of range"),
        _ => None,
    }
}
