//! A read-only, memory-mapped query engine over a static four-file index
//! (forward/vocab/doctable/inverted): relaxed-AND candidate generation,
//! linear-combination ranking, multi-query orchestration, and a worker pool
//! for batch evaluation. Index construction is out of scope — this crate
//! only ever opens index files that some other offline indexer produced.

pub mod candidate;
pub mod engine;
pub mod error;
pub mod index;
pub mod options;
pub mod pool;
pub mod preprocess;
pub mod query;
pub mod rank;
pub mod saat;
pub mod types;

pub use engine::{QueryEngine, SearchResult};
pub use error::{Category, Error, ErrorKind, Result, Severity};
pub use index::IndexEnvironment;
pub use options::Options;
