//! Worker-pool dispatch over a shared, read-only [`QueryEngine`] (spec §5,
//! §6 "Batch input format"): `query_streams` OS threads each pull one line
//! at a time from a line-oriented source and run it end-to-end — there is
//! no shared state on the hot path, only a channel to hand out work and a
//! mutex around the output sink (grounded on the teacher's
//! `mmap/mmap_file.rs`, whose `PageCache` guards shared state with a
//! `parking_lot::RwLock` rather than a std lock; the teacher's own
//! `parallel/` module is `rayon`-based document-indexing parallelism, which
//! is out of scope here — this pool dispatches independent *queries*, not
//! chunks of one document set, so it's built from `crossbeam` channels plus
//! plain OS threads instead).

use std::thread;

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

use crate::engine::{QueryEngine, SearchResult};
use crate::error::Result;
use crate::options::Options;

/// Within a batch line, ASCII 0x1E separates the multi-query from a
/// trailing query-label suffix (spec §6).
pub const LABEL_SEPARATOR: char = '\u{1E}';

/// One line of batch input, already split into its multi-query text and
/// optional label.
#[derive(Debug, Clone)]
pub struct BatchLine {
    pub multi_query: String,
    pub label: Option<String>,
}

impl BatchLine {
    pub fn parse(line: &str) -> Self {
        match line.split_once(LABEL_SEPARATOR) {
            Some((query, label)) => BatchLine { multi_query: query.to_string(), label: Some(label.to_string()) },
            None => BatchLine { multi_query: line.to_string(), label: None },
        }
    }
}

/// The outcome of evaluating one [`BatchLine`], handed to the output sink.
pub struct BatchResult {
    pub label: Option<String>,
    pub results: Result<Vec<SearchResult>>,
}

/// Run every line in `lines` across `num_workers` threads against `engine`
/// under `options`, calling `sink` with each line's result as soon as it's
/// ready. `sink` runs under a single mutex (spec §5: "a thread acquires it
/// only for the duration of formatting one result block"), so results are
/// fully computed before the lock is taken and the critical section is just
/// the sink call itself. There is no ordering guarantee across lines (spec
/// §5: "the caller may see results interleaved in arbitrary order").
pub fn run_batch<S>(engine: &QueryEngine, options: &Options, lines: &[String], num_workers: usize, sink: S)
where
    S: FnMut(BatchResult) + Send,
{
    let num_workers = num_workers.max(1).min(lines.len().max(1));
    let (job_tx, job_rx) = channel::unbounded::<BatchLine>();
    for line in lines {
        job_tx.send(BatchLine::parse(line)).expect("receiver outlives every send");
    }
    drop(job_tx);

    let sink = Mutex::new(sink);
    thread::scope(|scope| {
        for _ in 0..num_workers {
            let job_rx: Receiver<BatchLine> = job_rx.clone();
            let sink = &sink;
            scope.spawn(move || {
                while let Ok(line) = job_rx.recv() {
                    let results = engine.multi_query(&line.multi_query, options);
                    let result = BatchResult { label: line.label, results };
                    (sink.lock())(result);
                }
            });
        }
    });
}

/// A convenience collector for callers that just want every [`BatchResult`]
/// gathered back up, in whatever order workers finished (see `run_batch`'s
/// ordering note) — most real deployments supply their own `sink` instead
/// (writing straight to a TSV output stream) rather than buffering.
pub fn collect_batch(engine: &QueryEngine, options: &Options, lines: &[String], num_workers: usize) -> Vec<BatchResult> {
    let collected = Mutex::new(Vec::with_capacity(lines.len()));
    run_batch(engine, options, lines, num_workers, |result| collected.lock().push(result));
    collected.into_inner()
}
