/// Complete qbasher-core API Demo
///
/// Demonstrates the major read-path operations over a small, hand-built
/// index: opening an `IndexEnvironment`, single queries, phrase queries,
/// relaxed matching, and multi-query fallback.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use qbasher_core::index::doctable::Layout as DoctableLayout;
use qbasher_core::index::inverted::{encode_posting, Posting};
use qbasher_core::index::vocab::{encode_record, Payload, VocabLayout};
use qbasher_core::index::IndexEnvironment;
use qbasher_core::types::DocNum;
use qbasher_core::{Options, QueryEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n=== qbasher-core Query Engine Demo ===\n");

    let dir = std::env::temp_dir().join(format!("qbasher-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    println!("Building a small demo index...");
    let docs = [
        "rust programming language",
        "database systems and storage engines",
        "web development with rust",
    ];
    let stem = build_index(&dir, &docs)?;
    let engine = QueryEngine::new(IndexEnvironment::open(&stem)?);
    println!("  Indexed {} documents\n", docs.len());

    println!("Step 1: Simple query...");
    run_and_print(&engine, "rust", &Options::default())?;

    println!("\nStep 2: Phrase query...");
    run_and_print(&engine, "\"web development\"", &Options::default())?;

    println!("\nStep 3: Relaxed query (one missing term tolerated)...");
    let mut relaxed = Options::default();
    relaxed.relaxation_level = 1;
    run_and_print(&engine, "rust coding language", &relaxed)?;

    println!("\nStep 4: Multi-query with fallback...");
    let results = engine.multi_query("nonexistent\t\t1.0\tN<1\nrust", &Options::default())?;
    print_results(&results);

    std::fs::remove_dir_all(&dir).ok();
    println!("\n=== Demo complete ===\n");
    Ok(())
}

fn run_and_print(engine: &QueryEngine, query: &str, options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let results = engine.query(query, options)?;
    println!("  query {query:?}: {} result(s)", results.len());
    print_results(&results);
    Ok(())
}

fn print_results(results: &[qbasher_core::SearchResult]) {
    for r in results {
        println!("    doc {} (score {:.3}): {}", r.doc.0, r.score, r.display_text);
    }
}

/// Minimal in-memory index builder: packs the four files an
/// `IndexEnvironment` expects directly in memory, the same technique the
/// integration tests use to avoid depending on an external indexer.
fn build_index(dir: &Path, docs: &[&str]) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let doctable_layout = DoctableLayout::reference();
    let bloom_width = doctable_layout.bloom_width();
    let full_bloom = (1u64 << bloom_width) - 1;

    let mut forward = Vec::new();
    let mut doc_offsets = Vec::with_capacity(docs.len());
    let mut word_counts = Vec::with_capacity(docs.len());
    let mut postings: HashMap<&str, Vec<(u64, u8)>> = HashMap::new();

    for (doc_idx, doc) in docs.iter().enumerate() {
        doc_offsets.push(forward.len() as u64);
        let words: Vec<&str> = doc.split(' ').filter(|w| !w.is_empty()).collect();
        word_counts.push(words.len());
        for (wpos, word) in words.iter().enumerate() {
            postings.entry(*word).or_default().push((doc_idx as u64, wpos as u8));
        }
        forward.extend_from_slice(doc.as_bytes());
        forward.push(b'\n');
    }

    let mut doctable = Vec::with_capacity(docs.len() * 8);
    for (offset, word_count) in doc_offsets.iter().zip(&word_counts) {
        doctable.extend_from_slice(&doctable_layout.pack(*word_count as u64, *offset, 0.5, full_bloom).to_le_bytes());
    }

    let vocab_layout = VocabLayout { term_max_len: 24 };
    let mut terms: Vec<&str> = postings.keys().copied().collect();
    terms.sort_unstable();

    let total_postings: u64 = terms.iter().map(|t| postings[t].len() as u64).sum();
    let vocab_len = terms.len() * vocab_layout.record_size();
    let header = format!(
        "Index_format: 2\nQBASHER version: 9.9\nQuery_meta_chars: %\"[]~/\nOther_token_breakers: \n\
         Size of .forward: {}\nSize of .dt: {}\nSize of .vocab: {vocab_len}\n\
         Total postings: {total_postings}\nNumber of documents: {}\n\n",
        forward.len(),
        doctable.len(),
        docs.len(),
    );
    let mut inverted = header.into_bytes();

    let mut vocab = Vec::new();
    for term in terms {
        let list = &postings[term];
        if list.len() == 1 {
            let (doc, wpos) = list[0];
            vocab.extend(encode_record(&vocab_layout, term.as_bytes(), 1, 100, Payload::Inline { doc: DocNum(doc), wpos }));
        } else {
            let offset = inverted.len() as u64;
            let mut prev = 0u64;
            for &(doc, wpos) in list {
                encode_posting(&mut inverted, prev, Posting { doc: DocNum(doc), wpos });
                prev = doc;
            }
            vocab.extend(encode_record(&vocab_layout, term.as_bytes(), list.len() as u64, 100, Payload::Offset(offset)));
        }
    }

    let marker = (inverted.len() as u64 + 8).to_le_bytes();
    inverted.extend_from_slice(&marker);

    let stem = dir.join("QBASH");
    std::fs::write(stem.with_extension("if"), &inverted)?;
    std::fs::write(stem.with_extension("forward"), &forward)?;
    std::fs::write(stem.with_extension("vocab"), &vocab)?;
    std::fs::write(stem.with_extension("dt"), &doctable)?;
    Ok(stem)
}
