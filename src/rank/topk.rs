//! Bounded top-K collector: a sorted-insert "pseudo-heap" that keeps only
//! the `max_to_show` best-scoring candidates per result block, ordered
//! descending by score (spec §4.5, grounded on the teacher's
//! `TopKCollector`/`BinaryHeap<ScoredDocument>` pattern but specialized to
//! a small bound where a sorted `Vec` insert beats heap overhead).

use crate::candidate::Candidate;

/// Keeps the best `capacity` candidates seen so far, sorted descending by
/// score. Insertion is O(capacity) worst case, which is cheap at the small
/// `max_to_show` values (typically ≤ a few hundred) this engine targets.
#[derive(Debug)]
pub struct TopK {
    capacity: usize,
    items: Vec<Candidate>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        TopK { capacity, items: Vec::with_capacity(capacity.min(1024)) }
    }

    /// Offer a scored candidate. Returns `true` if it was kept (either
    /// there was room, or it beat the current lowest-scoring entry).
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let pos = self.items.partition_point(|c| c.score >= candidate.score);
        if self.items.len() < self.capacity {
            self.items.insert(pos, candidate);
            true
        } else if pos < self.capacity {
            self.items.insert(pos, candidate);
            self.items.truncate(self.capacity);
            true
        } else {
            false
        }
    }

    pub fn lowest_score(&self) -> Option<f64> {
        self.items.last().map(|c| c.score)
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
