//! Shard worker: scores one slice of the reference dataset and keeps the
//! candidates whose overlap clears the margin.

use super::scorer;
use crate::utils::error::{Error, Result};
use crate::utils::types::{CandidateScore, ReferenceRecord, SignalObservation};
use log::debug;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tokio_util::sync::CancellationToken;

/// Heap entry ordered by overlap count, earlier insertion first among ties.
#[derive(Debug)]
struct Ranked {
    seq: usize,
    candidate: CandidateScore,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.candidate
            .overlap_count
            .cmp(&other.candidate.overlap_count)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Max-priority queue of candidates keyed by overlap count.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    heap: BinaryHeap<Ranked>,
    next_seq: usize,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: CandidateScore) {
        self.heap.push(Ranked { seq: self.next_seq, candidate });
        self.next_seq += 1;
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pop in descending overlap order until a candidate falls to
    /// `largest * margin` or below, then order the survivors by ratio.
    pub fn into_top_results(mut self, margin: f64) -> Vec<CandidateScore> {
        let largest_count = match self.heap.peek() {
            | Some(top) => top.candidate.overlap_count,
            | None => return Vec::new(),
        };
        let threshold = largest_count as f64 * margin;

        let mut top_results = Vec::new();
        while let Some(Ranked { candidate, .. }) = self.heap.pop() {
            // Pops are non-increasing in overlap, so nothing after this one passes either.
            if candidate.overlap_count as f64 <= threshold {
                break;
            }
            top_results.push(candidate);
        }

        top_results.sort_by_key(|c| OrderedFloat(c.ratio));
        top_results
    }
}

/// Applies the scorer to one contiguous shard of the dataset.
pub struct ShardWorker<'a> {
    shard: usize,
    records: &'a [ReferenceRecord],
    margin: f64,
}

impl<'a> ShardWorker<'a> {
    pub fn new(shard: usize, records: &'a [ReferenceRecord], margin: f64) -> Self {
        Self { shard, records, margin }
    }

    /// Score every record of the shard and return its `topResults`, best
    /// ratio first. Checks `cancel` between records.
    pub fn run(
        &self, query: &[SignalObservation], cancel: &CancellationToken,
    ) -> Result<Vec<CandidateScore>> {
        let mut queue = CandidateQueue::new();
        for record in self.records {
            if cancel.is_cancelled() {
                debug!("shard {} cancelled after {} candidates", self.shard, queue.len());
                return Err(Error::Cancelled);
            }
            if let Some(candidate) = scorer::score(record, query) {
                queue.push(candidate);
            }
        }

        let scored = queue.len();
        let top_results = queue.into_top_results(self.margin);
        debug!(
            "shard {}: {} records, {} candidates, {} kept",
            self.shard,
            self.records.len(),
            scored,
            top_results.len()
        );
        Ok(top_results)
    }
}
