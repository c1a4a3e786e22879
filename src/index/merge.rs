//! Pairwise external merge of scratch blocks
//!
//! Pending blocks sit in a queue. Each step takes two of them out of the
//! store (deleting their files), merges them in memory and writes the
//! result back as a new block, until a single index remains.
//!
//! - `Fifo` pairs the two oldest blocks and appends the result
//! - `SmallestFirst` always pairs the two smallest blocks
//!
//! With several workers, up to `workers` disjoint pairs are merged in
//! parallel per round. Each worker still holds only two partial indexes.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use tracing::{debug, error, info};

use super::postings::merge_postings;
use super::store::BlockStore;
use super::types::{BlockMeta, PartialIndex};
use crate::config::MergeStrategy;
use crate::error::BlockdexError;
use crate::Result;

/// Merge two term-sorted indexes into one term-sorted index
///
/// Terms found in both get the union of their postings; terms found in
/// only one pass through unchanged.
pub fn merge_indexes(left: PartialIndex, right: PartialIndex) -> PartialIndex {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_entries().into_iter().peekable();
    let mut right = right.into_entries().into_iter().peekable();

    loop {
        let ordering = match (left.peek(), right.peek()) {
            (Some((l, _)), Some((r, _))) => l.cmp(r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match ordering {
            Ordering::Less => out.extend(left.next()),
            Ordering::Greater => out.extend(right.next()),
            Ordering::Equal => {
                if let (Some((term, a)), Some((_, b))) = (left.next(), right.next()) {
                    out.push((term, merge_postings(&a, &b)));
                }
            }
        }
    }

    PartialIndex::from_sorted(out)
}

/// Block ordered by on-disk size, ties broken by id
#[derive(Clone, Debug, PartialEq, Eq)]
struct SizedBlock(BlockMeta);

impl Ord for SizedBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.size_bytes, self.0.id).cmp(&(other.0.size_bytes, other.0.id))
    }
}

impl PartialOrd for SizedBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending blocks awaiting merge
enum MergeQueue {
    Fifo(VecDeque<BlockMeta>),
    SmallestFirst(BinaryHeap<Reverse<SizedBlock>>),
}

impl MergeQueue {
    fn new(strategy: MergeStrategy, blocks: Vec<BlockMeta>) -> Self {
        match strategy {
            MergeStrategy::Fifo => MergeQueue::Fifo(blocks.into_iter().collect()),
            MergeStrategy::SmallestFirst => MergeQueue::SmallestFirst(
                blocks.into_iter().map(|b| Reverse(SizedBlock(b))).collect(),
            ),
        }
    }

    fn len(&self) -> usize {
        match self {
            MergeQueue::Fifo(queue) => queue.len(),
            MergeQueue::SmallestFirst(heap) => heap.len(),
        }
    }

    fn pop(&mut self) -> Option<BlockMeta> {
        match self {
            MergeQueue::Fifo(queue) => queue.pop_front(),
            MergeQueue::SmallestFirst(heap) => heap.pop().map(|Reverse(SizedBlock(b))| b),
        }
    }

    fn push(&mut self, block: BlockMeta) {
        match self {
            MergeQueue::Fifo(queue) => queue.push_back(block),
            MergeQueue::SmallestFirst(heap) => heap.push(Reverse(SizedBlock(block))),
        }
    }

    /// Take up to `max_pairs` disjoint pairs for the next round
    fn pop_pairs(&mut self, max_pairs: usize) -> Vec<(BlockMeta, BlockMeta)> {
        let mut pairs = Vec::new();
        while pairs.len() < max_pairs && self.len() >= 2 {
            if let (Some(a), Some(b)) = (self.pop(), self.pop()) {
                pairs.push((a, b));
            }
        }
        pairs
    }
}

/// Summary of a completed merge phase
#[derive(Debug)]
pub struct MergeOutcome {
    /// The single global index
    pub index: PartialIndex,
    /// Number of pairwise merge steps performed
    pub steps: usize,
}

/// Drives the merge phase over a block store
pub struct BlockMerger<'a> {
    store: &'a BlockStore,
    strategy: MergeStrategy,
    workers: usize,
}

impl<'a> BlockMerger<'a> {
    pub fn new(store: &'a BlockStore, strategy: MergeStrategy) -> Self {
        Self {
            store,
            strategy,
            workers: 1,
        }
    }

    /// Merge up to `workers` independent pairs at a time
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Merge all blocks down to one index
    ///
    /// No blocks at all yields an empty index.
    pub fn merge_all(&self, blocks: Vec<BlockMeta>) -> Result<MergeOutcome> {
        info!(
            blocks = blocks.len(),
            strategy = ?self.strategy,
            workers = self.workers,
            "merging blocks"
        );

        let mut queue = MergeQueue::new(self.strategy, blocks);
        let mut steps = 0;

        while queue.len() >= 2 {
            let pairs = queue.pop_pairs(self.workers);
            let merged = if pairs.len() == 1 {
                vec![self.merge_pair(&pairs[0])?]
            } else {
                self.merge_round(&pairs)?
            };
            steps += merged.len();
            for block in merged {
                queue.push(block);
            }
        }

        let index = match queue.pop() {
            Some(last) => self.store.take_block(&last)?,
            None => PartialIndex::new(),
        };

        info!(terms = index.len(), steps, "merge complete");
        Ok(MergeOutcome { index, steps })
    }

    fn merge_pair(&self, pair: &(BlockMeta, BlockMeta)) -> Result<BlockMeta> {
        let (a, b) = pair;
        let left = self.store.take_block(a).map_err(log_merge_failure)?;
        let right = self.store.take_block(b).map_err(log_merge_failure)?;
        let merged = self.store.write_block(&merge_indexes(left, right))?;
        debug!(left = %a.id, right = %b.id, result = %merged.id, "merged blocks");
        Ok(merged)
    }

    fn merge_round(&self, pairs: &[(BlockMeta, BlockMeta)]) -> Result<Vec<BlockMeta>> {
        let results = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = pairs
                .iter()
                .map(|pair| s.spawn(move |_| self.merge_pair(pair)))
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(BlockdexError::Merge {
                            block: "worker".to_string(),
                            reason: "merge worker panicked".to_string(),
                        })
                    })
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| BlockdexError::Merge {
            block: "worker".to_string(),
            reason: "merge worker panicked".to_string(),
        })?;

        results.into_iter().collect()
    }
}

fn log_merge_failure(err: BlockdexError) -> BlockdexError {
    if let BlockdexError::Merge { block, reason } = &err {
        error!(block = %block, reason = %reason, "merge input unavailable");
    }
    err
}
