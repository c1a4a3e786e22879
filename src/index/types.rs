//! Core types for the block-based index

use serde::{Deserialize, Serialize};
use std::fmt;

/// Document identifier, taken from the document's file name
pub type DocId = u32;

/// Strictly ascending, duplicate-free list of document ids
pub type PostingList = Vec<DocId>;

/// Scratch block identifier (monotonically increasing per build)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u64);

impl BlockId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// Metadata for a block persisted in the scratch store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMeta {
    pub id: BlockId,
    /// Number of distinct terms in the block
    pub term_count: usize,
    /// Total number of postings across all terms
    pub posting_count: usize,
    /// On-disk size including header
    pub size_bytes: u64,
}

/// Term to postings mapping for one block of documents, sorted by term
///
/// Also used for the results of merges, including the final global index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialIndex {
    entries: Vec<(String, PostingList)>,
}

impl PartialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries that are already sorted by term
    pub fn from_sorted(entries: Vec<(String, PostingList)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a term's postings
    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.entries
            .binary_search_by(|(t, _)| t.as_str().cmp(term))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    pub fn entries(&self) -> &[(String, PostingList)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, PostingList)> {
        self.entries
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn posting_count(&self) -> usize {
        self.entries.iter().map(|(_, p)| p.len()).sum()
    }

    /// Terms strictly ascending and every list strictly ascending and non-empty
    pub fn is_canonical(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].0 < w[1].0)
            && self
                .entries
                .iter()
                .all(|(_, p)| !p.is_empty() && super::postings::is_strictly_ascending(p))
    }
}
