//! In-memory builder for one block of documents
//!
//! Documents must arrive in strictly increasing id order. That ordering is
//! what keeps every posting list sorted and duplicate-free with a single
//! append check, so the builder rejects anything else.

use std::collections::HashMap;

use super::types::{DocId, PartialIndex, PostingList};
use crate::error::BlockdexError;
use crate::tokenizer::Normalizer;
use crate::Result;

/// Accumulates term postings for one block
#[derive(Debug, Default)]
pub struct BlockBuilder {
    /// Term to postings mapping
    terms: HashMap<String, PostingList>,
    /// Last document added, for the ordering precondition
    last_doc: Option<DocId>,
    doc_count: usize,
}

impl BlockBuilder {
    /// Create a new empty block builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with pre-allocated term capacity
    pub fn with_capacity(term_capacity: usize) -> Self {
        Self {
            terms: HashMap::with_capacity(term_capacity),
            ..Self::default()
        }
    }

    /// Add a document's normalized terms
    pub fn add_document<I>(&mut self, doc_id: DocId, terms: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(previous) = self.last_doc {
            if doc_id <= previous {
                return Err(BlockdexError::OutOfOrderDocument { previous, doc_id });
            }
        }
        self.last_doc = Some(doc_id);
        self.doc_count += 1;

        for term in terms {
            let postings = self.terms.entry(term).or_default();
            if postings.last() != Some(&doc_id) {
                postings.push(doc_id);
            }
        }

        Ok(())
    }

    /// Normalize raw text and add it as a document
    pub fn index_text<N>(&mut self, doc_id: DocId, text: &str, normalizer: &N) -> Result<()>
    where
        N: Normalizer + ?Sized,
    {
        self.add_document(doc_id, normalizer.normalize(text))
    }

    /// Number of documents added so far
    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Number of distinct terms so far
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    /// Sort the block by term and hand it off
    pub fn finish(self) -> PartialIndex {
        let mut entries: Vec<_> = self.terms.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        PartialIndex::from_sorted(entries)
    }
}
