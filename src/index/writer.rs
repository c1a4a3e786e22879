//! Dictionary and postings writer for the final global index
//!
//! Line `i` of the dictionary names the term whose postings are on line `i`
//! of the postings file. Terms must be written in ascending order. The
//! postings file ends with one extra line, referenced by no term, holding
//! every document id of the corpus.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::postings::{encode_line, is_strictly_ascending};
use super::types::{DocId, PartialIndex};
use crate::error::BlockdexError;
use crate::Result;

/// Counts reported after writing an index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub terms: usize,
    pub postings: usize,
    pub documents: usize,
}

/// Streams dictionary and postings lines to two sinks
pub struct IndexWriter<W: Write> {
    dictionary: W,
    postings: W,
    last_term: Option<String>,
    documents_written: bool,
    stats: WriteStats,
}

impl IndexWriter<BufWriter<File>> {
    /// Create (or truncate) the dictionary and postings files
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(dictionary: P, postings: Q) -> Result<Self> {
        let dictionary = BufWriter::new(File::create(dictionary)?);
        let postings = BufWriter::new(File::create(postings)?);
        Ok(Self::new(dictionary, postings))
    }
}

impl<W: Write> IndexWriter<W> {
    pub fn new(dictionary: W, postings: W) -> Self {
        Self {
            dictionary,
            postings,
            last_term: None,
            documents_written: false,
            stats: WriteStats::default(),
        }
    }

    /// Append one term and its postings
    pub fn add(&mut self, term: &str, postings: &[DocId]) -> Result<()> {
        if self.documents_written {
            return Err(BlockdexError::Dictionary {
                line: self.stats.terms + 1,
                reason: format!("term '{}' written after the document list", term),
            });
        }
        if let Some(last) = &self.last_term {
            if term <= last.as_str() {
                return Err(BlockdexError::Dictionary {
                    line: self.stats.terms + 1,
                    reason: format!("term '{}' written after '{}'", term, last),
                });
            }
        }

        writeln!(self.dictionary, "{} {}", term, self.stats.terms)?;
        writeln!(self.postings, "{}", encode_line(postings))?;

        self.last_term = Some(term.to_string());
        self.stats.terms += 1;
        self.stats.postings += postings.len();
        Ok(())
    }

    /// Write every entry of a global index
    pub fn write_index(&mut self, index: &PartialIndex) -> Result<()> {
        for (term, postings) in index.entries() {
            self.add(term, postings)?;
        }
        Ok(())
    }

    /// Append the trailing document list; no terms may follow it
    ///
    /// Documents that produced no terms appear only here.
    pub fn write_documents(&mut self, documents: &[DocId]) -> Result<()> {
        if self.documents_written {
            return Err(BlockdexError::Dictionary {
                line: self.stats.terms + 1,
                reason: "document list written twice".to_string(),
            });
        }
        if !is_strictly_ascending(documents) {
            return Err(BlockdexError::Dictionary {
                line: self.stats.terms + 1,
                reason: "document list is not strictly ascending".to_string(),
            });
        }
        writeln!(self.postings, "{}", encode_line(documents))?;
        self.documents_written = true;
        self.stats.documents = documents.len();
        Ok(())
    }

    /// Flush both sinks and return them with the write counts
    ///
    /// A writer finished without a document list gets an empty one.
    pub fn finish(mut self) -> Result<(W, W, WriteStats)> {
        if !self.documents_written {
            self.write_documents(&[])?;
        }
        self.dictionary.flush()?;
        self.postings.flush()?;
        info!(
            terms = self.stats.terms,
            postings = self.stats.postings,
            documents = self.stats.documents,
            "index written"
        );
        Ok((self.dictionary, self.postings, self.stats))
    }
}
