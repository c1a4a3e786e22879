//! Block-based inverted index construction
//!
//! Blocked sort-based indexing: documents are indexed one block at a time
//! into small in-memory partial indexes, spilled to a scratch store, and
//! merged pairwise until one global index remains. That index is written as
//! a term-ordered dictionary file plus a parallel postings file.
//!
//! # Architecture
//!
//! - `BlockBuilder`: in-memory postings for one block of documents
//! - `BlockStore`: scratch files for partial indexes, deleted once read
//! - `BlockMerger`: pairwise merge of pending blocks
//! - `IndexWriter`: dictionary and postings output
//! - `TermDictionary` / `PostingsReader`: read-only access at query time

mod types;
mod buffer;
mod store;
mod merge;
mod postings;
mod term_dict;
mod writer;

pub use types::*;
pub use buffer::*;
pub use store::*;
pub use merge::*;
pub use postings::*;
pub use term_dict::*;
pub use writer::*;
