//! Term dictionary using FST (Finite State Transducer)
//!
//! The dictionary file is text, one `<term> <list-index>` per line in
//! ascending term order. On load it is compiled into an FST map from term
//! to list index, which gives O(|term|) lookups and keeps memory compact.

use std::fs;
use std::path::Path;

use fst::{Map, MapBuilder};

use crate::error::BlockdexError;
use crate::Result;

/// Read-only term to list-index mapping
pub struct TermDictionary {
    fst: Map<Vec<u8>>,
    /// Largest list index referenced, if any
    max_list_index: Option<usize>,
}

impl TermDictionary {
    /// Parse dictionary file contents
    pub fn parse(contents: &str) -> Result<Self> {
        let mut builder = MapBuilder::memory();
        let mut max_list_index = None;

        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (term, index) = parse_entry(line, line_no)?;
            builder
                .insert(term.as_bytes(), index as u64)
                .map_err(|e| BlockdexError::Dictionary {
                    line: line_no + 1,
                    reason: format!("terms must be unique and ascending: {}", e),
                })?;
            max_list_index = max_list_index.max(Some(index));
        }

        let fst_data = builder.into_inner().map_err(|e| BlockdexError::Dictionary {
            line: 0,
            reason: e.to_string(),
        })?;
        let fst = Map::new(fst_data).map_err(|e| BlockdexError::Dictionary {
            line: 0,
            reason: e.to_string(),
        })?;

        Ok(Self {
            fst,
            max_list_index,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Look up a term's list index
    pub fn get(&self, term: &str) -> Option<usize> {
        self.fst.get(term.as_bytes()).map(|idx| idx as usize)
    }

    /// Get the number of terms
    pub fn len(&self) -> usize {
        self.fst.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    pub fn max_list_index(&self) -> Option<usize> {
        self.max_list_index
    }
}

fn parse_entry(line: &str, line_no: usize) -> Result<(&str, usize)> {
    let mut fields = line.split_whitespace();
    let (term, index) = match (fields.next(), fields.next(), fields.next()) {
        (Some(term), Some(index), None) => (term, index),
        _ => {
            return Err(BlockdexError::Dictionary {
                line: line_no + 1,
                reason: "expected '<term> <list-index>'".to_string(),
            })
        }
    };
    let index = index.parse().map_err(|_| BlockdexError::Dictionary {
        line: line_no + 1,
        reason: format!("invalid list index '{}'", index),
    })?;
    Ok((term, index))
}
