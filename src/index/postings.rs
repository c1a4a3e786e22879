//! Posting list algebra and the line-oriented postings file
//!
//! Every operation here assumes and preserves the posting list invariant:
//! ids strictly ascending, no duplicates. All set operations are linear
//! merge passes over both inputs.

use std::fs;
use std::path::Path;

use super::types::{DocId, PostingList};
use crate::error::BlockdexError;
use crate::Result;

/// Check the posting list invariant
pub fn is_strictly_ascending(list: &[DocId]) -> bool {
    list.windows(2).all(|w| w[0] < w[1])
}

/// Union of two posting lists with shared ids coalesced
pub fn merge_postings(a: &[DocId], b: &[DocId]) -> PostingList {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else if a[i] > b[j] {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }

    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Intersection by merge-join
pub fn intersect(a: &[DocId], b: &[DocId]) -> PostingList {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if a[i] < b[j] {
            // Skip the lagging side past every id that cannot match
            while i < a.len() && a[i] < b[j] {
                i += 1;
            }
        } else {
            while j < b.len() && b[j] < a[i] {
                j += 1;
            }
        }
    }

    out
}

/// Ids of `a` not present in `b`
pub fn difference(a: &[DocId], b: &[DocId]) -> PostingList {
    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;

    for &id in a {
        while j < b.len() && b[j] < id {
            j += 1;
        }
        if j >= b.len() || b[j] != id {
            out.push(id);
        }
    }

    out
}

/// Ids of the universe not present in `list`
pub fn complement(universe: &[DocId], list: &[DocId]) -> PostingList {
    difference(universe, list)
}

/// Serialize a posting list as one postings-file line (without newline)
pub fn encode_line(list: &[DocId]) -> String {
    let mut line = String::with_capacity(list.len() * 4);
    for (i, id) in list.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(&id.to_string());
    }
    line
}

/// Parse one postings-file line; `line_no` is zero-based
pub fn decode_line(line: &str, line_no: usize) -> Result<PostingList> {
    let mut list = PostingList::new();
    for field in line.split_ascii_whitespace() {
        let id: DocId = field.parse().map_err(|_| BlockdexError::Dictionary {
            line: line_no + 1,
            reason: format!("invalid document id '{}' in postings", field),
        })?;
        if list.last().map_or(false, |&last| last >= id) {
            return Err(BlockdexError::Dictionary {
                line: line_no + 1,
                reason: "posting list is not strictly ascending".to_string(),
            });
        }
        list.push(id);
    }
    Ok(list)
}

/// Read-only access to the postings file
///
/// The file is held in memory; line offsets are computed once so each
/// lookup only parses the requested list.
pub struct PostingsReader {
    data: String,
    /// Byte range of each line, indexed by list index
    lines: Vec<(usize, usize)>,
}

impl PostingsReader {
    /// Create a reader from the postings file contents
    pub fn new(data: String) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        for (pos, byte) in data.bytes().enumerate() {
            if byte == b'\n' {
                lines.push((start, pos));
                start = pos + 1;
            }
        }
        if start < data.len() {
            lines.push((start, data.len()));
        }
        Self { data, lines }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(fs::read_to_string(path)?))
    }

    /// Number of posting lists
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Load the posting list at `index`
    pub fn get(&self, index: usize) -> Result<PostingList> {
        let &(start, end) = self.lines.get(index).ok_or_else(|| BlockdexError::Dictionary {
            line: index + 1,
            reason: format!("postings file has no list {}", index),
        })?;
        decode_line(&self.data[start..end], index)
    }

    /// Number of term posting lists, not counting the trailing document list
    pub fn list_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    /// The trailing line: every document id of the corpus, ascending
    pub fn documents(&self) -> Result<PostingList> {
        match self.lines.len() {
            0 => Err(BlockdexError::Dictionary {
                line: 1,
                reason: "postings file has no document list".to_string(),
            }),
            n => self.get(n - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_merge_postings() {
        assert_eq!(merge_postings(&[1, 3, 5], &[2, 3, 6]), vec![1, 2, 3, 5, 6]);
        assert_eq!(merge_postings(&[], &[4, 9]), vec![4, 9]);
        assert_eq!(merge_postings(&[4, 9], &[]), vec![4, 9]);
        assert!(merge_postings(&[], &[]).is_empty());
    }

    #[test]
    fn test_intersect() {
        assert_eq!(intersect(&[1, 2, 3, 7, 9], &[2, 7, 8, 9, 10]), vec![2, 7, 9]);
        assert!(intersect(&[1, 2], &[3, 4]).is_empty());
        assert!(intersect(&[], &[1]).is_empty());
    }

    #[test]
    fn test_difference_and_complement() {
        assert_eq!(difference(&[1, 2, 3, 4], &[2, 4, 6]), vec![1, 3]);
        assert_eq!(difference(&[1, 2], &[]), vec![1, 2]);
        assert_eq!(complement(&[1, 2, 3], &[1, 2]), vec![3]);
        assert!(complement(&[], &[1]).is_empty());
    }

    #[test]
    fn test_line_codec() {
        assert_eq!(encode_line(&[1, 20, 300]), "1 20 300");
        assert_eq!(encode_line(&[]), "");
        assert_eq!(decode_line("1 20 300", 0).unwrap(), vec![1, 20, 300]);
        assert!(decode_line("", 0).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_lines() {
        assert!(decode_line("1 x 3", 0).is_err());
        let err = decode_line("5 3", 4).unwrap_err();
        assert!(matches!(err, BlockdexError::Dictionary { line: 5, .. }));
    }

    #[test]
    fn test_postings_reader() {
        let reader = PostingsReader::new("3\n1 2\n1 3\n1 2 3 4\n".to_string());

        assert_eq!(reader.len(), 4);
        assert_eq!(reader.list_count(), 3);
        assert_eq!(reader.get(1).unwrap(), vec![1, 2]);
        assert!(reader.get(4).is_err());
        assert_eq!(reader.documents().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_postings_has_no_document_list() {
        let reader = PostingsReader::new(String::new());
        assert_eq!(reader.list_count(), 0);
        assert!(reader.documents().is_err());

        let reader = PostingsReader::new("\n".to_string());
        assert_eq!(reader.list_count(), 0);
        assert!(reader.documents().unwrap().is_empty());
    }

    #[test]
    fn test_postings_reader_without_trailing_newline() {
        let reader = PostingsReader::new("3\n1 2".to_string());
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.get(1).unwrap(), vec![1, 2]);
    }

    fn sorted_ids() -> impl Strategy<Value = Vec<DocId>> {
        prop::collection::btree_set(0u32..200, 0..40).prop_map(|s| s.into_iter().collect())
    }

    proptest! {
        #[test]
        fn merge_postings_is_sorted_union(a in sorted_ids(), b in sorted_ids()) {
            let merged = merge_postings(&a, &b);
            prop_assert!(is_strictly_ascending(&merged));

            let mut expected: Vec<DocId> = a.iter().chain(b.iter()).copied().collect();
            expected.sort_unstable();
            expected.dedup();
            prop_assert_eq!(merged, expected);
        }

        #[test]
        fn intersect_is_commutative_subset(a in sorted_ids(), b in sorted_ids()) {
            let ab = intersect(&a, &b);
            prop_assert_eq!(&ab, &intersect(&b, &a));
            prop_assert!(ab.iter().all(|id| a.contains(id) && b.contains(id)));
            prop_assert!(is_strictly_ascending(&ab));
        }

        #[test]
        fn difference_equals_and_with_complement(
            a in sorted_ids(),
            b in sorted_ids(),
            extra in sorted_ids(),
        ) {
            let universe = merge_postings(&merge_postings(&a, &b), &extra);
            let fused = difference(&a, &b);
            let expanded = intersect(&a, &complement(&universe, &b));
            prop_assert_eq!(fused, expanded);
        }

        #[test]
        fn union_with_complement_is_universe(a in sorted_ids(), extra in sorted_ids()) {
            let universe = merge_postings(&a, &extra);
            prop_assert_eq!(merge_postings(&a, &complement(&universe, &a)), universe);
            prop_assert_eq!(merge_postings(&a, &a), a);
        }
    }
}
