use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crc32fast::Hasher;
use tracing::debug;

use super::types::{BlockId, BlockMeta, PartialIndex};
use crate::error::BlockdexError;
use crate::Result;

const BLOCK_MAGIC: &[u8; 4] = b"BDXB";
const HEADER_LEN: usize = 8;

/// Scratch storage for partial indexes
///
/// Each block lives in its own file and is deleted as soon as it is read
/// back, so the store never holds more than the corpus' worth of postings.
pub struct BlockStore {
    base_dir: PathBuf,
    next_id: AtomicU64,
}

impl BlockStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            next_id: AtomicU64::new(0),
        })
    }

    fn block_path(&self, id: BlockId) -> PathBuf {
        self.base_dir.join(format!("{}.blk", id))
    }

    /// Allocate a fresh block id
    pub fn allocate_id(&self) -> BlockId {
        BlockId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Persist a partial index under a newly allocated id
    pub fn write_block(&self, index: &PartialIndex) -> Result<BlockMeta> {
        let id = self.allocate_id();
        let payload = bincode::serialize(index)?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let checksum = hasher.finalize();

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(BLOCK_MAGIC);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&payload);

        fs::write(self.block_path(id), &bytes).map_err(|source| BlockdexError::BlockIo {
            block: id.to_string(),
            source,
        })?;

        debug!(block = %id, terms = index.len(), bytes = bytes.len(), "wrote block");

        Ok(BlockMeta {
            id,
            term_count: index.len(),
            posting_count: index.posting_count(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Read a block back and delete its scratch file
    ///
    /// A missing or corrupt block is a merge error: nothing downstream can
    /// proceed without it.
    pub fn take_block(&self, meta: &BlockMeta) -> Result<PartialIndex> {
        let path = self.block_path(meta.id);
        let bytes = fs::read(&path).map_err(|e| merge_error(meta.id, read_reason(&e)))?;

        if bytes.len() < HEADER_LEN || &bytes[..4] != BLOCK_MAGIC {
            return Err(merge_error(meta.id, "bad block header".to_string()));
        }

        let mut stored = [0u8; 4];
        stored.copy_from_slice(&bytes[4..HEADER_LEN]);
        let payload = &bytes[HEADER_LEN..];

        let mut hasher = Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != u32::from_le_bytes(stored) {
            return Err(merge_error(meta.id, "checksum mismatch".to_string()));
        }

        let index: PartialIndex = bincode::deserialize(payload)
            .map_err(|e| merge_error(meta.id, format!("undecodable payload: {}", e)))?;

        fs::remove_file(&path).map_err(|source| BlockdexError::BlockIo {
            block: meta.id.to_string(),
            source,
        })?;
        debug!(block = %meta.id, terms = index.len(), "consumed block");

        Ok(index)
    }

    /// Number of block files currently on disk
    pub fn pending_blocks(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "blk") {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn merge_error(id: BlockId, reason: String) -> BlockdexError {
    BlockdexError::Merge {
        block: id.to_string(),
        reason,
    }
}

fn read_reason(err: &io::Error) -> String {
    if err.kind() == io::ErrorKind::NotFound {
        "block file is missing".to_string()
    } else {
        format!("unreadable block: {}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> PartialIndex {
        PartialIndex::from_sorted(vec![
            ("cat".to_string(), vec![1, 2]),
            ("dog".to_string(), vec![1, 3]),
        ])
    }

    #[test]
    fn test_take_block_deletes_file() {
        let tmp = TempDir::new().unwrap();
        let store = BlockStore::new(tmp.path()).unwrap();

        let meta = store.write_block(&sample_index()).unwrap();
        assert_eq!(meta.term_count, 2);
        assert_eq!(meta.posting_count, 4);
        assert_eq!(store.pending_blocks().unwrap(), 1);

        let index = store.take_block(&meta).unwrap();
        assert_eq!(index, sample_index());
        assert_eq!(store.pending_blocks().unwrap(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let tmp = TempDir::new().unwrap();
        let store = BlockStore::new(tmp.path()).unwrap();

        let a = store.write_block(&sample_index()).unwrap();
        let b = store.write_block(&PartialIndex::new()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_missing_block_is_merge_error() {
        let tmp = TempDir::new().unwrap();
        let store = BlockStore::new(tmp.path()).unwrap();

        let meta = store.write_block(&sample_index()).unwrap();
        store.take_block(&meta).unwrap();

        match store.take_block(&meta) {
            Err(BlockdexError::Merge { block, reason }) => {
                assert_eq!(block, meta.id.to_string());
                assert!(reason.contains("missing"));
            }
            other => panic!("expected merge error, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_block_is_merge_error() {
        let tmp = TempDir::new().unwrap();
        let store = BlockStore::new(tmp.path()).unwrap();

        let meta = store.write_block(&sample_index()).unwrap();
        let path = store.block_path(meta.id);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = store.take_block(&meta).unwrap_err();
        assert!(matches!(err, BlockdexError::Merge { .. }));
    }
}
