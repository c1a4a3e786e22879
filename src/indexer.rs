//! Index build pipeline: documents directory to dictionary and postings files

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam::channel;
use tracing::{debug, info, warn};

use crate::config::IndexSettings;
use crate::error::BlockdexError;
use crate::index::{BlockBuilder, BlockMerger, BlockMeta, BlockStore, DocId, IndexWriter};
use crate::tokenizer::{Normalizer, Tokenizer};
use crate::Result;

const DEFAULT_SCRATCH_DIR: &str = ".blockdex-blocks";

/// Counts reported after a build
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: usize,
    pub blocks: usize,
    pub merge_steps: usize,
    pub terms: usize,
    pub postings: usize,
}

/// Builds the on-disk index for a directory of documents
pub struct IndexBuilder {
    settings: IndexSettings,
    normalizer: Box<dyn Normalizer>,
}

impl IndexBuilder {
    pub fn new(settings: IndexSettings) -> Result<Self> {
        settings.validate()?;
        let normalizer = Box::new(Tokenizer::new(&settings.tokenizer_config));
        Ok(Self {
            settings,
            normalizer,
        })
    }

    /// Use a custom normalizer instead of the configured tokenizer
    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Run the full build
    pub fn build<P, Q, R>(&self, input_dir: P, dictionary: Q, postings: R) -> Result<BuildStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let input_dir = input_dir.as_ref();
        let doc_ids = list_documents(input_dir)?;
        info!(
            documents = doc_ids.len(),
            block_size = self.settings.block_size,
            workers = self.settings.workers,
            "indexing {}",
            input_dir.display()
        );

        let (scratch_dir, owns_scratch) = match &self.settings.scratch_dir {
            Some(dir) => (dir.clone(), false),
            None => (default_scratch_dir(dictionary.as_ref()), true),
        };
        let store = BlockStore::new(&scratch_dir)?;

        let blocks: Vec<&[DocId]> = doc_ids.chunks(self.settings.block_size).collect();
        let metas = if self.settings.workers > 1 && blocks.len() > 1 {
            self.build_blocks_parallel(input_dir, &blocks, &store)?
        } else {
            blocks
                .iter()
                .enumerate()
                .map(|(n, ids)| self.build_block(input_dir, n, ids, &store))
                .collect::<Result<Vec<_>>>()?
        };

        let outcome = BlockMerger::new(&store, self.settings.merge_strategy)
            .with_workers(self.settings.workers)
            .merge_all(metas)?;

        let mut writer = IndexWriter::create(dictionary, postings)?;
        writer.write_index(&outcome.index)?;
        writer.write_documents(&doc_ids)?;
        let (_, _, written) = writer.finish()?;

        if owns_scratch {
            if let Err(e) = fs::remove_dir(&scratch_dir) {
                warn!("could not remove scratch directory {:?}: {}", scratch_dir, e);
            }
        }

        Ok(BuildStats {
            documents: doc_ids.len(),
            blocks: blocks.len(),
            merge_steps: outcome.steps,
            terms: written.terms,
            postings: written.postings,
        })
    }

    /// Index one block of documents and spill it to the store
    fn build_block(
        &self,
        input_dir: &Path,
        block_no: usize,
        doc_ids: &[DocId],
        store: &BlockStore,
    ) -> Result<BlockMeta> {
        let mut builder = BlockBuilder::new();

        for &doc_id in doc_ids {
            let path = input_dir.join(doc_id.to_string());
            let bytes =
                fs::read(&path).map_err(|source| BlockdexError::DocumentRead { doc_id, source })?;
            let text = String::from_utf8_lossy(&bytes);
            builder.index_text(doc_id, &text, self.normalizer.as_ref())?;
        }

        debug!(
            block = block_no,
            documents = builder.doc_count(),
            terms = builder.term_count(),
            "built block"
        );
        store.write_block(&builder.finish())
    }

    /// Fan blocks out to a pool of scoped workers
    ///
    /// Each block touches only its own documents and scratch file, so the
    /// workers share nothing mutable. Results come back in block order.
    fn build_blocks_parallel(
        &self,
        input_dir: &Path,
        blocks: &[&[DocId]],
        store: &BlockStore,
    ) -> Result<Vec<BlockMeta>> {
        let (job_tx, job_rx) = channel::unbounded::<(usize, &[DocId])>();
        let (result_tx, result_rx) = channel::unbounded::<(usize, Result<BlockMeta>)>();

        for job in blocks.iter().copied().enumerate() {
            // Receiver is alive until the scope below ends
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let workers = self.settings.workers.min(blocks.len());
        let mut results = crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                s.spawn(move |_| {
                    while let Ok((block_no, ids)) = job_rx.recv() {
                        let result = self.build_block(input_dir, block_no, ids, store);
                        if result_tx.send((block_no, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);
            result_rx.iter().collect::<Vec<_>>()
        })
        .map_err(|_| BlockdexError::BlockIo {
            block: "worker".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "block worker panicked"),
        })?;

        results.sort_by_key(|(block_no, _)| *block_no);
        results.into_iter().map(|(_, meta)| meta).collect()
    }
}

/// Document ids in the input directory, ascending
///
/// A document file is named by its id in plain decimal: ASCII digits only,
/// no sign, no leading zeros, greater than zero. Anything else is skipped.
pub fn list_documents(input_dir: &Path) -> Result<Vec<DocId>> {
    let mut ids = Vec::new();

    for entry in fs::read_dir(input_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().and_then(parse_doc_id) {
            Some(id) => ids.push(id),
            None => warn!("skipping non-document entry {:?}", name),
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

fn parse_doc_id(name: &str) -> Option<DocId> {
    if name.is_empty() || name.starts_with('0') || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

fn default_scratch_dir(dictionary: &Path) -> PathBuf {
    dictionary
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_SCRATCH_DIR)
}
