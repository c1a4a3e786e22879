//! Query runner: queries file in, results file out
//!
//! The finalized index is immutable, so one `SearchIndex` is shared by
//! reference across every query and every worker thread.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::SearchSettings;
use crate::error::BlockdexError;
use crate::index::{
    merge_postings, DocId, IndexWriter, PartialIndex, PostingList, PostingsReader, TermDictionary,
};
use crate::query::{QueryContext, QueryParser};
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Read-only dictionary, postings and document universe
pub struct SearchIndex {
    dictionary: TermDictionary,
    postings: PostingsReader,
    /// Every document id of the corpus, used as the complement base for NOT
    universe: PostingList,
}

impl SearchIndex {
    /// Open a dictionary file and its postings file
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(dictionary: P, postings: Q) -> Result<Self> {
        let dictionary = TermDictionary::open(dictionary)?;
        let postings = PostingsReader::open(postings)?;
        Self::from_parts(dictionary, postings)
    }

    /// Check the two files agree and load the document list
    ///
    /// The postings file holds one line per dictionary term plus the
    /// trailing document list.
    pub fn from_parts(dictionary: TermDictionary, postings: PostingsReader) -> Result<Self> {
        let lists = postings.list_count();
        if postings.is_empty() || lists != dictionary.len() {
            return Err(BlockdexError::Dictionary {
                line: postings.len(),
                reason: format!(
                    "postings file has {} lines for {} terms plus the document list",
                    postings.len(),
                    dictionary.len()
                ),
            });
        }
        if let Some(max) = dictionary.max_list_index() {
            if max >= lists {
                return Err(BlockdexError::Dictionary {
                    line: max + 1,
                    reason: format!(
                        "dictionary references list {} but postings has {} lists",
                        max, lists
                    ),
                });
            }
        }

        let universe = postings.documents()?;
        info!(
            terms = dictionary.len(),
            documents = universe.len(),
            "index loaded"
        );

        Ok(Self {
            dictionary,
            postings,
            universe,
        })
    }

    /// Build an in-memory index through the on-disk text format
    ///
    /// Without a document directory, the universe is every id that appears
    /// in some posting list.
    pub fn from_partial(index: &PartialIndex) -> Result<Self> {
        let documents = index
            .entries()
            .iter()
            .fold(PostingList::new(), |acc, (_, list)| merge_postings(&acc, list));

        let mut writer = IndexWriter::new(Vec::new(), Vec::new());
        writer.write_index(index)?;
        writer.write_documents(&documents)?;
        let (dictionary, postings, _) = writer.finish()?;

        let to_text = |bytes: Vec<u8>| {
            String::from_utf8(bytes).map_err(|e| BlockdexError::Dictionary {
                line: 0,
                reason: e.to_string(),
            })
        };
        let dictionary = TermDictionary::parse(&to_text(dictionary)?)?;
        let postings = PostingsReader::new(to_text(postings)?);
        Self::from_parts(dictionary, postings)
    }

    /// Postings for a term; a term not in the dictionary matches nothing
    pub fn postings(&self, term: &str) -> Result<PostingList> {
        match self.dictionary.get(term) {
            Some(list_index) => self.postings.get(list_index),
            None => Ok(PostingList::new()),
        }
    }

    pub fn universe(&self) -> &[DocId] {
        &self.universe
    }

    pub fn term_count(&self) -> usize {
        self.dictionary.len()
    }
}

/// Counts reported after a query run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub queries: usize,
    pub blank: usize,
    pub failed: usize,
}

/// Outcome of a single query line
enum LineResult {
    Blank,
    Matched(PostingList),
    Failed,
}

/// Evaluates query lines against a shared index
pub struct QueryRunner<'a> {
    index: &'a SearchIndex,
    tokenizer: Tokenizer,
    settings: SearchSettings,
}

impl<'a> QueryRunner<'a> {
    pub fn new(index: &'a SearchIndex, settings: SearchSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            index,
            tokenizer: Tokenizer::new(&settings.tokenizer_config),
            settings,
        })
    }

    /// Parse and evaluate one query; `line` is 1-based
    pub fn evaluate(&self, line: usize, query: &str) -> Result<PostingList> {
        let postfix = QueryParser::new(&self.tokenizer).parse(query)?;

        let mut ctx = QueryContext::new(self.index, line);
        if let Some(budget) = self.settings.query_deadline {
            ctx = ctx.with_deadline(budget);
        }
        ctx.evaluate(&postfix)
    }

    /// Run a queries file and write the results file
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, queries: P, results: Q) -> Result<RunStats> {
        let contents = fs::read_to_string(queries)?;
        let lines: Vec<&str> = contents.lines().collect();
        info!(queries = lines.len(), workers = self.settings.workers, "running queries");

        let (blocks, stats) = self.run_lines(&lines)?;
        fs::write(results, blocks.join("\n"))?;

        info!(
            queries = stats.queries,
            blank = stats.blank,
            failed = stats.failed,
            "queries complete"
        );
        Ok(stats)
    }

    /// Render one result block per query line, in input order
    ///
    /// Per-query errors are logged and leave an empty block; anything else
    /// (such as a corrupt postings file) aborts the run.
    pub fn run_lines(&self, lines: &[&str]) -> Result<(Vec<String>, RunStats)> {
        let results = if self.settings.workers > 1 && lines.len() > 1 {
            self.run_parallel(lines)?
        } else {
            lines
                .iter()
                .enumerate()
                .map(|(i, query)| self.run_line(i + 1, query))
                .collect::<Result<Vec<_>>>()?
        };

        let mut stats = RunStats {
            queries: lines.len(),
            ..RunStats::default()
        };
        let blocks = results
            .into_iter()
            .map(|result| match result {
                LineResult::Blank => {
                    stats.blank += 1;
                    String::new()
                }
                LineResult::Failed => {
                    stats.failed += 1;
                    String::new()
                }
                LineResult::Matched(ids) => render_block(&ids),
            })
            .collect();

        Ok((blocks, stats))
    }

    fn run_line(&self, line: usize, query: &str) -> Result<LineResult> {
        if query.trim().is_empty() {
            return Ok(LineResult::Blank);
        }
        match self.evaluate(line, query) {
            Ok(ids) => Ok(LineResult::Matched(ids)),
            Err(e) if e.is_per_query() => {
                warn!(line, query, "query failed: {}", e);
                Ok(LineResult::Failed)
            }
            Err(e) => Err(e),
        }
    }

    /// Split lines into contiguous chunks, one per worker
    fn run_parallel(&self, lines: &[&str]) -> Result<Vec<LineResult>> {
        let chunk_size = (lines.len() + self.settings.workers - 1) / self.settings.workers;

        let chunks = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = lines
                .chunks(chunk_size)
                .enumerate()
                .map(|(n, chunk)| {
                    s.spawn(move |_| {
                        chunk
                            .iter()
                            .enumerate()
                            .map(|(i, query)| self.run_line(n * chunk_size + i + 1, query))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join())
                .collect::<Vec<_>>()
        })
        .map_err(|_| query_worker_panicked())?;

        let mut results = Vec::with_capacity(lines.len());
        for chunk in chunks {
            results.extend(chunk.map_err(|_| query_worker_panicked())??);
        }
        Ok(results)
    }
}

fn render_block(ids: &[DocId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn query_worker_panicked() -> BlockdexError {
    BlockdexError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "query worker panicked",
    ))
}
