use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::BlockdexError;
use crate::tokenizer::language_support;
use crate::Result;

/// Default number of documents per block
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Tokenizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    /// Drop tokens containing anything other than alphabetic characters
    pub alphabetic_only: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
    /// Stemmer and stopword language, e.g. "english" or "french"
    pub language: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: false,
            stem: true,
            alphabetic_only: true,
            min_token_length: 1,
            max_token_length: 64,
            language: "english".to_string(),
        }
    }
}

impl TokenizerConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if language_support(&self.language).is_none() {
            return Err(BlockdexError::Config(format!(
                "unsupported tokenizer language '{}'",
                self.language
            )));
        }
        if self.min_token_length > self.max_token_length {
            return Err(BlockdexError::Config(
                "min token length exceeds max token length".to_string(),
            ));
        }
        Ok(())
    }
}

/// Order in which pending blocks are paired during the merge phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Merge the two oldest pending blocks and append the result to the queue
    Fifo,
    /// Merge the two smallest pending blocks first
    SmallestFirst,
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::Fifo
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = BlockdexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(MergeStrategy::Fifo),
            "smallest-first" | "smallest_first" => Ok(MergeStrategy::SmallestFirst),
            other => Err(BlockdexError::Config(format!(
                "unknown merge strategy '{}'",
                other
            ))),
        }
    }
}

/// Index build configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Documents per block
    pub block_size: usize,
    /// Number of block-building (and merging) workers
    pub workers: usize,
    /// Directory for intermediate blocks; a temporary directory next to
    /// the dictionary file is used when unset
    pub scratch_dir: Option<PathBuf>,
    pub merge_strategy: MergeStrategy,
    pub tokenizer_config: TokenizerConfig,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: 1,
            scratch_dir: None,
            merge_strategy: MergeStrategy::default(),
            tokenizer_config: TokenizerConfig::default(),
        }
    }
}

impl IndexSettings {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    pub fn with_tokenizer_config(mut self, config: TokenizerConfig) -> Self {
        self.tokenizer_config = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BlockdexError::Config(
                "block size must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(BlockdexError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.tokenizer_config.validate()
    }
}

/// Query run configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Number of threads evaluating query lines
    pub workers: usize,
    /// Per-query evaluation deadline; `None` disables it
    pub query_deadline: Option<Duration>,
    pub tokenizer_config: TokenizerConfig,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            query_deadline: None,
            tokenizer_config: TokenizerConfig::default(),
        }
    }
}

impl SearchSettings {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_query_deadline(mut self, deadline: Duration) -> Self {
        self.query_deadline = Some(deadline);
        self
    }

    pub fn with_tokenizer_config(mut self, config: TokenizerConfig) -> Self {
        self.tokenizer_config = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BlockdexError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        self.tokenizer_config.validate()
    }
}
