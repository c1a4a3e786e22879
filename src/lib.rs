pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod query;
pub mod search;
pub mod tokenizer;

pub use config::{IndexSettings, MergeStrategy, SearchSettings, TokenizerConfig};
pub use error::{BlockdexError, Result};
pub use indexer::{BuildStats, IndexBuilder};
pub use search::{QueryRunner, RunStats, SearchIndex};
pub use tokenizer::{Normalizer, Tokenizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
