use anyhow::{Context, Result};
use blockdex::{
    IndexBuilder, IndexSettings, MergeStrategy, QueryRunner, SearchIndex, SearchSettings,
    TokenizerConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "blockdex")]
#[command(about = "Blocked sort-based inverted index and boolean search", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build dictionary and postings files from a directory of documents
    Index {
        /// Directory of documents named by integer id
        #[arg(short = 'i', long, env = "BLOCKDEX_INPUT_DIR")]
        input_dir: PathBuf,

        /// Dictionary output file
        #[arg(short = 'd', long, env = "BLOCKDEX_DICTIONARY")]
        dictionary: PathBuf,

        /// Postings output file
        #[arg(short = 'p', long, env = "BLOCKDEX_POSTINGS")]
        postings: PathBuf,

        /// Documents per block
        #[arg(long, env = "BLOCKDEX_BLOCK_SIZE", default_value_t = blockdex::config::DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Worker threads for block building and merging (defaults to CPU count)
        #[arg(long, env = "BLOCKDEX_WORKERS")]
        workers: Option<usize>,

        /// Directory for intermediate block files
        #[arg(long, env = "BLOCKDEX_SCRATCH_DIR")]
        scratch_dir: Option<PathBuf>,

        /// Merge order (fifo, smallest-first)
        #[arg(long, env = "BLOCKDEX_MERGE_STRATEGY", default_value = "fifo")]
        merge_strategy: String,

        /// Stemming and stopword language
        #[arg(long, env = "BLOCKDEX_LANGUAGE", default_value = "english")]
        language: String,
    },

    /// Run a queries file against a built index
    Search {
        /// Dictionary file
        #[arg(short = 'd', long, env = "BLOCKDEX_DICTIONARY")]
        dictionary: PathBuf,

        /// Postings file
        #[arg(short = 'p', long, env = "BLOCKDEX_POSTINGS")]
        postings: PathBuf,

        /// Queries file, one query per line
        #[arg(short = 'q', long, env = "BLOCKDEX_QUERIES")]
        queries: PathBuf,

        /// Results output file
        #[arg(short = 'o', long, env = "BLOCKDEX_OUTPUT")]
        output: PathBuf,

        /// Worker threads for query evaluation (defaults to CPU count)
        #[arg(long, env = "BLOCKDEX_WORKERS")]
        workers: Option<usize>,

        /// Per-query time limit in milliseconds
        #[arg(long, env = "BLOCKDEX_DEADLINE_MS")]
        deadline_ms: Option<u64>,

        /// Stemming and stopword language; must match the one used to index
        #[arg(long, env = "BLOCKDEX_LANGUAGE", default_value = "english")]
        language: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("blockdex v{}", blockdex::VERSION);

    match args.command {
        Command::Index {
            input_dir,
            dictionary,
            postings,
            block_size,
            workers,
            scratch_dir,
            merge_strategy,
            language,
        } => {
            let strategy: MergeStrategy = merge_strategy.parse()?;
            let mut settings = IndexSettings::default()
                .with_block_size(block_size)
                .with_workers(workers.unwrap_or_else(num_cpus::get))
                .with_merge_strategy(strategy)
                .with_tokenizer_config(TokenizerConfig::default().with_language(language));
            if let Some(dir) = scratch_dir {
                settings = settings.with_scratch_dir(dir);
            }

            let started = Instant::now();
            let stats = IndexBuilder::new(settings)?
                .build(&input_dir, &dictionary, &postings)
                .with_context(|| format!("indexing {:?} failed", input_dir))?;

            info!(
                documents = stats.documents,
                blocks = stats.blocks,
                merge_steps = stats.merge_steps,
                terms = stats.terms,
                postings = stats.postings,
                "index built in {:?}",
                started.elapsed()
            );
        }
        Command::Search {
            dictionary,
            postings,
            queries,
            output,
            workers,
            deadline_ms,
            language,
        } => {
            let mut settings = SearchSettings::default()
                .with_workers(workers.unwrap_or_else(num_cpus::get))
                .with_tokenizer_config(TokenizerConfig::default().with_language(language));
            if let Some(ms) = deadline_ms {
                settings = settings.with_query_deadline(Duration::from_millis(ms));
            }

            let started = Instant::now();
            let index = SearchIndex::open(&dictionary, &postings)
                .with_context(|| format!("loading index {:?}", dictionary))?;
            let stats = QueryRunner::new(&index, settings)?
                .run(&queries, &output)
                .with_context(|| format!("running queries from {:?}", queries))?;

            info!(
                queries = stats.queries,
                blank = stats.blank,
                failed = stats.failed,
                "results written to {:?} in {:?}",
                output,
                started.elapsed()
            );
        }
    }

    Ok(())
}
