//! Text normalization: raw document text to ordered index terms

mod tokenizer;

pub use tokenizer::{language_support, Normalizer, Tokenizer};
