use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;

/// Boundary between raw text and the index core.
///
/// The core only relies on this contract: text goes in, an ordered sequence
/// of normalized terms comes out. Query terms go through the single-token
/// path so they normalize exactly like indexed text.
pub trait Normalizer: Send + Sync {
    /// Normalize a whole document into its ordered term sequence
    fn normalize(&self, text: &str) -> Vec<String>;

    /// Normalize one query token the way a document containing it would be;
    /// `None` unless that yields exactly one term
    fn normalize_term(&self, token: &str) -> Option<String>;
}

/// Stemmer algorithm and stopword list for a language name
pub fn language_support(name: &str) -> Option<(Algorithm, LANGUAGE)> {
    let support = match name.to_lowercase().as_str() {
        "english" | "en" => (Algorithm::English, LANGUAGE::English),
        "french" | "fr" => (Algorithm::French, LANGUAGE::French),
        "german" | "de" => (Algorithm::German, LANGUAGE::German),
        "spanish" | "es" => (Algorithm::Spanish, LANGUAGE::Spanish),
        "italian" | "it" => (Algorithm::Italian, LANGUAGE::Italian),
        "portuguese" | "pt" => (Algorithm::Portuguese, LANGUAGE::Portuguese),
        "dutch" | "nl" => (Algorithm::Dutch, LANGUAGE::Dutch),
        "swedish" | "sv" => (Algorithm::Swedish, LANGUAGE::Swedish),
        "russian" | "ru" => (Algorithm::Russian, LANGUAGE::Russian),
        _ => return None,
    };
    Some(support)
}

/// Text tokenizer with case folding, stemming and non-alphabetic filtering
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    ///
    /// An unsupported language falls back to English; settings validation
    /// rejects it before a tokenizer is built.
    pub fn new(config: &TokenizerConfig) -> Self {
        let (algorithm, language) = language_support(&config.language).unwrap_or_else(|| {
            warn!("unsupported language '{}', using english", config.language);
            (Algorithm::English, LANGUAGE::English)
        });

        let stemmer = if config.stem {
            Some(Stemmer::create(algorithm))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(language)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Tokenize text into a vector of terms, in document order
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .filter_map(|word| self.analyze(word))
            .collect()
    }

    fn analyze(&self, word: &str) -> Option<String> {
        let mut token = if self.config.lowercase {
            word.to_lowercase()
        } else {
            word.to_string()
        };

        if token.len() < self.config.min_token_length
            || token.len() > self.config.max_token_length
            || self.stopwords.contains(&token)
        {
            return None;
        }

        if let Some(stemmer) = &self.stemmer {
            token = stemmer.stem(&token).into_owned();
        }

        // Numbers and punctuation are dropped on purpose
        if self.config.alphabetic_only && !token.chars().all(char::is_alphabetic) {
            return None;
        }

        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

impl Normalizer for Tokenizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        self.tokenize(text)
    }

    fn normalize_term(&self, token: &str) -> Option<String> {
        let mut terms = self.tokenize(token);
        if terms.len() == 1 {
            terms.pop()
        } else {
            None
        }
    }
}
