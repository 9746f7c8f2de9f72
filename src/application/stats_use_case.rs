// ============================================================
// Layer 2 - StatsUseCase
// ============================================================
// Describes a corpus before training on it: how many texts, how many
// distinct tokens, and how long the texts are. The length histogram
// helps choose a block size no larger than the longest text.
//
// Uses a supplied tokenizer file, or builds the same word-level
// tokenizer `train` would build, in memory. Nothing is written.

use std::{fmt, path::Path};

use anyhow::{bail, Result};

use crate::data::{encoder::encode_corpus, loader::CsvTextLoader};
use crate::domain::{corpus::LengthBin, traits::TextSource};
use crate::infra::tokenizer_store::{build_tokenizer, load_tokenizer_file};

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub data_path:      String,
    pub text_column:    String,
    pub tokenizer_path: Option<String>,
    pub max_vocab:      usize,
    pub bins:           usize,
}

#[derive(Debug, Clone)]
pub struct CorpusStats {
    pub texts:           usize,
    pub tokens:          usize,
    pub distinct_tokens: usize,
    pub longest_text:    usize,
    pub histogram:       Vec<LengthBin>,
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of texts:           {}", self.texts)?;
        writeln!(f, "Number of tokens:          {}", self.tokens)?;
        writeln!(f, "Number of distinct tokens: {}", self.distinct_tokens)?;
        writeln!(f, "Longest text (tokens):     {}", self.longest_text)?;
        writeln!(f)?;
        writeln!(f, "Text length histogram:")?;

        let peak = self.histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for bin in &self.histogram {
            let bar = "#".repeat((bin.count * 50).div_ceil(peak));
            writeln!(f, "  [{:>7.1}, {:>7.1})  {:>8}  {}", bin.lo, bin.hi, bin.count, bar)?;
        }
        Ok(())
    }
}

pub struct StatsUseCase {
    config: StatsConfig,
}

impl StatsUseCase {
    pub fn new(config: StatsConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<CorpusStats> {
        let cfg = &self.config;

        let texts = CsvTextLoader::new(&cfg.data_path, &cfg.text_column).load_texts()?;
        if texts.is_empty() {
            bail!("No texts found in column '{}' of '{}'", cfg.text_column, cfg.data_path);
        }

        let tokenizer = match cfg.tokenizer_path.as_deref() {
            Some(path) => load_tokenizer_file(Path::new(path))?,
            None       => build_tokenizer(&texts, cfg.max_vocab)?,
        };
        let corpus = encode_corpus(&texts, &tokenizer, None)?;

        Ok(CorpusStats {
            texts:           corpus.text_count(),
            tokens:          corpus.token_count(),
            distinct_tokens: corpus.vocab.len(),
            longest_text:    corpus.longest_text(),
            histogram:       corpus.length_histogram(cfg.bins),
        })
    }
}
