// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Keeps exactly one tokenizer per checkpoint directory.
//
// A fresh training run installs its tokenizer, replacing any stored one:
//   - a tokenizer file was supplied → copy it in
//   - otherwise                     → build a word-level tokenizer from
//                                     the corpus and write it
// A resumed run loads the stored tokenizer and refuses a supplied file
// that differs from it.
//
// The built tokenizer JSON is written by hand in HuggingFace format.
// Words are counted with the same normalizer and pre-tokenizer the
// tokenizer applies when encoding. Its special tokens:
//   <|endoftext|> = 0   (text separator and padding)
//   [UNK]         = 1
//
// Reference: HuggingFace tokenizers JSON format

use anyhow::{anyhow, bail, Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokenizers::{
    normalizers::Lowercase,
    pre_tokenizers::whitespace::Whitespace,
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

use crate::domain::EOS_TOKEN;

const TOKENIZER_FILE: &str = "tokenizer.json";
const UNK_TOKEN:      &str = "[UNK]";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Install the tokenizer for a fresh run, replacing any stored one.
    pub fn install(
        &self,
        texts:     &[String],
        source:    Option<&Path>,
        max_vocab: usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        if self.path().exists() {
            tracing::info!("Replacing the tokenizer stored in '{}'", self.dir.display());
        }

        match source {
            Some(src) => {
                tracing::info!("Installing tokenizer from '{}'", src.display());
                std::fs::copy(src, self.path())
                    .with_context(|| format!("Cannot copy tokenizer from '{}'", src.display()))?;
            }
            None => {
                tracing::info!("Building word-level tokenizer (max_vocab={})", max_vocab);
                let json = tokenizer_json(texts, max_vocab)?;
                std::fs::write(self.path(), json).with_context(|| {
                    format!("Cannot write tokenizer JSON to '{}'", self.path().display())
                })?;
            }
        }
        self.load()
    }

    /// Load the stored tokenizer of a resumed run.
    /// A supplied `source` must be identical to the stored file.
    pub fn load_matching(&self, source: Option<&Path>) -> Result<Tokenizer> {
        if let Some(src) = source {
            let stored = std::fs::read(self.path())
                .with_context(|| format!("Cannot read '{}'", self.path().display()))?;
            let given = std::fs::read(src)
                .with_context(|| format!("Cannot read '{}'", src.display()))?;
            if stored != given {
                bail!(
                    "Tokenizer '{}' differs from the one this checkpoint was trained with ('{}')",
                    src.display(),
                    self.path().display()
                );
            }
        }
        self.load()
    }

    /// Load a previously saved tokenizer from the checkpoint directory
    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer_file(&self.path())
    }
}

pub fn load_tokenizer_file(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Word-level tokenizer built in memory, nothing is written to disk.
pub fn build_tokenizer(texts: &[String], max_vocab: usize) -> Result<Tokenizer> {
    let json = tokenizer_json(texts, max_vocab)?;
    Tokenizer::from_str(&json).map_err(|e| anyhow!("Cannot build tokenizer: {e}"))
}

fn tokenizer_json(texts: &[String], max_vocab: usize) -> Result<String> {
    // ── Step 1: Word frequencies ──────────────────────────────────────────
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in pre_tokenize(text)? {
            *freq.entry(word).or_insert(0) += 1;
        }
    }

    // Most frequent first; ties broken alphabetically so the ids are
    // the same on every run
    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(max_vocab.saturating_sub(2));

    // ── Step 2: Vocab JSON ────────────────────────────────────────────────
    let mut vocab = serde_json::Map::new();
    vocab.insert(EOS_TOKEN.to_string(), serde_json::json!(0));
    vocab.insert(UNK_TOKEN.to_string(), serde_json::json!(1));
    for (id, (word, _)) in words.iter().enumerate() {
        vocab.insert(word.clone(), serde_json::json!(id + 2));
    }
    tracing::info!("Tokenizer vocabulary has {} entries", vocab.len());

    // ── Step 3: Tokenizer JSON in HuggingFace format ──────────────────────
    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": EOS_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "Lowercase"
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    });

    Ok(serde_json::to_string_pretty(&tokenizer_json)?)
}

/// Split text into the words the built tokenizer will look up: the
/// `Lowercase` normalizer followed by the `Whitespace` pre-tokenizer.
/// The EOS marker is removed first since it is matched as a special
/// token before normalization.
fn pre_tokenize(text: &str) -> Result<Vec<String>> {
    let mut pre = PreTokenizedString::from(text.replace(EOS_TOKEN, " "));
    pre.normalize(|s| Lowercase.normalize(s))
        .map_err(|e| anyhow!("Normalization error: {e}"))?;
    Whitespace::default()
        .pre_tokenize(&mut pre)
        .map_err(|e| anyhow!("Pre-tokenization error: {e}"))?;

    Ok(pre
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .collect())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_tokenize_splits_punctuation() {
        assert_eq!(pre_tokenize("Hello, World!!").unwrap(), vec!["hello", ",", "world", "!!"]);
        assert_eq!(pre_tokenize("it's   fine").unwrap(), vec!["it", "'", "s", "fine"]);
    }

    #[test]
    fn test_combining_marks_stay_inside_words() {
        let texts = vec!["nai\u{308}ve plan".to_string()];
        let tok   = build_tokenizer(&texts, 100).unwrap();

        let enc = tok.encode("nai\u{308}ve plan", false).unwrap();
        assert_eq!(enc.get_ids().len(), 2);
        assert!(!enc.get_ids().contains(&1));
    }

    #[test]
    fn test_built_tokenizer_round_trips_words() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts = vec!["Police hunt crash".to_string(), "crash, again".to_string()];
        let tok   = store.install(&texts, None, 100).unwrap();

        assert_eq!(tok.token_to_id(EOS_TOKEN), Some(0));
        assert_eq!(tok.token_to_id(UNK_TOKEN), Some(1));
        // "crash" is the most frequent word
        assert_eq!(tok.token_to_id("crash"), Some(2));

        let enc = tok.encode("police crash", false).unwrap();
        assert_eq!(enc.get_ids().len(), 2);
        assert!(!enc.get_ids().contains(&1));

        let unknown = tok.encode("zebra", false).unwrap();
        assert_eq!(unknown.get_ids(), &[1]);
    }

    #[test]
    fn test_max_vocab_limits_words() {
        let texts = vec!["a a a b b c".to_string()];
        let tok   = build_tokenizer(&texts, 4).unwrap();

        assert!(tok.token_to_id("a").is_some());
        assert!(tok.token_to_id("b").is_some());
        assert!(tok.token_to_id("c").is_none());
    }

    #[test]
    fn test_build_in_memory_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        build_tokenizer(&["words".to_string()], 100).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_install_replaces_stored_tokenizer() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.install(&["first corpus".to_string()], None, 100).unwrap();

        let again = store.install(&["other words".to_string()], None, 100).unwrap();
        assert!(again.token_to_id("first").is_none());
        assert!(again.token_to_id("other").is_some());
    }

    #[test]
    fn test_supplied_tokenizer_replaces_stored_one() {
        let src_dir = tempfile::tempdir().unwrap();
        TokenizerStore::new(src_dir.path())
            .install(&["brand new".to_string()], None, 100)
            .unwrap();

        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.install(&["old words".to_string()], None, 100).unwrap();

        let tok = store
            .install(&[], Some(&src_dir.path().join(TOKENIZER_FILE)), 100)
            .unwrap();
        assert!(tok.token_to_id("brand").is_some());
        assert!(tok.token_to_id("old").is_none());
        assert!(store.load().unwrap().token_to_id("brand").is_some());
    }

    #[test]
    fn test_resume_rejects_a_different_tokenizer() {
        let other = tempfile::tempdir().unwrap();
        TokenizerStore::new(other.path())
            .install(&["different".to_string()], None, 100)
            .unwrap();

        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.install(&["stored words".to_string()], None, 100).unwrap();

        assert!(store.load_matching(None).is_ok());
        assert!(store.load_matching(Some(&dir.path().join(TOKENIZER_FILE))).is_ok());
        assert!(store.load_matching(Some(&other.path().join(TOKENIZER_FILE))).is_err());
    }
}
