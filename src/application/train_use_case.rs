// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load texts from CSV              (Layer 4 - data)
//   Step 2: Install or reload tokenizer      (Layer 6 - infra)
//   Step 3: Encode corpus into one stream    (Layer 4 - data)
//   Step 4: Save config and vocabulary       (Layer 6 - infra)
//   Step 5: Build data loaders               (Layer 4 - data)
//   Step 6: Run training loop                (Layer 5 - ml)
//
// With `resume`, the configuration and vocabulary saved in the
// checkpoint directory are authoritative so the restored weights fit
// the rebuilt model.

use std::path::Path;

use anyhow::{bail, Result};
use burn::{backend::Autodiff, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::data::{
    construct_data_loaders,
    encoder::encode_corpus,
    loader::CsvTextLoader,
    LoaderSettings,
};
use crate::domain::{corpus::TokenCorpus, traits::TextSource};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    cpu_device, gpu_device,
    model::GptConfig,
    plateau::PlateauConfig,
    trainer::{run_training, LoopSettings, TrainReport},
    CpuBackend, DeviceKind, GpuBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoint and reloaded
// on --resume or for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      String,
    pub text_column:    String,
    pub tokenizer_path: Option<String>,
    pub checkpoint_dir: String,
    pub max_vocab:      usize,
    pub split:          f64,
    pub block_size:     usize,
    pub batch_size:     usize,
    pub val_batch_size: usize,
    pub epoch_steps:    usize,
    pub eval_interval:  usize,
    pub lr:             f64,
    pub weight_decay:   f64,
    pub n_embd:         usize,
    pub n_heads:        usize,
    pub n_layers:       usize,
    pub ffn_hidden:     usize,
    pub dropout:        f64,
    pub num_workers:    usize,
    pub seed:           u64,
    pub max_epochs:     Option<usize>,
    pub device:         DeviceKind,
    #[serde(default)]
    pub plateau:        PlateauConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      "data/headlines.csv".to_string(),
            text_column:    "headline_text".to_string(),
            tokenizer_path: None,
            checkpoint_dir: "checkpoints".to_string(),
            max_vocab:      30_000,
            split:          0.9,
            block_size:     64,
            batch_size:     64,
            val_batch_size: 8,
            epoch_steps:    32_000,
            eval_interval:  100,
            lr:             3e-4,
            weight_decay:   0.01,
            n_embd:         128,
            n_heads:        4,
            n_layers:       4,
            ffn_hidden:     512,
            dropout:        0.1,
            num_workers:    4,
            seed:           42,
            max_epochs:     None,
            device:         DeviceKind::Gpu,
            plateau:        PlateauConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Model architecture for a vocabulary of `vocab_size` compact ids.
    pub fn gpt_config(&self, vocab_size: usize, dropout: f64) -> GptConfig {
        GptConfig::new(
            vocab_size, self.block_size, self.n_embd,
            self.n_heads, self.n_layers, self.ffn_hidden, dropout,
        )
    }

    fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            split:          self.split,
            block_size:     self.block_size,
            batch_size:     self.batch_size,
            val_batch_size: self.val_batch_size,
            epoch_steps:    self.epoch_steps,
            num_workers:    self.num_workers,
            seed:           self.seed,
        }
    }

    fn loop_settings(&self, vocab_size: usize, resume: bool) -> LoopSettings {
        LoopSettings {
            model:         self.gpt_config(vocab_size, self.dropout),
            lr:            self.lr,
            weight_decay:  self.weight_decay,
            eval_interval: self.eval_interval,
            plateau:       self.plateau,
            max_epochs:    self.max_epochs,
            seed:          self.seed,
            resume,
        }
    }

    /// Check the values no later stage can recover from.
    pub fn validate(&self) -> Result<()> {
        if !(self.split > 0.0 && self.split < 1.0) {
            bail!("split must be strictly between 0 and 1, got {}", self.split);
        }
        if self.block_size == 0 || self.batch_size == 0 || self.val_batch_size == 0 {
            bail!("block_size, batch_size and val_batch_size must be positive");
        }
        if self.epoch_steps == 0 || self.eval_interval == 0 {
            bail!("epoch_steps and eval_interval must be positive");
        }
        if self.n_heads == 0 || self.n_embd % self.n_heads != 0 {
            bail!("n_embd ({}) must be divisible by n_heads ({})", self.n_embd, self.n_heads);
        }
        if self.plateau.decay_factor <= 1.0 {
            bail!("lr decay factor must be greater than 1");
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    resume: bool,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, resume: bool) -> Self {
        Self { config, resume }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let ckpt = CheckpointManager::new(&self.config.checkpoint_dir);

        // ── Resolve the effective configuration ───────────────────────────────
        let cfg = if self.resume {
            if !ckpt.has_checkpoint() {
                bail!(
                    "No checkpoint found in '{}' to resume from",
                    self.config.checkpoint_dir
                );
            }
            let saved = ckpt.load_config()?;
            tracing::info!("Resuming with the configuration saved in '{}'", ckpt.dir().display());
            // runtime-only settings still come from the command line;
            // a tokenizer given here is only checked against the stored one
            TrainConfig {
                checkpoint_dir: self.config.checkpoint_dir.clone(),
                tokenizer_path: self.config.tokenizer_path.clone(),
                device:         self.config.device,
                num_workers:    self.config.num_workers,
                max_epochs:     self.config.max_epochs,
                ..saved
            }
        } else {
            if ckpt.has_checkpoint() {
                tracing::warn!(
                    "'{}' already holds a checkpoint; it will be overwritten (use --resume to continue it)",
                    ckpt.dir().display()
                );
            }
            self.config.clone()
        };
        cfg.validate()?;

        // ── Step 1: Load texts ────────────────────────────────────────────────
        let texts = CsvTextLoader::new(&cfg.data_path, &cfg.text_column).load_texts()?;
        if texts.is_empty() {
            bail!("No texts found in column '{}' of '{}'", cfg.text_column, cfg.data_path);
        }

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let store  = TokenizerStore::new(&cfg.checkpoint_dir);
        let source = cfg.tokenizer_path.as_deref().map(Path::new);
        let tokenizer = if self.resume {
            store.load_matching(source)?
        } else {
            store.install(&texts, source, cfg.max_vocab)?
        };

        // ── Step 3: Encode corpus ─────────────────────────────────────────────
        let saved_vocab = if self.resume { Some(ckpt.load_vocab()?) } else { None };
        let corpus      = encode_corpus(&texts, &tokenizer, saved_vocab.as_ref())?;
        tracing::info!(
            "Corpus: {} texts, {} tokens, {} distinct tokens",
            corpus.text_count(),
            corpus.token_count(),
            corpus.vocab.len()
        );
        if corpus.longest_text() + 1 > cfg.block_size {
            tracing::info!(
                "Longest text has {} tokens; windows of {} will cut it",
                corpus.longest_text(),
                cfg.block_size
            );
        }

        // ── Step 4: Persist config and vocabulary ─────────────────────────────
        ckpt.save_config(&cfg)?;
        ckpt.save_vocab(&corpus.vocab)?;

        // ── Steps 5-6: Loaders and training on the chosen backend ─────────────
        let report = match cfg.device {
            DeviceKind::Gpu => {
                tracing::info!("Using WGPU device");
                train_on::<Autodiff<GpuBackend>>(&cfg, &corpus, &ckpt, gpu_device(), self.resume)?
            }
            DeviceKind::Cpu => {
                tracing::info!("Using NdArray CPU device");
                train_on::<Autodiff<CpuBackend>>(&cfg, &corpus, &ckpt, cpu_device(), self.resume)?
            }
        };

        tracing::info!(
            "Training finished after {} steps ({} epochs), final lr {:.4e}",
            report.steps,
            report.epochs,
            report.final_lr
        );
        Ok(report)
    }
}

fn train_on<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    corpus: &TokenCorpus,
    ckpt:   &CheckpointManager,
    device: B::Device,
    resume: bool,
) -> Result<TrainReport> {
    let (train_loader, val_loader) = construct_data_loaders::<B>(
        &corpus.ids,
        corpus.vocab.eos_id(),
        &cfg.loader_settings(),
        &device,
    )?;

    run_training::<B>(
        &cfg.loop_settings(corpus.vocab.len(), resume),
        train_loader,
        val_loader,
        ckpt,
        &device,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::application::generate_use_case::{GenerateConfig, GenerateUseCase};

    const WORDS: [&str; 8] = ["council", "rain", "mayor", "bridge", "opens", "storm", "new", "school"];

    fn write_corpus(dir: &Path) -> String {
        let path  = dir.join("headlines.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "publish_date,headline_text").unwrap();
        for i in 0..60 {
            let a = WORDS[i % WORDS.len()];
            let b = WORDS[(i * 3 + 1) % WORDS.len()];
            writeln!(f, "2010{:04},{} {} {}", i, a, b, WORDS[(i + 2) % WORDS.len()]).unwrap();
        }
        path.to_string_lossy().into_owned()
    }

    fn tiny_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            data_path:      write_corpus(dir),
            checkpoint_dir: dir.join("ckpt").to_string_lossy().into_owned(),
            block_size:     8,
            batch_size:     4,
            val_batch_size: 4,
            epoch_steps:    8,
            eval_interval:  1,
            n_embd:         8,
            n_heads:        2,
            n_layers:       1,
            ffn_hidden:     16,
            dropout:        0.0,
            num_workers:    0,
            max_epochs:     Some(1),
            device:         DeviceKind::Cpu,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_train_resume_and_generate_on_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());

        let report = TrainUseCase::new(cfg.clone(), false).execute().unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(report.val_curve.len(), 2);

        let ckpt_dir = Path::new(&cfg.checkpoint_dir);
        let ckpt     = CheckpointManager::new(ckpt_dir);
        assert!(ckpt.has_checkpoint());
        assert!(ckpt.model_file().exists());
        assert!(ckpt.optimizer_file().exists());
        for file in ["train_state.json", "train_config.json", "vocab.json",
                     "tokenizer.json", "loss_curve.csv"] {
            assert!(ckpt_dir.join(file).exists(), "missing {file}");
        }

        let resumed = TrainUseCase::new(cfg.clone(), true).execute().unwrap();
        assert_eq!(resumed.steps, 4);

        // header plus one row per evaluation of both runs
        let csv = std::fs::read_to_string(ckpt_dir.join("loss_curve.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 2 + 2);

        let text = GenerateUseCase::new(GenerateConfig {
            checkpoint_dir: cfg.checkpoint_dir.clone(),
            prompt:         "mayor".to_string(),
            max_new_tokens: 5,
            temperature:    1.0,
            seed:           3,
            device:         DeviceKind::Cpu,
        })
        .execute()
        .unwrap();
        assert!(text.starts_with("mayor"));
    }

    #[test]
    fn test_fresh_run_starts_a_new_loss_curve() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());

        TrainUseCase::new(cfg.clone(), false).execute().unwrap();
        TrainUseCase::new(cfg.clone(), false).execute().unwrap();

        let csv = std::fs::read_to_string(Path::new(&cfg.checkpoint_dir).join("loss_curve.csv")).unwrap();
        let steps: Vec<&str> = csv.lines().skip(1).map(|l| l.split(',').next().unwrap()).collect();
        assert_eq!(steps, vec!["1", "2"]);
    }

    #[test]
    fn test_fresh_run_replaces_a_stale_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());

        TokenizerStore::new(&cfg.checkpoint_dir)
            .install(&["unrelated corpus".to_string()], None, 100)
            .unwrap();
        TrainUseCase::new(cfg.clone(), false).execute().unwrap();

        let tok = TokenizerStore::new(&cfg.checkpoint_dir).load().unwrap();
        assert!(tok.token_to_id("mayor").is_some());
        assert!(tok.token_to_id("unrelated").is_none());
    }

    #[test]
    fn test_resume_with_a_different_tokenizer_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = tiny_config(dir.path());
        TrainUseCase::new(cfg.clone(), false).execute().unwrap();

        let other = dir.path().join("other");
        TokenizerStore::new(&other).install(&["unrelated".to_string()], None, 100).unwrap();

        let resumed = TrainConfig {
            tokenizer_path: Some(other.join("tokenizer.json").to_string_lossy().into_owned()),
            ..cfg
        };
        assert!(TrainUseCase::new(resumed, true).execute().is_err());
    }

    #[test]
    fn test_resume_without_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TrainUseCase::new(tiny_config(dir.path()), true).execute().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_heads() {
        let cfg = TrainConfig { n_embd: 10, n_heads: 4, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(TrainConfig::default().validate().is_ok());
    }
}
