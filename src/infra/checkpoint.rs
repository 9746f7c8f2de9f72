// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores everything needed to resume training or to
// sample from a trained model.
//
// File layout:
//   checkpoints/
//     model.mpk           ← model weights (Burn CompactRecorder)
//     optimizer.mpk       ← AdamW moment estimates
//     train_state.json    ← lr, global step, epoch
//     train_config.json   ← hyperparameters and model architecture
//     vocab.json          ← compact id → tokenizer id table
//     tokenizer.json      ← written by TokenizerStore
//
// The model and optimizer files are overwritten at the end of every
// epoch, so the directory always holds the latest complete state.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    backend::NdArray,
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::vocab::CompactVocab;
use crate::ml::model::GptModel;

const MODEL_FILE:  &str = "model";
const OPTIM_FILE:  &str = "optimizer";
const STATE_FILE:  &str = "train_state.json";
const CONFIG_FILE: &str = "train_config.json";
const VOCAB_FILE:  &str = "vocab.json";

/// Progress counters restored on `--resume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainState {
    /// Learning rate after the last plateau adjustment
    pub lr:    f64,
    /// Global step count
    pub step:  usize,
    /// Number of completed epochs
    pub epoch: usize,
}

/// Manages saving and loading of checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Open an existing checkpoint directory without creating anything.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            bail!("Checkpoint directory '{}' does not exist. Have you trained the model first?", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a record file as the recorder writes it.
    /// The extension does not depend on the backend.
    fn record_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(name)
            .with_extension(<CompactRecorder as FileRecorder<NdArray>>::file_extension())
    }

    pub fn model_file(&self) -> PathBuf {
        self.record_path(MODEL_FILE)
    }

    pub fn optimizer_file(&self) -> PathBuf {
        self.record_path(OPTIM_FILE)
    }

    /// True when weights and progress counters from a previous run exist.
    pub fn has_checkpoint(&self) -> bool {
        self.model_file().exists() && self.dir.join(STATE_FILE).exists()
    }

    // ─── Weights ─────────────────────────────────────────────────────────────

    pub fn save_model<B: Backend>(&self, model: &GptModel<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;
        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Load weights into a freshly initialised model of the same architecture.
    pub fn load_model<B: Backend>(&self, model: GptModel<B>, device: &B::Device) -> Result<GptModel<B>> {
        let path = self.dir.join(MODEL_FILE);
        model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Have you trained the model first?", path.display())
            })
    }

    pub fn save_optimizer<B, O>(&self, optim: &O) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<GptModel<B>, B>,
    {
        let path = self.dir.join(OPTIM_FILE);
        <CompactRecorder as Recorder<B>>::record(&CompactRecorder::new(), optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<GptModel<B>, B>,
    {
        let path   = self.dir.join(OPTIM_FILE);
        let record = <CompactRecorder as Recorder<B>>::load(&CompactRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    // ─── JSON side files ─────────────────────────────────────────────────────

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Make sure you have run 'train' first.", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }

    pub fn save_state(&self, state: &TrainState) -> Result<()> {
        self.write_json(STATE_FILE, state)
    }

    pub fn load_state(&self) -> Result<TrainState> {
        self.read_json(STATE_FILE)
    }

    /// Must be written before training starts so a resumed run or the
    /// generator can rebuild the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_vocab(&self, vocab: &CompactVocab) -> Result<()> {
        self.write_json(VOCAB_FILE, vocab)
    }

    pub fn load_vocab(&self) -> Result<CompactVocab> {
        self.read_json(VOCAB_FILE)
    }
}
