// ============================================================
// Layer 2 - GenerateUseCase
// ============================================================
// Samples text from a trained checkpoint:
//
//   Step 1: Load train_config.json, vocab.json, tokenizer.json
//   Step 2: Rebuild the model and load its weights
//   Step 3: Encode the prompt behind an end-of-text marker
//   Step 4: Sample new tokens and decode prompt + continuation
//
// The model runs on the plain (non-autodiff) backend.

use anyhow::Result;
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::data::encoder::CorpusCodec;
use crate::domain::traits::TextCodec;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    cpu_device, generator::Generator, gpu_device, CpuBackend, DeviceKind, GpuBackend,
};

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub checkpoint_dir: String,
    pub prompt:         String,
    pub max_new_tokens: usize,
    /// 0 means greedy decoding
    pub temperature:    f64,
    pub seed:           u64,
    pub device:         DeviceKind,
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Returns the prompt followed by the sampled continuation.
    pub fn execute(&self) -> Result<String> {
        let cfg  = &self.config;
        let ckpt = CheckpointManager::open(&cfg.checkpoint_dir)?;

        // ── Step 1: Saved artefacts ───────────────────────────────────────────
        let train_cfg = ckpt.load_config()?;
        let vocab     = ckpt.load_vocab()?;
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).load()?;

        let model_cfg = train_cfg.gpt_config(vocab.len(), 0.0);
        let eos       = vocab.eos_id();
        let codec     = CorpusCodec::new(tokenizer, vocab);

        // ── Step 3: Prompt ────────────────────────────────────────────────────
        let prompt_ids = codec.stot(&cfg.prompt)?;
        let mut context = Vec::with_capacity(prompt_ids.len() + 1);
        context.push(eos);
        context.extend_from_slice(&prompt_ids);

        tracing::info!(
            "Generating {} tokens after a {}-token prompt (temperature {})",
            cfg.max_new_tokens,
            prompt_ids.len(),
            cfg.temperature
        );

        // ── Steps 2 + 4: Model and sampling ───────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let generated = match cfg.device {
            DeviceKind::Gpu => {
                let device = gpu_device();
                let model  = ckpt.load_model(model_cfg.init::<GpuBackend>(&device), &device)?;
                Generator::new(model, device).generate(&context, cfg.max_new_tokens, cfg.temperature, &mut rng)?
            }
            DeviceKind::Cpu => {
                let device = cpu_device();
                let model  = ckpt.load_model(model_cfg.init::<CpuBackend>(&device), &device)?;
                Generator::new(model, device).generate(&context, cfg.max_new_tokens, cfg.temperature, &mut rng)?
            }
        };

        let mut output = prompt_ids;
        output.extend(generated);
        codec.ttos(&output, true)
    }
}
