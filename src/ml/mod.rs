// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All model, optimisation and sampling code built on Burn.
//
//   model.rs     - decoder-only transformer (GPT):
//                  • token + positional embeddings
//                  • causal multi-head self-attention
//                  • GELU feed-forward networks
//                  • pre-norm residual blocks
//                  • language-model head over the compact vocabulary
//
//   plateau.rs   - learning-rate decay and stopping from the
//                  validation-loss curve
//
//   trainer.rs   - the training loop: forward, loss, backward,
//                  AdamW step, periodic validation, checkpointing
//
//   generator.rs - autoregressive sampling from a checkpoint
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Radford et al. (2019) GPT-2

/// Decoder-only transformer architecture
pub mod model;

/// Loss-plateau learning-rate schedule
pub mod plateau;

/// Step-based training loop with validation and checkpointing
pub mod trainer;

/// Text sampling from a trained model
pub mod generator;

use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type GpuBackend = Wgpu;
pub type CpuBackend = NdArray;

/// Which Burn backend a command runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// WGPU (Vulkan / Metal / DX12)
    #[default]
    Gpu,
    /// NdArray on the CPU
    Cpu,
}

pub fn gpu_device() -> WgpuDevice {
    WgpuDevice::default()
}

pub fn cpu_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}
