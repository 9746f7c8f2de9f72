// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the raw CSV file to GPU-ready tensor batches.
//
//   CSV file
//       │
//       ▼
//   CsvTextLoader     → one String per non-empty record
//       │
//       ▼
//   encode_corpus     → tokenize, append EOS, compact the ids
//       │
//       ▼
//   split_stream      → contiguous train / validation streams
//       │
//       ▼
//   BlockPairDataset  → boundary-aligned (input, target) windows
//       │
//       ▼
//   BlockBatcher      → stacks windows into [batch, T] tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads one text column out of a CSV file
pub mod loader;

/// Tokenizes texts into a single compact token stream
pub mod encoder;

/// Contiguous train/validation split of the token stream
pub mod splitter;

/// Implements Burn's Dataset trait over boundary-aligned windows
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{BlockBatch, BlockBatcher},
    dataset::{BlockPairDataset, Sampling},
    splitter::split_stream,
};

/// Loader settings that come from the training configuration.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub split:          f64,
    pub block_size:     usize,
    pub batch_size:     usize,
    pub val_batch_size: usize,
    pub epoch_steps:    usize,
    pub num_workers:    usize,
    pub seed:           u64,
}

pub type BatchLoader<B> = Arc<dyn DataLoader<BlockBatch<B>>>;
pub type TrainLoader<B> = BatchLoader<B>;
/// Validation batches live on the inner backend, next to `model.valid()`.
pub type ValidLoader<B> = BatchLoader<<B as AutodiffBackend>::InnerBackend>;

/// Split the stream and wrap both halves in data loaders.
///
/// The training half is sampled at random text boundaries
/// (`epoch_steps` samples per epoch); the validation half is walked
/// sequentially, one window per text boundary.
pub fn construct_data_loaders<B: AutodiffBackend>(
    ids:      &[u32],
    eos_id:   u32,
    settings: &LoaderSettings,
    device:   &B::Device,
) -> anyhow::Result<(TrainLoader<B>, ValidLoader<B>)> {
    let (train_ids, val_ids) = split_stream(ids, settings.split);

    let ds_train = BlockPairDataset::new(
        train_ids,
        settings.block_size,
        eos_id,
        Sampling::Random {
            samples_per_epoch: settings.epoch_steps,
            seed:              settings.seed,
        },
    )?;
    let ds_val = BlockPairDataset::new(val_ids, settings.block_size, eos_id, Sampling::Sequential)?;

    tracing::info!(
        "Training data (one epoch) consist of {} blocks of text drawn from {} text starts",
        burn::data::dataset::Dataset::len(&ds_train),
        ds_train.starts().len()
    );
    tracing::info!(
        "Validation data consist of {} blocks of text",
        burn::data::dataset::Dataset::len(&ds_val)
    );

    let mut train_builder = DataLoaderBuilder::new(BlockBatcher::<B>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed);
    let mut val_builder = DataLoaderBuilder::new(BlockBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(settings.val_batch_size);

    // zero workers means batches are built on the training thread
    if settings.num_workers > 0 {
        train_builder = train_builder.num_workers(settings.num_workers);
        val_builder   = val_builder.num_workers(settings.num_workers.min(2));
    }

    let train_loader = train_builder.build(ds_train);
    let val_loader   = val_builder.build(ds_val);

    Ok((train_loader, val_loader))
}
