// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `generate` and `stats`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    generate_use_case::GenerateConfig,
    stats_use_case::StatsConfig,
    train_use_case::TrainConfig,
};
use crate::ml::{plateau::PlateauConfig, DeviceKind};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the language model on a CSV column of short texts
    Train(TrainArgs),

    /// Sample text from a trained checkpoint
    Generate(GenerateArgs),

    /// Print corpus statistics and a text length histogram
    Stats(StatsArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Continue from the checkpoint in --checkpoint-dir using its saved
    /// configuration
    #[arg(short, long)]
    pub resume: bool,

    /// CSV file holding the training texts
    #[arg(long = "data", default_value = "data/headlines.csv")]
    pub data_path: String,

    /// Header of the CSV column to train on
    #[arg(long, default_value = "headline_text")]
    pub column: String,

    /// Existing tokenizer.json to use instead of building one
    #[arg(long)]
    pub tokenizer: Option<String>,

    /// Directory for weights, optimizer state, tokenizer and logs
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Word-level vocabulary size when building a tokenizer
    #[arg(long, default_value_t = 30_000)]
    pub max_vocab: usize,

    /// Fraction of the token stream used for training
    #[arg(long, default_value_t = 0.9)]
    pub split: f64,

    /// Context length in tokens
    #[arg(long, default_value_t = 64)]
    pub block_size: usize,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub val_batch_size: usize,

    /// Training windows sampled per epoch
    #[arg(long, default_value_t = 32_000)]
    pub epoch_steps: usize,

    /// Validate every N optimizer steps
    #[arg(long, default_value_t = 100)]
    pub eval_interval: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    /// Training stops once the learning rate decays to this value
    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Divisor applied to the learning rate on a loss plateau
    #[arg(long, default_value_t = 1.5)]
    pub lr_decay: f64,

    /// AdamW weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Embedding width
    #[arg(long, default_value_t = 128)]
    pub n_embd: usize,

    /// Attention heads; must divide --n-embd
    #[arg(long, default_value_t = 4)]
    pub n_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub n_layers: usize,

    /// Inner width of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub ffn_hidden: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Background batch-loading threads
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Stop after this many epochs even if the loss still improves
    #[arg(long)]
    pub max_epochs: Option<usize>,

    #[arg(long, value_enum, default_value_t = DeviceKind::Gpu)]
    pub device: DeviceKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:      a.data_path,
            text_column:    a.column,
            tokenizer_path: a.tokenizer,
            checkpoint_dir: a.checkpoint_dir,
            max_vocab:      a.max_vocab,
            split:          a.split,
            block_size:     a.block_size,
            batch_size:     a.batch_size,
            val_batch_size: a.val_batch_size,
            epoch_steps:    a.epoch_steps,
            eval_interval:  a.eval_interval,
            lr:             a.lr,
            weight_decay:   a.weight_decay,
            n_embd:         a.n_embd,
            n_heads:        a.n_heads,
            n_layers:       a.n_layers,
            ffn_hidden:     a.ffn_hidden,
            dropout:        a.dropout,
            num_workers:    a.num_workers,
            seed:           a.seed,
            max_epochs:     a.max_epochs,
            device:         a.device,
            plateau: PlateauConfig {
                min_lr:       a.min_lr,
                decay_factor: a.lr_decay,
                ..PlateauConfig::default()
            },
        }
    }
}

/// All arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text the generated continuation follows
    #[arg(long, default_value = "")]
    pub prompt: String,

    #[arg(long, default_value_t = 200)]
    pub max_new_tokens: usize,

    /// Softmax temperature; 0 picks the most likely token
    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = DeviceKind::Gpu)]
    pub device: DeviceKind,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            checkpoint_dir: a.checkpoint_dir,
            prompt:         a.prompt,
            max_new_tokens: a.max_new_tokens,
            temperature:    a.temperature,
            seed:           a.seed,
            device:         a.device,
        }
    }
}

/// All arguments for the `stats` command
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long = "data", default_value = "data/headlines.csv")]
    pub data_path: String,

    #[arg(long, default_value = "headline_text")]
    pub column: String,

    /// Histogram bins
    #[arg(long, default_value_t = 20)]
    pub bins: usize,

    /// Existing tokenizer.json to use instead of building one
    #[arg(long)]
    pub tokenizer: Option<String>,

    #[arg(long, default_value_t = 30_000)]
    pub max_vocab: usize,
}

impl From<StatsArgs> for StatsConfig {
    fn from(a: StatsArgs) -> Self {
        StatsConfig {
            data_path:      a.data_path,
            text_column:    a.column,
            tokenizer_path: a.tokenizer,
            max_vocab:      a.max_vocab,
            bins:           a.bins,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::cli::Cli;
    use super::*;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["blockgpt", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(!args.resume);

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.block_size, 64);
        assert_eq!(cfg.epoch_steps, 32_000);
        assert_eq!(cfg.text_column, "headline_text");
        assert_eq!(cfg.plateau.min_lr, 1e-6);
        assert_eq!(cfg.device, DeviceKind::Gpu);
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "blockgpt", "train", "-r", "--data", "x.csv", "--device", "cpu",
            "--lr-decay", "2", "--max-epochs", "3",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(args.resume);

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.data_path, "x.csv");
        assert_eq!(cfg.device, DeviceKind::Cpu);
        assert_eq!(cfg.plateau.decay_factor, 2.0);
        assert_eq!(cfg.max_epochs, Some(3));
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "blockgpt", "generate", "--prompt", "mayor", "--temperature", "0",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };
        let cfg: GenerateConfig = args.into();
        assert_eq!(cfg.prompt, "mayor");
        assert_eq!(cfg.temperature, 0.0);
        assert_eq!(cfg.max_new_tokens, 200);
    }
}
