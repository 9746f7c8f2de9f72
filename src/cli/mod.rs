// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    - trains (or resumes training) on a CSV text column
//   2. `generate` - loads a checkpoint and samples text
//   3. `stats`    - describes a corpus before training
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, StatsArgs, TrainArgs};

use crate::application::{
    generate_use_case::GenerateUseCase,
    stats_use_case::StatsUseCase,
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "blockgpt",
    version = "0.1.0",
    about = "Train a small GPT on short texts from a CSV file, then sample from it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Generate(args) => run_generate(args),
            Commands::Stats(args)    => run_stats(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let resume = args.resume;
    if resume {
        tracing::info!("Resuming training from: {}", args.checkpoint_dir);
    } else {
        tracing::info!("Starting training on: {}", args.data_path);
    }

    let report = TrainUseCase::new(args.into(), resume).execute()?;

    match (report.train_curve.last(), report.val_curve.last()) {
        (Some(train), Some(val)) => println!(
            "Training complete after {} steps. Train loss {:.4}, validation loss {:.4}. Checkpoint saved.",
            report.steps, train, val
        ),
        _ => println!("Training complete after {} steps. Checkpoint saved.", report.steps),
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let text = GenerateUseCase::new(args.into()).execute()?;
    println!("{text}");
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let stats = StatsUseCase::new(args.into()).execute()?;
    print!("{stats}");
    Ok(())
}
