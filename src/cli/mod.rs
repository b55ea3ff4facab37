// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Argument parsing only;
// all work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains the decoder adversarially on a style
//   2. `stylize` — loads a checkpoint and restyles one photo

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, StylizeArgs, TrainArgs};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(
    name = "adain-stylize",
    version,
    about = "Train an AdaIN style-transfer decoder with a PatchGAN critic, then stylize photos."
)]
pub struct Cli {
    /// The subcommand to run (train or stylize)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Stylize(args) => run_stylize(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!(
        "Starting training: content '{}', style '{}'",
        args.content_dir,
        args.style_dir
    );
    let checkpoint_dir = args.checkpoint_dir.clone();
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete after {} epochs ({} steps). Checkpoints in '{}'.",
        summary.state.epoch, summary.state.step, checkpoint_dir
    );
    Ok(())
}

fn run_stylize(args: StylizeArgs) -> Result<()> {
    use crate::application::stylize_use_case::StylizeUseCase;

    let use_case = StylizeUseCase::new(&args.checkpoint_dir, args.size)?;
    use_case.stylize(
        Path::new(&args.content),
        Path::new(&args.style),
        Path::new(&args.output),
        args.alpha,
    )?;
    println!("Saved {}", args.output);
    Ok(())
}
