// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `stylize`,
// and all their configurable flags.

use clap::{Args, Subcommand, ValueEnum};
use crate::application::train_use_case::TrainConfig;
use crate::domain::style::StyleLossKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the decoder and discriminator on photos + style images
    Train(TrainArgs),

    /// Render a photo in the style of a reference image
    Stylize(StylizeArgs),
}

/// Style statistic compared by the style loss.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StyleLossArg {
    /// Gram matrices of each feature layer
    Gram,
    /// Per-channel mean and standard deviation
    MeanStd,
}

impl From<StyleLossArg> for StyleLossKind {
    fn from(a: StyleLossArg) -> Self {
        match a {
            StyleLossArg::Gram    => StyleLossKind::Gram,
            StyleLossArg::MeanStd => StyleLossKind::MeanStd,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of content photographs (searched recursively)
    #[arg(long, default_value = "data/content")]
    pub content_dir: String,

    /// Directory of style images (searched recursively)
    #[arg(long, default_value = "data/style")]
    pub style_dir: String,

    /// Directory for checkpoints, metrics and sample grids
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Pretrained VGG encoder record (.mpk). Without it the encoder
    /// is randomly initialised
    #[arg(long)]
    pub encoder_weights: Option<String>,

    /// Shorter side images are resized to before cropping
    #[arg(long, default_value_t = 512)]
    pub load_size: u32,

    /// Square crop fed to the network (multiple of 8)
    #[arg(long, default_value_t = 256)]
    pub crop_size: u32,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Number of full passes through the content images
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Decoder learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Inverse-time decay: lr / (1 + lr_decay * step)
    #[arg(long, default_value_t = 5e-5)]
    pub lr_decay: f64,

    /// Discriminator learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub disc_lr: f64,

    #[arg(long, default_value_t = 1.0)]
    pub content_weight: f64,

    #[arg(long, default_value_t = 10.0)]
    pub style_weight: f64,

    /// Weight of the adversarial term (0 disables it)
    #[arg(long, default_value_t = 0.1)]
    pub adv_weight: f64,

    /// Weight of the total-variation smoothness term
    #[arg(long, default_value_t = 0.0)]
    pub tv_weight: f64,

    #[arg(long, value_enum, default_value_t = StyleLossArg::Gram)]
    pub style_loss: StyleLossArg,

    /// Width of the first VGG block; 64 matches standard VGG-19
    #[arg(long, default_value_t = 64)]
    pub base_channels: usize,

    #[arg(long, default_value_t = 64)]
    pub disc_base_channels: usize,

    /// Number of stride-2 blocks in the discriminator
    #[arg(long, default_value_t = 3)]
    pub disc_layers: usize,

    /// Fraction of content images held out for validation
    #[arg(long, default_value_t = 0.05)]
    pub val_fraction: f64,

    /// Write a preview grid every N steps (0 disables)
    #[arg(long, default_value_t = 500)]
    pub sample_every: usize,

    /// Save a resumable checkpoint every N steps (0 disables)
    #[arg(long, default_value_t = 1000)]
    pub checkpoint_every: usize,

    /// Data loader worker threads
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Start from scratch even if a checkpoint exists
    #[arg(long)]
    pub no_resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            content_dir:        a.content_dir,
            style_dir:          a.style_dir,
            checkpoint_dir:     a.checkpoint_dir,
            encoder_weights:    a.encoder_weights,
            load_size:          a.load_size,
            crop_size:          a.crop_size,
            batch_size:         a.batch_size,
            epochs:             a.epochs,
            lr:                 a.lr,
            lr_decay:           a.lr_decay,
            disc_lr:            a.disc_lr,
            content_weight:     a.content_weight,
            style_weight:       a.style_weight,
            adv_weight:         a.adv_weight,
            tv_weight:          a.tv_weight,
            style_loss:         a.style_loss.into(),
            base_channels:      a.base_channels,
            disc_base_channels: a.disc_base_channels,
            disc_layers:        a.disc_layers,
            val_fraction:       a.val_fraction,
            sample_every:       a.sample_every,
            checkpoint_every:   a.checkpoint_every,
            num_workers:        a.num_workers,
            seed:               a.seed,
            resume:             !a.no_resume,
        }
    }
}

/// All arguments for the `stylize` command
#[derive(Args, Debug)]
pub struct StylizeArgs {
    /// Photograph to restyle
    #[arg(long)]
    pub content: String,

    /// Reference style image
    #[arg(long)]
    pub style: String,

    /// Where to write the PNG result
    #[arg(long, default_value = "stylized.png")]
    pub output: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Style strength in [0, 1]
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f32,

    /// Shorter side to resize inputs to; 0 keeps the original size
    #[arg(long, default_value_t = 512)]
    pub size: u32,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["adain-stylize", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::try_parse_from([
            "adain-stylize", "train",
            "--style-loss", "mean-std",
            "--no-resume",
            "--crop-size", "128",
            "--encoder-weights", "vgg.mpk",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.style_loss, StyleLossKind::MeanStd);
        assert!(!cfg.resume);
        assert_eq!(cfg.crop_size, 128);
        assert_eq!(cfg.encoder_weights.as_deref(), Some("vgg.mpk"));
    }

    #[test]
    fn test_stylize_requires_inputs() {
        assert!(Cli::try_parse_from(["adain-stylize", "stylize", "--content", "a.jpg"]).is_err());
        let cli = Cli::try_parse_from([
            "adain-stylize", "stylize", "--content", "a.jpg", "--style", "b.jpg", "--alpha", "0.5",
        ])
        .unwrap();
        let Commands::Stylize(args) = cli.command else { panic!("expected stylize") };
        assert_eq!(args.alpha, 0.5);
        assert_eq!(args.size, 512);
    }
}
