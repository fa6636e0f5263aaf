// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the single `refine` subcommand and all its
// configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::refine_use_case::RefineConfig;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Iteratively refine the generator on its own best redesigns
    Refine(RefineArgs),
}

/// All arguments for the `refine` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct RefineArgs {
    /// Checkpoint of the structure-conditioned generator
    #[arg(long)]
    pub pretrained_ckpt: String,

    /// Checkpoint of the sequence embedding model
    #[arg(long)]
    pub embedding_ckpt: String,

    /// Embedding model variant served by the model process
    #[arg(long, default_value = "esm2_t33_650M")]
    pub embedding_variant: String,

    /// Evaluation set: a JSON array file or a directory of .json complexes
    #[arg(long)]
    pub eval_set: String,

    /// Command that launches the model server process
    #[arg(long)]
    pub model_cmd: String,

    /// Command that predicts ddG given a reference and candidate file
    #[arg(long)]
    pub ddg_cmd: String,

    /// Redesigns sampled per complex per round
    #[arg(long, default_value_t = 50)]
    pub n_tries: usize,

    /// Candidates kept per complex per round
    #[arg(long, default_value_t = 4)]
    pub n_samples: usize,

    /// Number of refinement rounds
    #[arg(long, default_value_t = 20)]
    pub rounds: usize,

    /// RNG seed for stochastic sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Device the model process runs on (e.g. cpu, cuda:0)
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Learning rate — both optimizers are re-created with this
    /// rate at the start of every round
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Training epochs per round
    #[arg(long, default_value_t = 1)]
    pub epochs: usize,

    /// Gradient-norm clip applied to the co-design group
    #[arg(long, default_value_t = 1.0)]
    pub grad_clip: f64,

    /// Output directory for structures, logs, and checkpoints
    #[arg(long)]
    pub save_dir: String,

    /// Number of complexes per training micro-batch
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Micro-batches accumulated before each optimizer step
    #[arg(long, default_value_t = 1)]
    pub update_freq: usize,

    /// Batch prefetch depth (0 loads batches inline)
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,
}

/// Convert CLI RefineArgs into the application-layer RefineConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<RefineArgs> for RefineConfig {
    fn from(a: RefineArgs) -> Self {
        RefineConfig {
            pretrained_ckpt:   a.pretrained_ckpt,
            embedding_ckpt:    a.embedding_ckpt,
            embedding_variant: a.embedding_variant,
            eval_set:          a.eval_set,
            model_cmd:         a.model_cmd,
            ddg_cmd:           a.ddg_cmd,
            n_tries:           a.n_tries,
            n_samples:         a.n_samples,
            rounds:            a.rounds,
            seed:              a.seed,
            device:            a.device,
            lr:                a.lr,
            epochs:            a.epochs,
            grad_clip:         a.grad_clip,
            save_dir:          a.save_dir,
            batch_size:        a.batch_size,
            update_freq:       a.update_freq,
            num_workers:       a.num_workers,
        }
    }
}
