// ============================================================
// Layer 2 — RefineUseCase
// ============================================================
// Orchestrates one full refinement run in order:
//
//   Startup: Load evaluation set        (Layer 4 - data)
//            Persist originals + config (Layer 6 - infra)
//   Per round r in 0..rounds:
//     Step 1: Sample & select per example  (Layer 5 - ml)
//     Step 2: Commit the training buffer   (Layer 4 - data)
//     Step 3: Log round statistics         (Layer 6 - infra)
//     Step 4: Train both groups E epochs   (Layer 5 - ml)
//     Step 5: Checkpoint both groups       (Layer 6 - infra)
//
// Selection always runs against the model as trained in the
// PREVIOUS round, so the statistics logged in round r describe
// the round r-1 model (round -1 being the pretrained weights).

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::TrainLoader, buffer::TrainingBuffer, loader::load_eval_set};
use crate::domain::candidate::{mean_std, RoundState};
use crate::domain::traits::{FitnessOracle, GenerativeModel, StructureStore};
use crate::infra::{checkpoint::CheckpointManager, round_log::RoundLog};
use crate::ml::{selector::CandidateSelector, trainer::JointTrainer};

// ─── Refinement Configuration ────────────────────────────────────────────────
// All knobs for a refinement run. Serialisable so the exact
// configuration is saved next to its results and the run can
// be reproduced from the directory alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Structure-conditioned generator checkpoint
    pub pretrained_ckpt:   String,
    /// Sequence embedding checkpoint
    pub embedding_ckpt:    String,
    /// Embedding model variant name
    pub embedding_variant: String,
    /// Evaluation set: a JSON array file or a directory of .json complexes
    pub eval_set:          String,
    /// Command launching the model server process
    pub model_cmd:         String,
    /// Command predicting ddG for a reference/candidate file pair
    pub ddg_cmd:           String,
    /// Redesigns sampled per example per round
    pub n_tries:           usize,
    /// Candidates kept per example per round
    pub n_samples:         usize,
    /// Number of refinement rounds
    pub rounds:            usize,
    /// RNG seed for sampling
    pub seed:              u64,
    /// Device the model process runs on
    pub device:            String,
    /// Learning rate for both optimizers
    pub lr:                f64,
    /// Training epochs per round
    pub epochs:            usize,
    /// Gradient-norm clip for the co-design group
    pub grad_clip:         f64,
    /// Output directory for structures, logs, and checkpoints
    pub save_dir:          String,
    /// Training micro-batch size
    pub batch_size:        usize,
    /// Micro-batches accumulated per optimizer step
    pub update_freq:       usize,
    /// Batch prefetch depth (0 = load batches inline)
    pub num_workers:       usize,
}

// ─── RefineUseCase ────────────────────────────────────────────────────────────
// Owns the config and runs the full refinement loop.
pub struct RefineUseCase {
    config: RefineConfig,
}

impl RefineUseCase {
    pub fn new(config: RefineConfig) -> Self {
        Self { config }
    }

    /// Execute the full refinement loop end to end.
    pub fn execute<M, O, S>(&self, model: &mut M, oracle: &O, store: &S) -> Result<()>
    where
        M: GenerativeModel,
        O: FitnessOracle,
        S: StructureStore,
    {
        let cfg = &self.config;
        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        // ── Startup: evaluation set, save dir, originals ─────────────────────
        tracing::info!("Loading evaluation set from '{}'", cfg.eval_set);
        let originals = load_eval_set(&cfg.eval_set)?;
        tracing::info!("Loaded {} complexes", originals.len());

        let checkpoints = CheckpointManager::new(&cfg.save_dir)?;
        checkpoints.save_config(cfg)?;
        let mut round_log = RoundLog::open(checkpoints.dir())?;

        // The originals are written once; the oracle scores every
        // candidate against its original's file.
        let original_dir = checkpoints.dir().join("original");
        let original_paths: Vec<PathBuf> = originals
            .iter()
            .map(|complex| store.write(complex, &original_dir, None))
            .collect::<Result<_>>()
            .context("cannot persist original structures")?;

        let mut buffer = TrainingBuffer::new(originals, cfg.n_samples);
        let selector = CandidateSelector::new(cfg.n_tries, cfg.n_samples);
        let mut state = RoundState::new();

        // ── Refinement rounds ────────────────────────────────────────────────
        for round in 0..cfg.rounds {
            let round_started = Instant::now();
            tracing::info!("Round {}/{}", round + 1, cfg.rounds);

            // ── Step 1: sample & select per example ──────────────────────────
            model.set_training(false)?;
            let round_dir = checkpoints.dir().join(format!("round_{round}"));
            let mut round_scores: Vec<f64> = Vec::new();
            for i in 0..buffer.example_count() {
                let origin = buffer.original(i).clone();
                let outcome = selector.select(
                    &origin,
                    &original_paths[i],
                    &round_dir,
                    model,
                    oracle,
                    store,
                    &mut rng,
                )?;
                if let Some(outcome) = outcome {
                    round_scores.extend_from_slice(&outcome.accepted_scores);
                    buffer.stage(i, outcome.candidates);
                }
            }

            // ── Step 2: publish the new training set atomically ──────────────
            buffer.commit();

            // ── Step 3: round statistics ─────────────────────────────────────
            let (mean, std) = mean_std(&round_scores);
            state.observe(round, mean);
            round_log.append(round, mean, std, &state)?;

            // ── Step 4: train both groups ────────────────────────────────────
            model.set_training(true)?;
            model.init_optimizers(cfg.lr)?;
            let loader =
                TrainLoader::new(buffer.training_items(), cfg.batch_size, cfg.num_workers);
            let mut trainer = JointTrainer::new(cfg.update_freq, cfg.grad_clip);
            trainer.run(model, &loader, cfg.epochs)?;

            // ── Step 5: checkpoint both groups ───────────────────────────────
            checkpoints.save_round(model, round)?;
            tracing::info!(
                "Round {} done in {:.1}s",
                round + 1,
                round_started.elapsed().as_secs_f64()
            );
        }

        tracing::info!(
            "Refinement finished: {} rounds in {:.1}s, best mean ddg {:.4} from round {}",
            cfg.rounds,
            started.elapsed().as_secs_f64(),
            state.best_score,
            state.best_round
        );
        Ok(())
    }
}
