// ============================================================
// Layer 5 — Joint Optimization Loop
// ============================================================
// One round's training phase over the committed buffer.
//
// Two parameter groups (embedding sub-model, co-design
// sub-model) are optimized together from a single coupled
// forward pass. Gradients ACCUMULATE across `update_freq`
// micro-batches — each loss is pre-scaled by 1/update_freq so
// the effective batch size is batch_size * update_freq — and
// both optimizers step at the same flush points:
//
//   collecting ──(step % update_freq == 0)──▶ flush ──▶ collecting
//
// A flush clips the co-design group's gradient norm, steps
// both optimizers, then zeroes both gradient accumulators.
// The step counter spans ALL epochs of the round; after the
// epoch loop, one trailing flush runs if the remainder is
// non-zero, so trailing partial accumulations are never
// dropped.
//
// A failing forward pass is logged and skipped: no gradient
// contribution, no step-counter increment.

use anyhow::Result;

use crate::data::batcher::TrainLoader;
use crate::domain::traits::{GenerativeModel, ParamGroup};

pub struct JointTrainer {
    /// Micro-batches per parameter update
    update_freq: usize,

    /// Gradient-norm bound for the co-design group
    grad_clip: f64,

    /// Micro-batches processed so far this round
    step: usize,
}

/// Loss bookkeeping for one round's training phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainStats {
    pub embedding_loss_sum: f64,
    pub codesign_loss_sum: f64,
    pub micro_batches: usize,
    pub skipped: usize,
    pub flushes: usize,
}

impl TrainStats {
    pub fn mean_losses(&self) -> (f64, f64) {
        if self.micro_batches == 0 {
            return (f64::NAN, f64::NAN);
        }
        let n = self.micro_batches as f64;
        (self.embedding_loss_sum / n, self.codesign_loss_sum / n)
    }
}

impl JointTrainer {
    pub fn new(update_freq: usize, grad_clip: f64) -> Self {
        assert!(update_freq > 0, "update frequency must be positive");
        Self {
            update_freq,
            grad_clip,
            step: 0,
        }
    }

    /// Run `epochs` sequential passes over the loader, then the
    /// trailing flush. Consumes one round's training budget.
    pub fn run<M: GenerativeModel>(
        &mut self,
        model: &mut M,
        loader: &TrainLoader,
        epochs: usize,
    ) -> Result<TrainStats> {
        let mut stats = TrainStats::default();
        let loss_scale = 1.0 / self.update_freq as f64;

        for epoch in 0..epochs {
            for batch in loader.iter() {
                match model.forward_backward(&batch, loss_scale) {
                    Ok(losses) => {
                        stats.embedding_loss_sum += losses.embedding;
                        stats.codesign_loss_sum += losses.codesign;
                        stats.micro_batches += 1;
                        self.step += 1;
                        if self.step % self.update_freq == 0 {
                            self.flush(model)?;
                            stats.flushes += 1;
                        }
                    }
                    Err(e) => {
                        // Skipped outright: no gradients were kept
                        // for this micro-batch, the counter stands.
                        tracing::warn!("Forward pass failed, skipping micro-batch: {e:#}");
                        stats.skipped += 1;
                    }
                }
            }
            let (emb, cod) = stats.mean_losses();
            tracing::info!(
                "Epoch {}/{}: mean losses embedding={:.4} codesign={:.4} ({} micro-batches, {} skipped)",
                epoch + 1,
                epochs,
                emb,
                cod,
                stats.micro_batches,
                stats.skipped
            );
        }

        // Trailing partial accumulation is flushed unconditionally
        if self.step % self.update_freq != 0 {
            self.flush(model)?;
            stats.flushes += 1;
        }

        Ok(stats)
    }

    /// Synchronized parameter update: clip the co-design group,
    /// step both optimizers, zero both accumulators.
    fn flush<M: GenerativeModel>(&self, model: &mut M) -> Result<()> {
        model.clip_grad_norm(ParamGroup::Codesign, self.grad_clip)?;
        model.optimizer_step(ParamGroup::Codesign)?;
        model.zero_grad(ParamGroup::Codesign)?;

        model.optimizer_step(ParamGroup::Embedding)?;
        model.zero_grad(ParamGroup::Embedding)?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use anyhow::bail;
    use rand::rngs::StdRng;

    use crate::domain::candidate::{InferenceOutput, LossPair};
    use crate::domain::complex::{Cdr, Complex};

    fn items(n: usize) -> Vec<Complex> {
        (0..n)
            .map(|i| Complex {
                id: format!("c{i}"),
                chains: BTreeMap::new(),
                heavy_chain: "H".to_string(),
                light_chain: "L".to_string(),
                antigen_chains: Vec::new(),
                cdr_ranges: BTreeMap::new(),
                epitope: None,
            })
            .collect()
    }

    /// Records every optimizer interaction in order.
    #[derive(Default)]
    struct SpyModel {
        forwards: usize,
        fail_on_forwards: Vec<usize>,
        events: Vec<String>,
        scales: Vec<f64>,
    }

    impl GenerativeModel for SpyModel {
        fn cdr(&self) -> Cdr {
            Cdr::H3
        }
        fn set_training(&mut self, _t: bool) -> Result<()> {
            Ok(())
        }
        fn infer(
            &mut self,
            _batch: &[Complex],
            _greedy: bool,
            _rng: &mut StdRng,
        ) -> Result<InferenceOutput> {
            unreachable!("trainer never samples")
        }
        fn init_optimizers(&mut self, _lr: f64) -> Result<()> {
            Ok(())
        }
        fn forward_backward(&mut self, _batch: &[Complex], scale: f64) -> Result<LossPair> {
            self.forwards += 1;
            if self.fail_on_forwards.contains(&self.forwards) {
                bail!("loss diverged");
            }
            self.scales.push(scale);
            self.events.push(format!("fwd{}", self.forwards));
            Ok(LossPair {
                embedding: 1.0 * scale,
                codesign: 2.0 * scale,
            })
        }
        fn clip_grad_norm(&mut self, group: ParamGroup, max_norm: f64) -> Result<()> {
            self.events.push(format!("clip:{}:{max_norm}", group.as_str()));
            Ok(())
        }
        fn optimizer_step(&mut self, group: ParamGroup) -> Result<()> {
            self.events.push(format!("step:{}", group.as_str()));
            Ok(())
        }
        fn zero_grad(&mut self, group: ParamGroup) -> Result<()> {
            self.events.push(format!("zero:{}", group.as_str()));
            Ok(())
        }
        fn save_group(&mut self, _g: ParamGroup, _p: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn count(events: &[String], prefix: &str) -> usize {
        events.iter().filter(|e| e.starts_with(prefix)).count()
    }

    #[test]
    fn test_flush_timing_with_remainder() {
        // 7 micro-batches, update_freq 3: flushes after steps 3
        // and 6, plus exactly one trailing flush for the
        // remainder of 1.
        let mut model = SpyModel::default();
        let loader = TrainLoader::new(items(7), 1, 0);
        let mut trainer = JointTrainer::new(3, 1.0);
        let stats = trainer.run(&mut model, &loader, 1).unwrap();

        assert_eq!(stats.micro_batches, 7);
        assert_eq!(stats.flushes, 3);
        assert_eq!(count(&model.events, "step:codesign"), 3);
        assert_eq!(count(&model.events, "step:embedding"), 3);
        assert_eq!(count(&model.events, "zero:codesign"), 3);
        // In-epoch flushes sit right after the 3rd and 6th forward
        let third_fwd = model.events.iter().position(|e| e == "fwd3").unwrap();
        assert_eq!(model.events[third_fwd + 1], "clip:codesign:1");
    }

    #[test]
    fn test_no_trailing_flush_on_exact_multiple() {
        let mut model = SpyModel::default();
        let loader = TrainLoader::new(items(6), 1, 0);
        let mut trainer = JointTrainer::new(3, 1.0);
        let stats = trainer.run(&mut model, &loader, 1).unwrap();

        assert_eq!(stats.flushes, 2);
        assert_eq!(count(&model.events, "step:embedding"), 2);
    }

    #[test]
    fn test_step_counter_spans_epochs() {
        // 2 epochs × 4 micro-batches = 8 steps at freq 3:
        // flushes at 3 and 6 during the epochs, trailing for
        // the remainder of 2.
        let mut model = SpyModel::default();
        let loader = TrainLoader::new(items(4), 1, 0);
        let mut trainer = JointTrainer::new(3, 1.0);
        let stats = trainer.run(&mut model, &loader, 2).unwrap();

        assert_eq!(stats.micro_batches, 8);
        assert_eq!(stats.flushes, 3);
    }

    #[test]
    fn test_clip_only_codesign() {
        let mut model = SpyModel::default();
        let loader = TrainLoader::new(items(3), 1, 0);
        let mut trainer = JointTrainer::new(3, 0.5);
        trainer.run(&mut model, &loader, 1).unwrap();

        assert_eq!(count(&model.events, "clip:codesign"), 1);
        assert_eq!(count(&model.events, "clip:embedding"), 0);
        // Flush order: codesign clip/step/zero, then embedding
        let clip = model.events.iter().position(|e| e.starts_with("clip")).unwrap();
        assert_eq!(model.events[clip + 1], "step:codesign");
        assert_eq!(model.events[clip + 2], "zero:codesign");
        assert_eq!(model.events[clip + 3], "step:embedding");
        assert_eq!(model.events[clip + 4], "zero:embedding");
    }

    #[test]
    fn test_forward_failure_skips_micro_batch() {
        // Batch 2 of 4 fails: 3 successful steps at freq 2 →
        // one in-epoch flush (step 2) + one trailing (remainder 1)
        let mut model = SpyModel {
            fail_on_forwards: vec![2],
            ..SpyModel::default()
        };
        let loader = TrainLoader::new(items(4), 1, 0);
        let mut trainer = JointTrainer::new(2, 1.0);
        let stats = trainer.run(&mut model, &loader, 1).unwrap();

        assert_eq!(stats.micro_batches, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.flushes, 2);
    }

    #[test]
    fn test_loss_scale_is_inverse_update_freq() {
        let mut model = SpyModel::default();
        let loader = TrainLoader::new(items(4), 1, 0);
        let mut trainer = JointTrainer::new(4, 1.0);
        trainer.run(&mut model, &loader, 1).unwrap();

        assert!(model.scales.iter().all(|&s| (s - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_mean_losses_empty_is_nan() {
        let stats = TrainStats::default();
        let (emb, cod) = stats.mean_losses();
        assert!(emb.is_nan() && cod.is_nan());
    }
}
