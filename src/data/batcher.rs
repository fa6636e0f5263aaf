// ============================================================
// Layer 4 — Training Batch Loader
// ============================================================
// Turns the buffer's committed items into fixed-size
// micro-batches for the training loop.
//
// Iteration is strictly sequential — the buffer already
// interleaves candidates per example and the gradient
// accumulation schedule depends on a stable batch order, so
// there is no shuffle here.
//
// When `prefetch_depth > 0`, collation runs on a background
// thread and finished batches are handed over through a
// bounded channel, so the training loop never waits on
// cloning while a batch is already available. With depth 0
// iteration is fully synchronous.

use std::sync::mpsc;
use std::thread;

use crate::domain::complex::Complex;

pub struct TrainLoader {
    items: Vec<Complex>,
    batch_size: usize,
    prefetch_depth: usize,
}

impl TrainLoader {
    pub fn new(items: Vec<Complex>, batch_size: usize, prefetch_depth: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            items,
            batch_size,
            prefetch_depth,
        }
    }

    /// Number of micro-batches one pass yields (last one may be
    /// smaller than `batch_size`).
    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.batch_size)
    }

    /// One full sequential pass over the items. Each call starts
    /// a fresh pass, so the training loop calls this per epoch.
    pub fn iter(&self) -> BatchIter {
        if self.prefetch_depth == 0 {
            BatchIter::Sync {
                items: self.items.clone(),
                batch_size: self.batch_size,
                cursor: 0,
            }
        } else {
            // The worker owns its own copy of the items; batches
            // travel back through a bounded channel.
            let (tx, rx) = mpsc::sync_channel(self.prefetch_depth);
            let items = self.items.clone();
            let batch_size = self.batch_size;
            let handle = thread::spawn(move || {
                for chunk in items.chunks(batch_size) {
                    // Receiver hung up: the pass was dropped early
                    if tx.send(chunk.to_vec()).is_err() {
                        break;
                    }
                }
            });
            BatchIter::Prefetch {
                rx,
                handle: Some(handle),
            }
        }
    }
}

pub enum BatchIter {
    Sync {
        items: Vec<Complex>,
        batch_size: usize,
        cursor: usize,
    },
    Prefetch {
        rx: mpsc::Receiver<Vec<Complex>>,
        handle: Option<thread::JoinHandle<()>>,
    },
}

impl Iterator for BatchIter {
    type Item = Vec<Complex>;

    fn next(&mut self) -> Option<Vec<Complex>> {
        match self {
            BatchIter::Sync {
                items,
                batch_size,
                cursor,
            } => {
                if *cursor >= items.len() {
                    return None;
                }
                let end = (*cursor + *batch_size).min(items.len());
                let batch = items[*cursor..end].to_vec();
                *cursor = end;
                Some(batch)
            }
            // When the pass is dropped early the worker sees the
            // hang-up on its next send and exits on its own.
            BatchIter::Prefetch { rx, handle } => match rx.recv() {
                Ok(batch) => Some(batch),
                Err(_) => {
                    if let Some(handle) = handle.take() {
                        let _ = handle.join();
                    }
                    None
                }
            },
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn complexes(n: usize) -> Vec<Complex> {
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

    #[test]
    fn test_sync_chunking() {
        let loader = TrainLoader::new(complexes(7), 3, 0);
        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches[0][0].id, "c0");
        assert_eq!(batches[2][0].id, "c6");
        assert_eq!(loader.batch_count(), 3);
    }

    #[test]
    fn test_prefetch_matches_sync() {
        let items = complexes(10);
        let sync: Vec<_> = TrainLoader::new(items.clone(), 4, 0).iter().collect();
        let prefetched: Vec<_> = TrainLoader::new(items, 4, 2).iter().collect();
        assert_eq!(sync.len(), prefetched.len());
        for (a, b) in sync.iter().zip(prefetched.iter()) {
            let ids_a: Vec<_> = a.iter().map(|c| c.id.clone()).collect();
            let ids_b: Vec<_> = b.iter().map(|c| c.id.clone()).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn test_fresh_pass_per_iter() {
        let loader = TrainLoader::new(complexes(4), 2, 0);
        assert_eq!(loader.iter().count(), 2);
        // Second pass starts over
        assert_eq!(loader.iter().count(), 2);
    }

    #[test]
    fn test_early_drop_of_prefetch_pass() {
        let loader = TrainLoader::new(complexes(100), 1, 2);
        let mut iter = loader.iter();
        let _ = iter.next();
        // Dropping mid-pass must not hang or panic
        drop(iter);
    }

    #[test]
    fn test_empty_items() {
        let loader = TrainLoader::new(Vec::new(), 4, 0);
        assert_eq!(loader.iter().count(), 0);
        assert_eq!(loader.batch_count(), 0);
    }
}
