use std::sync::Mutex;

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One training window: `target` is `input` shifted left by one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPair {
    pub input:  Vec<u32>,
    pub target: Vec<u32>,
}

/// How windows are drawn from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Every `get` draws a uniformly random text boundary; the dataset
    /// reports `samples_per_epoch` items.
    Random { samples_per_epoch: usize, seed: u64 },
    /// Item `i` starts at the i-th text boundary.
    Sequential,
}

/// Fixed-length windows over a token stream, each starting right after
/// an EOS token and right-padded with EOS near the end of the stream.
pub struct BlockPairDataset {
    tokens:     Vec<u32>,
    block_size: usize,
    eos_id:     u32,
    starts:     Vec<usize>,
    sampling:   Sampling,
    rng:        Mutex<StdRng>,
}

impl BlockPairDataset {
    pub fn new(tokens: Vec<u32>, block_size: usize, eos_id: u32, sampling: Sampling) -> Result<Self> {
        if block_size == 0 {
            bail!("block size must be positive");
        }

        let mut eos_positions: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t == eos_id)
            .map(|(i, _)| i)
            .collect();
        // no text follows the last EOS
        eos_positions.pop();
        let starts: Vec<usize> = eos_positions.into_iter().map(|p| p + 1).collect();

        if starts.is_empty() {
            bail!(
                "token stream of {} tokens has no text boundary to start a window at",
                tokens.len()
            );
        }

        let seed = match sampling {
            Sampling::Random { seed, .. } => seed,
            Sampling::Sequential => 0,
        };

        Ok(Self {
            tokens,
            block_size,
            eos_id,
            starts,
            sampling,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Stream offsets at which windows may start.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    fn random_start(&self) -> usize {
        // a poisoned lock only means another worker panicked mid-draw
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.starts[rng.gen_range(0..self.starts.len())]
    }

    /// The window beginning at stream offset `s`.
    pub fn window_at(&self, s: usize) -> BlockPair {
        let len = self.block_size + 1;
        let end = (s + len).min(self.tokens.len());

        let mut seq = Vec::with_capacity(len);
        seq.extend_from_slice(&self.tokens[s..end]);
        seq.resize(len, self.eos_id);

        BlockPair {
            input:  seq[..self.block_size].to_vec(),
            target: seq[1..].to_vec(),
        }
    }
}

impl Dataset<BlockPair> for BlockPairDataset {
    fn get(&self, index: usize) -> Option<BlockPair> {
        match self.sampling {
            Sampling::Random { samples_per_epoch, .. } => {
                (index < samples_per_epoch).then(|| self.window_at(self.random_start()))
            }
            Sampling::Sequential => self.starts.get(index).map(|&s| self.window_at(s)),
        }
    }

    fn len(&self) -> usize {
        match self.sampling {
            Sampling::Random { samples_per_epoch, .. } => samples_per_epoch,
            Sampling::Sequential => self.starts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOS: u32 = 0;

    // texts: [1 2 3] [4 5] [6] with an EOS after each
    fn stream() -> Vec<u32> {
        vec![1, 2, 3, EOS, 4, 5, EOS, 6, EOS]
    }

    #[test]
    fn test_starts_follow_every_eos_but_the_last() {
        let ds = BlockPairDataset::new(stream(), 4, EOS, Sampling::Sequential).unwrap();
        // the first text has no EOS before it, the last EOS has no text after it
        assert_eq!(ds.starts(), &[4, 7]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_target_is_input_shifted() {
        let ds   = BlockPairDataset::new(stream(), 3, EOS, Sampling::Sequential).unwrap();
        let pair = ds.get(0).unwrap();
        assert_eq!(pair.input, vec![4, 5, EOS]);
        assert_eq!(pair.target, vec![5, EOS, 6]);
    }

    #[test]
    fn test_window_near_end_is_padded_with_eos() {
        let ds   = BlockPairDataset::new(stream(), 4, EOS, Sampling::Sequential).unwrap();
        let pair = ds.get(1).unwrap();
        assert_eq!(pair.input, vec![6, EOS, EOS, EOS]);
        assert_eq!(pair.target, vec![EOS, EOS, EOS, EOS]);
    }

    #[test]
    fn test_sequential_past_end_is_none() {
        let ds = BlockPairDataset::new(stream(), 4, EOS, Sampling::Sequential).unwrap();
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_random_windows_start_at_boundaries() {
        let sampling = Sampling::Random { samples_per_epoch: 50, seed: 7 };
        let ds       = BlockPairDataset::new(stream(), 2, EOS, sampling).unwrap();
        assert_eq!(ds.len(), 50);

        for i in 0..50 {
            let pair = ds.get(i).unwrap();
            assert_eq!(pair.input.len(), 2);
            assert!(pair.input[0] == 4 || pair.input[0] == 6, "got {:?}", pair.input);
        }
        assert!(ds.get(50).is_none());
    }

    #[test]
    fn test_random_sampling_is_seeded() {
        let make = || {
            let ds = BlockPairDataset::new(
                stream(),
                2,
                EOS,
                Sampling::Random { samples_per_epoch: 20, seed: 3 },
            )
            .unwrap();
            (0..20).map(|i| ds.get(i).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_stream_without_boundary_is_rejected() {
        assert!(BlockPairDataset::new(vec![1, 2, EOS], 4, EOS, Sampling::Sequential).is_err());
        assert!(BlockPairDataset::new(vec![], 4, EOS, Sampling::Sequential).is_err());
    }

    #[test]
    fn test_zero_block_size_is_rejected() {
        assert!(BlockPairDataset::new(stream(), 0, EOS, Sampling::Sequential).is_err());
    }
}
