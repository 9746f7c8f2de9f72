// ============================================================
// Layer 5 - Text Generator
// ============================================================
// Autoregressive sampling from a trained model:
//
//   context = [EOS, prompt tokens...]
//   repeat max_new_tokens times:
//       logits = model(last block_size tokens of context)[last position]
//       next   = sample(softmax(logits / temperature))
//       context.push(next)
//
// A temperature of 0 picks the most likely token every time.

use anyhow::{anyhow, bail, Result};
use burn::{
    prelude::*,
    tensor::activation::softmax,
};
use rand::{distributions::{Distribution, WeightedIndex}, Rng};

use crate::ml::model::GptModel;

pub struct Generator<B: Backend> {
    model:  GptModel<B>,
    device: B::Device,
}

impl<B: Backend> Generator<B> {
    pub fn new(model: GptModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Probability distribution over the next token given `context`.
    fn next_token_probs(&self, context: &[u32], temperature: f64) -> Result<Vec<f32>> {
        let block_size = self.model.block_size;
        let window     = &context[context.len().saturating_sub(block_size)..];
        let seq_len    = window.len();

        let flat: Vec<i32> = window.iter().map(|&t| t as i32).collect();
        let inputs = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).unsqueeze::<2>();

        let logits = self.model.forward(inputs);
        let [_, _, vocab] = logits.dims();
        let last = logits
            .slice([0..1, seq_len - 1..seq_len, 0..vocab])
            .reshape([vocab]);

        // greedy decoding only needs the argmax, any positive scale works
        let temperature = if temperature > 0.0 { temperature } else { 1.0 };
        let probs = softmax(last / temperature, 0);
        probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))
    }

    /// Sample `max_new_tokens` tokens after `context`; returns only the new ones.
    pub fn generate<R: Rng>(
        &self,
        context:        &[u32],
        max_new_tokens: usize,
        temperature:    f64,
        rng:            &mut R,
    ) -> Result<Vec<u32>> {
        if context.is_empty() {
            bail!("generation needs at least one context token");
        }

        let mut tokens = context.to_vec();
        for _ in 0..max_new_tokens {
            let probs = self.next_token_probs(&tokens, temperature)?;

            let next = if temperature <= 0.0 {
                probs
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            } else {
                WeightedIndex::new(&probs)
                    .map_err(|e| anyhow!("Invalid next-token distribution: {e}"))?
                    .sample(rng)
            };
            tokens.push(next as u32);
        }

        tracing::debug!("Generated {} tokens", max_new_tokens);
        Ok(tokens.split_off(context.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::ml::model::GptConfig;

    type TestBackend = NdArray;

    fn generator() -> Generator<TestBackend> {
        let device = Default::default();
        let model  = GptConfig::new(9, 4, 8, 2, 1, 16, 0.0).init::<TestBackend>(&device);
        Generator::new(model, device)
    }

    #[test]
    fn test_generates_requested_number_of_valid_ids() {
        let g   = generator();
        let mut rng = StdRng::seed_from_u64(0);
        // context longer than block_size gets cropped
        let out = g.generate(&[0, 1, 2, 3, 4, 5], 10, 1.0, &mut rng).unwrap();

        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|&t| t < 9));
    }

    #[test]
    fn test_same_seed_same_text() {
        let g = generator();
        let a = g.generate(&[0], 6, 0.8, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = g.generate(&[0], 6, 0.8, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let g = generator();
        let a = g.generate(&[0], 5, 0.0, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = g.generate(&[0], 5, 0.0, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_context_is_rejected() {
        let g = generator();
        assert!(g.generate(&[], 3, 1.0, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
