// ============================================================
// Layer 4 - Block Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<BlockPair>
// into device tensors.
//
//   Input:  Vec of N BlockPairs, each with input/target of length T
//   Output: BlockBatch with two Int tensors of shape [N, T]
//
//   All token ids of the batch are flattened into one Vec, then
//   reshaped: [s1_t1, ..., s1_tT, s2_t1, ..., sN_tT] → [N, T]
//
// Every window is already exactly T long (the dataset pads with EOS),
// so no dynamic padding happens here.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::BlockPair;

// ─── BlockBatch ───────────────────────────────────────────────────────────────
/// A batch of windows ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct BlockBatch<B: Backend> {
    /// Input token ids - shape: [batch_size, block_size]
    pub inputs: Tensor<B, 2, Int>,

    /// Next-token targets - shape: [batch_size, block_size]
    pub targets: Tensor<B, 2, Int>,
}

// ─── BlockBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct BlockBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> BlockBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<BlockPair, BlockBatch<B>> for BlockBatcher<B> {
    fn batch(&self, items: Vec<BlockPair>) -> BlockBatch<B> {
        let batch_size = items.len();
        let block_size = items.first().map(|p| p.input.len()).unwrap_or(0);

        // Burn Int tensors are built from i32 slices
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|p| p.input.iter().map(|&x| x as i32))
            .collect();

        let target_flat: Vec<i32> = items
            .iter()
            .flat_map(|p| p.target.iter().map(|&x| x as i32))
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, block_size]);

        let targets = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), &self.device)
            .reshape([batch_size, block_size]);

        BlockBatch { inputs, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_order() {
        let batcher = BlockBatcher::<TestBackend>::new(Default::default());
        let items   = vec![
            BlockPair { input: vec![1, 2, 3], target: vec![2, 3, 0] },
            BlockPair { input: vec![4, 5, 0], target: vec![5, 0, 0] },
        ];

        let batch = batcher.batch(items);
        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 3]);

        let inputs: Vec<i64> = batch
            .inputs
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(inputs, vec![1, 2, 3, 4, 5, 0]);
    }
}
