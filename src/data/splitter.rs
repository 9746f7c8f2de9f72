// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Splits the token stream into two contiguous parts:
//   - Training stream:   the first floor(len * fraction) tokens
//   - Validation stream: everything after that
//
// The stream is NOT shuffled: texts stay in corpus order and the
// split point may fall in the middle of a text. The dataset only
// starts windows after an EOS, so a partial text at the head of the
// validation stream is never used as a window start.
//
// Reference: Rust Book §8 (Vectors and Slices)

/// Split `ids` into (train, validation) at `floor(len * train_fraction)`.
pub fn split_stream(ids: &[u32], train_fraction: f64) -> (Vec<u32>, Vec<u32>) {
    let total    = ids.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)) as usize;
    let split_at = split_at.min(total);

    let (train, val) = ids.split_at(split_at);

    tracing::debug!(
        "Stream split: {} training tokens, {} validation tokens",
        train.len(),
        val.len(),
    );

    (train.to_vec(), val.to_vec())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_floor() {
        let ids: Vec<u32> = (0..101).collect();
        let (train, val)  = split_stream(&ids, 0.9);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(), 11);
    }

    #[test]
    fn test_split_keeps_order() {
        let ids: Vec<u32> = (0..10).collect();
        let (train, val)  = split_stream(&ids, 0.5);
        assert_eq!(train, vec![0, 1, 2, 3, 4]);
        assert_eq!(val, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_empty_stream() {
        let (train, val) = split_stream(&[], 0.8);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let ids: Vec<u32> = (0..10).collect();
        let (train, val)  = split_stream(&ids, 1.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
