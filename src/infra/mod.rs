// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Files on disk that outlive a single run:
//
//   checkpoint.rs      - model weights, optimizer state, progress
//                        counters, config and vocabulary of a run
//                        (Burn CompactRecorder + JSON side files)
//
//   tokenizer_store.rs - the tokenizer.json belonging to a
//                        checkpoint directory: reused, copied in,
//                        or built from the corpus
//
//   metrics.rs         - the loss curve as CSV, one row per
//                        evaluation point
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer installation, building and loading
pub mod tokenizer_store;

/// Loss curve CSV logger
pub mod metrics;
