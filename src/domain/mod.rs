// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe the corpus the model is trained on.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Sorted, contiguous re-indexing of the token ids that actually occur
pub mod vocab;

// The encoded token stream plus per-text statistics
pub mod corpus;

// Core abstractions (traits) that other layers implement
pub mod traits;

/// Marker placed between texts in the token stream and used as padding.
pub const EOS_TOKEN: &str = "<|endoftext|>";
