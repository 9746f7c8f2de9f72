// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one command.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

// The training workflow
pub mod train_use_case;

// Sampling text from a trained checkpoint
pub mod generate_use_case;

// Corpus statistics (text count, vocabulary, length histogram)
pub mod stats_use_case;
