// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits:
//   - CsvTextLoader implements TextSource
//   - CorpusCodec   implements TextCodec
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── TextSource ───────────────────────────────────────────────────────────────
/// Any component that yields the raw training texts, one per record.
pub trait TextSource {
    /// Load all texts. Empty records are already filtered out.
    fn load_texts(&self) -> Result<Vec<String>>;
}

// ─── TextCodec ────────────────────────────────────────────────────────────────
/// Conversion between strings and compact token ids.
pub trait TextCodec {
    /// String to compact ids.
    fn stot(&self, text: &str) -> Result<Vec<u32>>;

    /// Compact ids to string. With `for_output` every end-of-text
    /// marker is rendered as a newline.
    fn ttos(&self, ids: &[u32], for_output: bool) -> Result<String>;
}
