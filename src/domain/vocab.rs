// ============================================================
// Layer 3 - Compact Vocabulary
// ============================================================
// A tokenizer may know tens of thousands of tokens while a small
// corpus of headlines only ever uses a fraction of them. The model's
// embedding table and output head are sized by the vocabulary, so the
// ids that actually occur are re-indexed to a dense range:
//
//   original ids in stream:   [  17, 9041,   17,  220, 50256 ]
//   comp2orig (sorted):       [  17,  220, 9041, 50256 ]
//   compact stream:           [   0,    2,    0,    1,     3 ]
//
// The compact id of a token is its rank among the distinct original
// ids, so the mapping is deterministic for a given corpus.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// Bidirectional mapping between tokenizer ids and compact model ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "VocabFile", into = "VocabFile")]
pub struct CompactVocab {
    /// compact id -> original tokenizer id, sorted ascending
    comp2orig: Vec<u32>,
    /// original tokenizer id -> compact id
    orig2comp: HashMap<u32, u32>,
    /// compact id of the end-of-text marker
    eos_id: u32,
}

/// On-disk form: only the sorted table and the EOS id are stored,
/// the reverse map is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct VocabFile {
    comp2orig: Vec<u32>,
    eos_id:    u32,
}

impl From<VocabFile> for CompactVocab {
    fn from(f: VocabFile) -> Self {
        Self::from_table(f.comp2orig, f.eos_id)
    }
}

impl From<CompactVocab> for VocabFile {
    fn from(v: CompactVocab) -> Self {
        VocabFile { comp2orig: v.comp2orig, eos_id: v.eos_id }
    }
}

impl CompactVocab {
    fn from_table(comp2orig: Vec<u32>, eos_id: u32) -> Self {
        let orig2comp = comp2orig
            .iter()
            .enumerate()
            .map(|(comp, &orig)| (orig, comp as u32))
            .collect();
        Self { comp2orig, orig2comp, eos_id }
    }

    /// Build the vocabulary from a stream of original ids and return it
    /// together with the stream rewritten in compact ids.
    pub fn compact(stream: &[u32], eos_orig: u32) -> Result<(Self, Vec<u32>)> {
        let mut comp2orig = stream.to_vec();
        comp2orig.sort_unstable();
        comp2orig.dedup();

        let eos_id = comp2orig
            .binary_search(&eos_orig)
            .map_err(|_| anyhow!("end-of-text token {eos_orig} never occurs in the stream"))?
            as u32;

        let vocab   = Self::from_table(comp2orig, eos_id);
        let compact = vocab.encode(stream)?;
        Ok((vocab, compact))
    }

    /// Map original tokenizer ids to compact ids.
    pub fn encode(&self, orig: &[u32]) -> Result<Vec<u32>> {
        orig.iter()
            .map(|id| {
                self.orig2comp
                    .get(id)
                    .copied()
                    .ok_or_else(|| anyhow!("token id {id} is not part of the training vocabulary"))
            })
            .collect()
    }

    /// Map compact ids back to original tokenizer ids.
    pub fn decode(&self, compact: &[u32]) -> Result<Vec<u32>> {
        compact
            .iter()
            .map(|&id| match self.comp2orig.get(id as usize) {
                Some(&orig) => Ok(orig),
                None => bail!("compact id {id} out of range (vocab size {})", self.len()),
            })
            .collect()
    }

    /// Compact id of the end-of-text marker.
    pub fn eos_id(&self) -> u32 {
        self.eos_id
    }

    /// Original tokenizer id of the end-of-text marker.
    pub fn eos_orig(&self) -> u32 {
        self.comp2orig[self.eos_id as usize]
    }

    /// Number of distinct tokens, i.e. the model's vocabulary size.
    pub fn len(&self) -> usize {
        self.comp2orig.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comp2orig.is_empty()
    }
}
