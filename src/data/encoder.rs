// ============================================================
// Layer 4 - Corpus Encoder
// ============================================================
// Turns a list of short texts into ONE token stream:
//
//   ["mayor opens bridge", "rain again"]
//       │ tokenize each text, append EOS after every text
//       ▼
//   [mayor, opens, bridge, EOS, rain, again, EOS]     (original ids)
//       │ compact the ids (see domain::vocab)
//       ▼
//   [2, 3, 1, 0, 4, 5, 0]                             (compact ids)
//
// The EOS token separates texts and later pads short windows.

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

use crate::domain::{
    corpus::TokenCorpus,
    traits::TextCodec,
    vocab::CompactVocab,
    EOS_TOKEN,
};

/// Original tokenizer id of the end-of-text marker.
/// The marker must be a single (special) token.
pub fn eos_token_id(tokenizer: &Tokenizer) -> Result<u32> {
    tokenizer
        .token_to_id(EOS_TOKEN)
        .ok_or_else(|| anyhow!("Tokenizer has no '{EOS_TOKEN}' token"))
}

/// Tokenize every text, record its length and append EOS after it.
///
/// With `vocab == None` the vocabulary is derived from the stream.
/// With a saved vocabulary (resumed training) the stream is encoded
/// through it, failing on tokens the checkpoint has never seen.
pub fn encode_corpus(
    texts:     &[String],
    tokenizer: &Tokenizer,
    vocab:     Option<&CompactVocab>,
) -> Result<TokenCorpus> {
    let eos = eos_token_id(tokenizer)?;

    let mut stream       = Vec::new();
    let mut text_lengths = Vec::with_capacity(texts.len());

    for text in texts {
        let enc = tokenizer
            .encode(text.as_str(), false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        let ids = enc.get_ids();
        text_lengths.push(ids.len());
        stream.extend_from_slice(ids);
        stream.push(eos);
    }

    let (vocab, ids) = match vocab {
        Some(v) => {
            if v.eos_orig() != eos {
                return Err(anyhow!(
                    "Saved vocabulary was built with a different tokenizer (EOS {} vs {})",
                    v.eos_orig(),
                    eos
                ));
            }
            (v.clone(), v.encode(&stream)?)
        }
        None => CompactVocab::compact(&stream, eos)?,
    };

    tracing::debug!(
        "Encoded {} texts into {} tokens ({} distinct)",
        text_lengths.len(),
        ids.len(),
        vocab.len()
    );

    Ok(TokenCorpus { ids, vocab, text_lengths })
}

/// String conversion through a tokenizer and a compact vocabulary.
pub struct CorpusCodec {
    tokenizer: Tokenizer,
    vocab:     CompactVocab,
}

impl CorpusCodec {
    pub fn new(tokenizer: Tokenizer, vocab: CompactVocab) -> Self {
        Self { tokenizer, vocab }
    }
}

impl TextCodec for CorpusCodec {
    fn stot(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        self.vocab.encode(enc.get_ids())
    }

    fn ttos(&self, ids: &[u32], for_output: bool) -> Result<String> {
        let orig = self.vocab.decode(ids)?;
        let out  = self
            .tokenizer
            .decode(&orig, false)
            .map_err(|e| anyhow!("Decode error: {e}"))?;
        Ok(if for_output { out.replace(EOS_TOKEN, "\n") } else { out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_tokenizer;

    fn texts() -> Vec<String> {
        vec!["the cat sat".to_string(), "the dog".to_string()]
    }

    fn tokenizer() -> Tokenizer {
        build_tokenizer(&texts(), 100).unwrap()
    }

    #[test]
    fn test_eos_after_every_text() {
        let tok    = tokenizer();
        let corpus = encode_corpus(&texts(), &tok, None).unwrap();

        let eos = corpus.vocab.eos_id();
        assert_eq!(corpus.text_lengths, vec![3, 2]);
        assert_eq!(corpus.ids.len(), 3 + 1 + 2 + 1);
        assert_eq!(corpus.ids[3], eos);
        assert_eq!(corpus.ids[6], eos);
        // "the" occurs twice and maps to the same compact id
        assert_eq!(corpus.ids[0], corpus.ids[4]);
        // the, cat, sat, dog, EOS
        assert_eq!(corpus.vocab.len(), 5);
    }

    #[test]
    fn test_literal_marker_inside_text_is_eos() {
        let tok    = tokenizer();
        let input  = vec![format!("the cat{EOS_TOKEN}the dog")];
        let corpus = encode_corpus(&input, &tok, None).unwrap();

        let eos = corpus.vocab.eos_id();
        assert_eq!(corpus.ids.iter().filter(|&&id| id == eos).count(), 2);
    }

    #[test]
    fn test_reuses_saved_vocab() {
        let tok   = tokenizer();
        let first = encode_corpus(&texts(), &tok, None).unwrap();

        let subset = vec!["the cat".to_string()];
        let again  = encode_corpus(&subset, &tok, Some(&first.vocab)).unwrap();
        assert_eq!(again.vocab.len(), first.vocab.len());
        assert_eq!(&again.ids[..2], &first.ids[..2]);

        let unseen = vec!["the dog sat".to_string()];
        let narrow = encode_corpus(&subset, &tok, None).unwrap();
        assert!(encode_corpus(&unseen, &tok, Some(&narrow.vocab)).is_err());
    }

    #[test]
    fn test_codec_renders_eos_as_newline() {
        let tok    = tokenizer();
        let corpus = encode_corpus(&texts(), &tok, None).unwrap();
        let codec  = CorpusCodec::new(tok, corpus.vocab.clone());

        let ids = codec.stot("the cat").unwrap();
        assert_eq!(ids, corpus.ids[..2].to_vec());

        let mut with_eos = ids.clone();
        with_eos.push(corpus.vocab.eos_id());
        let shown = codec.ttos(&with_eos, true).unwrap();
        assert!(shown.contains('\n'));
        assert!(!shown.contains(EOS_TOKEN));
        assert!(codec.ttos(&with_eos, false).unwrap().contains(EOS_TOKEN));
    }
}
