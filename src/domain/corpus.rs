use crate::domain::vocab::CompactVocab;

/// The whole corpus as one compact token stream.
///
/// Layout: `text_0 EOS text_1 EOS ... text_n EOS`
#[derive(Debug, Clone)]
pub struct TokenCorpus {
    pub ids:          Vec<u32>,
    pub vocab:        CompactVocab,
    /// Tokenized length of each text, not counting its EOS
    pub text_lengths: Vec<usize>,
}

/// One bar of the text-length histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthBin {
    pub lo:    f64,
    pub hi:    f64,
    pub count: usize,
}

impl TokenCorpus {
    pub fn text_count(&self) -> usize {
        self.text_lengths.len()
    }

    pub fn token_count(&self) -> usize {
        self.ids.len()
    }

    pub fn longest_text(&self) -> usize {
        self.text_lengths.iter().copied().max().unwrap_or(0)
    }

    /// Equal-width histogram of text lengths over `[min, max]`.
    /// The last bin is closed on the right.
    pub fn length_histogram(&self, bins: usize) -> Vec<LengthBin> {
        let bins = bins.max(1);
        let (Some(&min), Some(&max)) = (
            self.text_lengths.iter().min(),
            self.text_lengths.iter().max(),
        ) else {
            return Vec::new();
        };

        let (min, max) = (min as f64, max as f64);
        // degenerate range: everything lands in a single bin of width 1
        let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

        let mut out: Vec<LengthBin> = (0..bins)
            .map(|i| LengthBin {
                lo:    min + i as f64 * width,
                hi:    min + (i + 1) as f64 * width,
                count: 0,
            })
            .collect();

        for &len in &self.text_lengths {
            let idx = (((len as f64) - min) / width) as usize;
            out[idx.min(bins - 1)].count += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus_with_lengths(lengths: Vec<usize>) -> TokenCorpus {
        let (vocab, ids) = CompactVocab::compact(&[1, 0], 0).unwrap();
        TokenCorpus { ids, vocab, text_lengths: lengths }
    }

    #[test]
    fn test_histogram_counts_every_text() {
        let c    = corpus_with_lengths(vec![1, 2, 2, 3, 10]);
        let hist = c.length_histogram(3);

        assert_eq!(hist.len(), 3);
        assert_eq!(hist.iter().map(|b| b.count).sum::<usize>(), 5);
        // max value goes into the last bin
        assert_eq!(hist[2].count, 1);
        assert_eq!(hist[0].count, 4);
    }

    #[test]
    fn test_histogram_single_length() {
        let c    = corpus_with_lengths(vec![4, 4, 4]);
        let hist = c.length_histogram(5);
        assert_eq!(hist[0].count, 3);
    }

    #[test]
    fn test_empty_corpus_has_no_bins() {
        let c = corpus_with_lengths(vec![]);
        assert!(c.length_histogram(10).is_empty());
        assert_eq!(c.longest_text(), 0);
    }
}
