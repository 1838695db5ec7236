//! # WordPiece Vocab Trainer
//!
//! Iterative merge-based induction: start from single characters, then
//! repeatedly merge the adjacent symbol pair with the best score
//! `count(pair) / (count(left) * count(right))`, which favors
//! rare-but-co-occurring pairs over high-frequency filler merges.

use compact_str::CompactString;

use crate::{
    errors::{PieceworkError, PwResult},
    normalize::Normalizer,
    types::{Pair, PwHashMap, TokenType},
    vocab::{DEFAULT_MARKER, ReservedTokens, Vocabulary},
};

/// Options for [`WordPieceTrainer`].
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    /// The target vocabulary size, reserved tokens included.
    pub vocab_size: usize,

    /// The reserved control tokens.
    pub reserved: ReservedTokens,

    /// The continuation-piece marker.
    pub marker: String,

    /// Whether to case-fold the corpus.
    pub lowercase: bool,

    /// Merges with a best pair count below this stop training.
    pub min_pair_frequency: u64,
}

impl TrainerOptions {
    /// Create options with the default reserved tokens and marker.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            reserved: ReservedTokens::default(),
            marker: DEFAULT_MARKER.to_owned(),
            lowercase: true,
            min_pair_frequency: 1,
        }
    }

    /// Sets the reserved control tokens.
    pub fn with_reserved(
        self,
        reserved: ReservedTokens,
    ) -> Self {
        Self { reserved, ..self }
    }

    /// Sets the continuation-piece marker.
    pub fn with_marker(
        self,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            marker: marker.into(),
            ..self
        }
    }

    /// Sets case-folding.
    pub fn with_lowercase(
        self,
        lowercase: bool,
    ) -> Self {
        Self { lowercase, ..self }
    }

    /// Sets the minimum pair frequency cutoff.
    pub fn with_min_pair_frequency(
        self,
        min_pair_frequency: u64,
    ) -> Self {
        Self {
            min_pair_frequency,
            ..self
        }
    }

    /// Initializes a [`WordPieceTrainer`] from these options.
    pub fn init(self) -> WordPieceTrainer {
        WordPieceTrainer::new(self)
    }
}

/// Learns a WordPiece vocabulary from word frequencies.
///
/// `feed` may be called repeatedly to accumulate counts across sample
/// streams; `train` consumes the trainer and produces the vocabulary.
pub struct WordPieceTrainer {
    options: TrainerOptions,
    normalizer: Normalizer,
    word_counts: PwHashMap<CompactString, u64>,
}

impl WordPieceTrainer {
    /// Create a trainer.
    pub fn new(options: TrainerOptions) -> Self {
        let normalizer = Normalizer::new(options.lowercase);
        Self {
            options,
            normalizer,
            word_counts: PwHashMap::default(),
        }
    }

    /// Update word counts from a sample iterator.
    pub fn feed<I>(
        &mut self,
        samples: I,
    ) where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for sample in samples {
            let normalized = self.normalizer.normalize(sample.as_ref());
            for word in normalized.split_whitespace() {
                *self
                    .word_counts
                    .entry(CompactString::from(word))
                    .or_default() += 1;
            }
        }
    }

    /// The number of distinct words observed so far.
    pub fn distinct_words(&self) -> usize {
        self.word_counts.len()
    }

    /// Run WordPiece induction over the accumulated counts.
    ///
    /// The resulting vocabulary orders entries as: reserved tokens, the
    /// observed single-character alphabet, then merged pieces in creation
    /// order.
    ///
    /// ## Returns
    /// The vocabulary, or [`PieceworkError::Config`] if `vocab_size`
    /// cannot hold the reserved tokens plus the observed alphabet.
    pub fn train<T: TokenType>(self) -> PwResult<Vocabulary<T>> {
        let options = self.options;
        let marker = options.marker.as_str();

        // Deterministic word order: counts are shard-mergeable, so stream
        // order is not; sort lexicographically instead.
        let mut word_counts: Vec<(CompactString, u64)> =
            self.word_counts.into_iter().collect();
        word_counts.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        // Symbol table; symbol order is final vocabulary order.
        let mut pieces: Vec<String> = Vec::new();
        let mut piece_ids: PwHashMap<String, u32> = PwHashMap::default();

        // Decompose words into single-character symbol sequences, with
        // non-initial characters marker-prefixed.
        let mut words: Vec<Vec<u32>> = Vec::with_capacity(word_counts.len());
        let mut counts: Vec<u64> = Vec::with_capacity(word_counts.len());
        for (word, count) in &word_counts {
            let mut symbols = Vec::new();
            let mut initial = true;
            for c in word.chars() {
                let piece = if initial {
                    c.to_string()
                } else {
                    format!("{marker}{c}")
                };
                initial = false;
                symbols.push(intern(&mut pieces, &mut piece_ids, piece));
            }
            words.push(symbols);
            counts.push(*count);
        }

        let alphabet_len = pieces.len();
        let reserved_len = ReservedTokens::COUNT;
        if options.vocab_size < reserved_len + alphabet_len {
            return Err(PieceworkError::Config(format!(
                "vocab size {} cannot hold {reserved_len} reserved tokens \
                 plus {alphabet_len} alphabet pieces",
                options.vocab_size,
            )));
        }

        let budget = options.vocab_size - reserved_len;
        let num_merges = budget - alphabet_len;
        log::info!(
            "wordpiece training: {} distinct words, {alphabet_len} alphabet pieces, \
             up to {num_merges} merges",
            words.len(),
        );

        let mut merges_done = 0;
        let mut last_percent = 0;
        while pieces.len() < budget {
            let (pair_counts, symbol_counts) = count_pairs(&words, &counts);
            let Some((pair, count)) = select_best(&pair_counts, &symbol_counts)
            else {
                break;
            };
            if count < options.min_pair_frequency {
                break;
            }

            // New piece: left ++ right with the right's marker stripped.
            let left = pieces[pair.0 as usize].as_str();
            let right = pieces[pair.1 as usize].as_str();
            let mut merged = String::with_capacity(left.len() + right.len());
            merged.push_str(left);
            merged.push_str(right.strip_prefix(marker).unwrap_or(right));

            let new_id = intern(&mut pieces, &mut piece_ids, merged);
            apply_merge(&mut words, pair, new_id);

            merges_done += 1;
            if num_merges > 0 {
                let percent = merges_done * 100 / num_merges;
                if percent > last_percent {
                    log::info!(
                        "wordpiece training progress: {percent}% \
                         ({merges_done}/{num_merges} merges, last pair count {count})",
                    );
                    last_percent = percent;
                }
            }
        }

        Vocabulary::new(options.reserved, options.marker.clone(), pieces)
    }
}

/// Intern a piece, returning its symbol id.
///
/// Distinct merge paths can produce the same piece string; those resolve
/// to the existing id rather than a duplicate entry.
fn intern(
    pieces: &mut Vec<String>,
    piece_ids: &mut PwHashMap<String, u32>,
    piece: String,
) -> u32 {
    if let Some(&id) = piece_ids.get(piece.as_str()) {
        return id;
    }
    let id = pieces.len() as u32;
    pieces.push(piece.clone());
    piece_ids.insert(piece, id);
    id
}

/// Tally one word's symbol and adjacent-pair occurrences.
fn tally(
    word: &[u32],
    weight: u64,
    pairs: &mut PwHashMap<Pair<u32>, u64>,
    symbols: &mut PwHashMap<u32, u64>,
) {
    for &symbol in word {
        *symbols.entry(symbol).or_default() += weight;
    }
    for window in word.windows(2) {
        *pairs.entry((window[0], window[1])).or_default() += weight;
    }
}

/// Sum the entries of `extra` into `base`.
#[cfg(feature = "rayon")]
fn merge_counts<K: core::hash::Hash + Eq>(
    mut base: PwHashMap<K, u64>,
    extra: PwHashMap<K, u64>,
) -> PwHashMap<K, u64> {
    for (key, value) in extra {
        *base.entry(key).or_default() += value;
    }
    base
}

/// Count adjacent pairs and symbol occurrences across the corpus.
///
/// Partial counts from independent shards merge by summation; the merge
/// decision downstream is order-independent.
#[cfg(feature = "rayon")]
fn count_pairs(
    words: &[Vec<u32>],
    counts: &[u64],
) -> (PwHashMap<Pair<u32>, u64>, PwHashMap<u32, u64>) {
    use rayon::prelude::*;

    words
        .par_iter()
        .zip(counts.par_iter())
        .fold(
            || (PwHashMap::default(), PwHashMap::default()),
            |(mut pairs, mut symbols), (word, &weight)| {
                tally(word, weight, &mut pairs, &mut symbols);
                (pairs, symbols)
            },
        )
        .reduce(
            || (PwHashMap::default(), PwHashMap::default()),
            |a, b| (merge_counts(a.0, b.0), merge_counts(a.1, b.1)),
        )
}

/// Count adjacent pairs and symbol occurrences across the corpus.
#[cfg(not(feature = "rayon"))]
fn count_pairs(
    words: &[Vec<u32>],
    counts: &[u64],
) -> (PwHashMap<Pair<u32>, u64>, PwHashMap<u32, u64>) {
    let mut pairs = PwHashMap::default();
    let mut symbols = PwHashMap::default();
    for (word, &weight) in words.iter().zip(counts) {
        tally(word, weight, &mut pairs, &mut symbols);
    }
    (pairs, symbols)
}

/// Pick the pair with the best WordPiece score.
///
/// Ties break to the ascending `(left, right)` symbol-id pair, which is
/// deterministic and independent of hash iteration order.
fn select_best(
    pair_counts: &PwHashMap<Pair<u32>, u64>,
    symbol_counts: &PwHashMap<u32, u64>,
) -> Option<(Pair<u32>, u64)> {
    let mut best: Option<(f64, Pair<u32>, u64)> = None;

    for (&pair, &count) in pair_counts {
        let left = symbol_counts.get(&pair.0).copied().unwrap_or(0);
        let right = symbol_counts.get(&pair.1).copied().unwrap_or(0);
        if left == 0 || right == 0 {
            continue;
        }
        let score = count as f64 / (left as f64 * right as f64);

        let better = match best {
            None => true,
            Some((best_score, best_pair, _)) => {
                score > best_score || (score == best_score && pair < best_pair)
            }
        };
        if better {
            best = Some((score, pair, count));
        }
    }

    best.map(|(_, pair, count)| (pair, count))
}

/// Replace every adjacent `(left, right)` occurrence with the merged
/// symbol, left to right.
fn apply_merge(
    words: &mut [Vec<u32>],
    pair: Pair<u32>,
    new_id: u32,
) {
    for word in words.iter_mut() {
        if word.len() < 2 {
            continue;
        }
        let mut merged = Vec::with_capacity(word.len());
        let mut i = 0;
        while i < word.len() {
            if i + 1 < word.len() && word[i] == pair.0 && word[i + 1] == pair.1 {
                merged.push(new_id);
                i += 2;
            } else {
                merged.push(word[i]);
                i += 1;
            }
        }
        *word = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_merge() {
        let mut trainer = TrainerOptions::new(7).init();
        trainer.feed(["ab ab ab"]);
        assert_eq!(trainer.distinct_words(), 1);

        // Alphabet: "a", "##b"; one merge slot -> "ab".
        let vocab: Vocabulary<u32> = trainer.train().unwrap();
        assert_eq!(
            vocab.entries(),
            &["[PAD]", "[UNK]", "[START]", "[END]", "a", "##b", "ab"]
        );
    }

    #[test]
    fn test_scoring_favors_rare_co_occurring_pairs() {
        // Pair counts: (a, ##b) = 2, (c, ##d) = 1.
        // Scores: 2 / (2 * 2) = 0.5 vs 1 / (1 * 1) = 1.0.
        // The rarer-but-exclusive pair merges first.
        let mut trainer = TrainerOptions::new(9).init();
        trainer.feed(["ab ab cd"]);

        let vocab: Vocabulary<u32> = trainer.train().unwrap();
        assert_eq!(vocab.entries()[8], "cd");
    }

    #[test]
    fn test_merges_stop_when_no_pairs_remain() {
        // Single-character words have no pairs; training stops early and
        // the vocabulary stays below the target size.
        let mut trainer = TrainerOptions::new(64).init();
        trainer.feed(["a b a"]);

        let vocab: Vocabulary<u32> = trainer.train().unwrap();
        assert_eq!(
            vocab.entries(),
            &["[PAD]", "[UNK]", "[START]", "[END]", "a", "b"]
        );
    }

    #[test]
    fn test_vocab_size_too_small() {
        let mut trainer = TrainerOptions::new(5).init();
        trainer.feed(["abcdef"]);

        assert!(matches!(
            trainer.train::<u32>(),
            Err(PieceworkError::Config(_))
        ));
    }

    #[test]
    fn test_min_pair_frequency_cutoff() {
        // Every pair occurs once; a cutoff of 2 stops all merging.
        let mut trainer = TrainerOptions::new(32)
            .with_min_pair_frequency(2)
            .init();
        trainer.feed(["abc"]);

        let vocab: Vocabulary<u32> = trainer.train().unwrap();
        assert_eq!(
            vocab.entries(),
            &["[PAD]", "[UNK]", "[START]", "[END]", "a", "##b", "##c"]
        );
    }

    #[test]
    fn test_feed_accumulates_and_case_folds() {
        let mut trainer = TrainerOptions::new(16).init();
        trainer.feed(["Ab AB"]);
        trainer.feed(["ab"]);
        assert_eq!(trainer.distinct_words(), 1);
    }

    #[test]
    fn test_determinism_across_runs() {
        let corpus = ["the cat sat", "the mat", "a cat"];

        let train = || {
            let mut trainer = TrainerOptions::new(24).init();
            trainer.feed(corpus);
            trainer.train::<u32>().unwrap()
        };

        assert_eq!(train().entries(), train().entries());
    }
}
