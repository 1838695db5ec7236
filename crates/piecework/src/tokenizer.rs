//! # WordPiece Tokenizer
//!
//! Greedy longest-match-first subword segmentation over an immutable
//! [`Vocabulary`], and its inverse.

use std::sync::Arc;

use crate::{
    errors::{PieceworkError, PwResult},
    normalize::Normalizer,
    types::TokenType,
    vocab::Vocabulary,
};

/// Greedy longest-match subword tokenizer.
///
/// Stateless after construction: `encode` and `decode` are pure functions
/// of the input and the fixed vocabulary, safe for concurrent calls.
#[derive(Debug, Clone)]
pub struct WordPieceTokenizer<T: TokenType> {
    vocab: Arc<Vocabulary<T>>,
    normalizer: Normalizer,
}

impl<T: TokenType> WordPieceTokenizer<T> {
    /// Create a tokenizer with the default [`Normalizer`].
    pub fn new(vocab: Arc<Vocabulary<T>>) -> Self {
        Self {
            vocab,
            normalizer: Normalizer::default(),
        }
    }

    /// Replace the normalizer.
    pub fn with_normalizer(
        self,
        normalizer: Normalizer,
    ) -> Self {
        Self { normalizer, ..self }
    }

    /// The underlying vocabulary.
    pub fn vocab(&self) -> &Arc<Vocabulary<T>> {
        &self.vocab
    }

    /// The normalizer applied before segmentation.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// The id of a token string; see [`Vocabulary::id_of`].
    pub fn id_of(
        &self,
        token: &str,
    ) -> PwResult<T> {
        self.vocab.id_of(token)
    }

    /// Encode text into subword token ids.
    ///
    /// No bracketing tokens are added; that is a packing-stage concern.
    pub fn encode(
        &self,
        text: &str,
    ) -> Vec<T> {
        let normalized = self.normalizer.normalize(text);
        let mut tokens = Vec::new();
        for word in normalized.split_whitespace() {
            self.encode_word(word, &mut tokens);
        }
        tokens
    }

    /// Encode a batch of texts.
    ///
    /// Parallel across the batch under the `rayon` feature.
    pub fn encode_batch<S>(
        &self,
        batch: &[S],
    ) -> Vec<Vec<T>>
    where
        S: AsRef<str> + Sync,
    {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            return batch.par_iter().map(|text| self.encode(text.as_ref())).collect();
        }

        #[cfg(not(feature = "rayon"))]
        {
            batch.iter().map(|text| self.encode(text.as_ref())).collect()
        }
    }

    /// Greedy longest-match-first segmentation of a single word.
    ///
    /// All-or-nothing: a word with any unmatchable position collapses to a
    /// single UNK id rather than a partial decomposition.
    fn encode_word(
        &self,
        word: &str,
        tokens: &mut Vec<T>,
    ) {
        let word_start = tokens.len();
        let mut pos = 0;

        while pos < word.len() {
            let remaining = &word[pos..];
            let mut matched = None;

            // Longest candidate first; candidates end on char boundaries.
            for end in remaining.char_indices().map(|(i, c)| i + c.len_utf8()).rev() {
                let piece = &remaining[..end];
                let id = if pos == 0 {
                    self.vocab.lookup(piece)
                } else {
                    self.vocab.lookup_continuation(piece)
                };
                if let Some(id) = id {
                    matched = Some((id, end));
                    break;
                }
            }

            match matched {
                Some((id, end)) => {
                    tokens.push(id);
                    pos += end;
                }
                None => {
                    tokens.truncate(word_start);
                    tokens.push(self.vocab.unk_id());
                    return;
                }
            }
        }
    }

    /// Decode token ids back into text.
    ///
    /// Word-initial pieces are space-separated; continuation pieces attach
    /// with the marker stripped. PAD/START/END are skipped; UNK renders
    /// its literal. `decode(encode(t))` reproduces `normalize(t)` unless
    /// UNK substitution occurred.
    pub fn decode(
        &self,
        tokens: &[T],
    ) -> PwResult<String> {
        let vocab = &self.vocab;
        let mut out = String::new();

        for &id in tokens {
            let piece = vocab.token(id).ok_or_else(|| PieceworkError::TokenOutOfRange {
                id: id.to_usize().unwrap_or(usize::MAX),
                size: vocab.len(),
            })?;

            if id == vocab.pad_id() || id == vocab.start_id() || id == vocab.end_id() {
                continue;
            }

            if vocab.is_continuation(piece) {
                out.push_str(vocab.strip_marker(piece));
            } else {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(piece);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::{check_is_send, check_is_sync},
        vocab::{DEFAULT_MARKER, ReservedTokens},
    };

    fn marked_tokenizer() -> WordPieceTokenizer<u32> {
        let vocab = Vocabulary::new(
            ReservedTokens::default(),
            DEFAULT_MARKER,
            [
                "go", "##ing", "##ne", "the", "cat", "##s", "g", "o", "##o", "##i",
                "##n", "##g",
            ],
        )
        .unwrap();
        WordPieceTokenizer::new(Arc::new(vocab))
    }

    #[test]
    fn test_tokenizer_is_shareable() {
        let tokenizer = marked_tokenizer();
        check_is_send(&tokenizer);
        check_is_sync(&tokenizer);
    }

    #[test]
    fn test_encode_longest_match() {
        let tokenizer = marked_tokenizer();
        // "go" + "##ing" beats the char-level decomposition.
        assert_eq!(tokenizer.encode("going"), vec![4, 5]);
        assert_eq!(tokenizer.encode("gone"), vec![4, 6]);
        assert_eq!(tokenizer.encode("the cats"), vec![7, 8, 9]);
    }

    #[test]
    fn test_unmarked_vocab_scenario() {
        // Vocabulary with an empty continuation marker: pieces attach
        // directly, as in ["go", "ing"] -> "going".
        let vocab = Vocabulary::<u32>::new(
            ReservedTokens::default(),
            "",
            ["go", "ing", "o", "i", "n", "g"],
        )
        .unwrap();
        let tokenizer = WordPieceTokenizer::new(Arc::new(vocab));

        let tokens = tokenizer.encode("going");
        assert_eq!(tokens, vec![4, 5]);
        assert_eq!(tokenizer.decode(&tokens).unwrap(), "going");
    }

    #[test]
    fn test_unknown_word_is_all_or_nothing() {
        let tokenizer = marked_tokenizer();
        // 'x' is not in the vocabulary; the whole word becomes UNK even
        // though "go" would match a prefix.
        assert_eq!(tokenizer.encode("gox"), vec![1]);
        assert_eq!(tokenizer.encode("go gox going"), vec![4, 1, 4, 5]);
    }

    #[test]
    fn test_decode_roundtrip() {
        let tokenizer = marked_tokenizer();
        let text = "the cats going";
        let tokens = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
    }

    #[test]
    fn test_decode_skips_control_tokens() {
        let tokenizer = marked_tokenizer();
        // [START] go ##ing [END] [PAD]
        assert_eq!(tokenizer.decode(&[2, 4, 5, 3, 0]).unwrap(), "going");
        // UNK renders its literal.
        assert_eq!(tokenizer.decode(&[1, 4]).unwrap(), "[UNK] go");
    }

    #[test]
    fn test_decode_out_of_range() {
        let tokenizer = marked_tokenizer();
        assert!(matches!(
            tokenizer.decode(&[999]),
            Err(PieceworkError::TokenOutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_batch_matches_encode() {
        let tokenizer = marked_tokenizer();
        let batch = ["going", "the cats", "gox"];
        let encoded = tokenizer.encode_batch(&batch);
        assert_eq!(encoded.len(), 3);
        for (text, tokens) in batch.iter().zip(&encoded) {
            assert_eq!(&tokenizer.encode(text), tokens);
        }
    }

    mod properties {
        use proptest::prelude::*;

        use super::marked_tokenizer;
        use crate::normalize::Normalizer;

        proptest! {
            /// In-vocabulary text round-trips through encode/decode, up to
            /// whitespace normalization.
            #[test]
            fn roundtrip_in_vocab(text in "[go ]{0,24}") {
                let tokenizer = marked_tokenizer();
                let expected = Normalizer::default().normalize(&text);
                let tokens = tokenizer.encode(&text);
                prop_assert_eq!(tokenizer.decode(&tokens).unwrap(), expected);
            }
        }
    }
}
