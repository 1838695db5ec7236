//! # Token Vocabulary
//!
//! An ordered, immutable subword vocabulary. Index order is significant:
//! the entry at index `i` has token id `i`, and the four reserved control
//! tokens always occupy ids `0..=3`.

mod io;

use crate::{
    errors::{PieceworkError, PwResult},
    types::{PwHashMap, TokenType},
};

/// The default continuation-piece marker.
///
/// A vocabulary entry carrying this prefix attaches to the previous piece
/// with no intervening space on detokenization.
pub const DEFAULT_MARKER: &str = "##";

/// The four control tokens every vocabulary reserves at ids `0..=3`.
///
/// PAD's id (0) doubles as the padding indicator for packed batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedTokens {
    /// Padding token; always id 0.
    pub pad: String,
    /// Unknown-word token; always id 1.
    pub unk: String,
    /// Sequence-start token; always id 2.
    pub start: String,
    /// Sequence-end token; always id 3.
    pub end: String,
}

impl Default for ReservedTokens {
    fn default() -> Self {
        Self {
            pad: "[PAD]".into(),
            unk: "[UNK]".into(),
            start: "[START]".into(),
            end: "[END]".into(),
        }
    }
}

impl ReservedTokens {
    /// The number of reserved tokens.
    pub const COUNT: usize = 4;

    /// The reserved token strings, in id order.
    pub fn as_array(&self) -> [&str; Self::COUNT] {
        [&self.pad, &self.unk, &self.start, &self.end]
    }
}

/// An ordered, immutable subword vocabulary.
///
/// Owns the token strings and a reverse index; cheap to share behind an
/// `Arc` and safe for concurrent reads.
#[derive(Debug, Clone)]
pub struct Vocabulary<T: TokenType> {
    entries: Vec<String>,
    index: PwHashMap<String, T>,
    reserved: ReservedTokens,
    reserved_ids: [T; ReservedTokens::COUNT],
    marker: String,
}

impl<T: TokenType> Vocabulary<T> {
    /// Build a vocabulary from reserved tokens plus ordered subword pieces.
    ///
    /// ## Arguments
    /// * `reserved` - The reserved control tokens (assigned ids `0..=3`).
    /// * `marker` - The continuation-piece marker (may be empty).
    /// * `pieces` - The non-reserved entries, in id order.
    ///
    /// ## Returns
    /// The vocabulary, or an error on duplicates or token-type overflow.
    pub fn new<I, S>(
        reserved: ReservedTokens,
        marker: impl Into<String>,
        pieces: I,
    ) -> PwResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<String> =
            reserved.as_array().iter().map(|s| (*s).to_owned()).collect();
        entries.extend(pieces.into_iter().map(Into::into));
        Self::from_ordered_entries(entries, reserved, marker)
    }

    /// Build a vocabulary from a complete ordered entry list.
    ///
    /// The first four entries must equal the reserved tokens, in order.
    pub fn from_ordered_entries(
        entries: Vec<String>,
        reserved: ReservedTokens,
        marker: impl Into<String>,
    ) -> PwResult<Self> {
        let expected = reserved.as_array();
        if entries.len() < expected.len() {
            return Err(PieceworkError::Parse(format!(
                "vocabulary has {} entries; the {} reserved tokens must be present",
                entries.len(),
                expected.len(),
            )));
        }
        for (i, name) in expected.iter().enumerate() {
            if entries[i] != *name {
                return Err(PieceworkError::Parse(format!(
                    "expected reserved token {name:?} at id {i}, found {:?}",
                    entries[i],
                )));
            }
        }

        let mut reserved_ids = [T::zero(); ReservedTokens::COUNT];
        let mut index = PwHashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.is_empty() {
                return Err(PieceworkError::Parse(format!(
                    "empty vocabulary entry at id {i}"
                )));
            }
            let id = T::from_usize(i).ok_or_else(|| {
                PieceworkError::Config(format!(
                    "vocabulary size {} exceeds token type capacity",
                    entries.len(),
                ))
            })?;
            if index.insert(entry.clone(), id).is_some() {
                return Err(PieceworkError::Parse(format!(
                    "duplicate vocabulary entry {entry:?}"
                )));
            }
            if i < ReservedTokens::COUNT {
                reserved_ids[i] = id;
            }
        }

        Ok(Self {
            entries,
            index,
            reserved,
            reserved_ids,
            marker: marker.into(),
        })
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vocabulary is empty (never true for a valid vocabulary).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The ordered entry list.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The reserved control tokens.
    pub fn reserved(&self) -> &ReservedTokens {
        &self.reserved
    }

    /// The continuation-piece marker.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// The padding token id.
    pub fn pad_id(&self) -> T {
        self.reserved_ids[0]
    }

    /// The unknown-word token id.
    pub fn unk_id(&self) -> T {
        self.reserved_ids[1]
    }

    /// The sequence-start token id.
    pub fn start_id(&self) -> T {
        self.reserved_ids[2]
    }

    /// The sequence-end token id.
    pub fn end_id(&self) -> T {
        self.reserved_ids[3]
    }

    /// Look up the id of an entry, if present.
    pub fn lookup(&self, piece: &str) -> Option<T> {
        self.index.get(piece).copied()
    }

    /// Look up a piece as a continuation (marker-prefixed) entry.
    pub fn lookup_continuation(&self, piece: &str) -> Option<T> {
        if self.marker.is_empty() {
            return self.lookup(piece);
        }
        let mut key = String::with_capacity(self.marker.len() + piece.len());
        key.push_str(&self.marker);
        key.push_str(piece);
        self.lookup(&key)
    }

    /// The id of a token string.
    ///
    /// Intended for reserved-token lookups, which are guaranteed present.
    ///
    /// ## Returns
    /// The id, or [`PieceworkError::UnknownToken`] if absent.
    pub fn id_of(&self, token: &str) -> PwResult<T> {
        self.lookup(token)
            .ok_or_else(|| PieceworkError::UnknownToken {
                token: token.to_owned(),
            })
    }

    /// The entry string for a token id, if in range.
    pub fn token(&self, id: T) -> Option<&str> {
        id.to_usize()
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    /// Whether an entry is a continuation piece.
    ///
    /// With an empty marker every piece attaches to its predecessor;
    /// subword boundaries are then not recoverable from flat ids.
    pub fn is_continuation(&self, piece: &str) -> bool {
        piece.starts_with(self.marker.as_str())
    }

    /// Strip the continuation marker from a piece, if present.
    pub fn strip_marker<'a>(&self, piece: &'a str) -> &'a str {
        piece.strip_prefix(self.marker.as_str()).unwrap_or(piece)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_vocab() -> Vocabulary<u32> {
        Vocabulary::new(
            ReservedTokens::default(),
            DEFAULT_MARKER,
            ["go", "##ing", "o", "##o"],
        )
        .unwrap()
    }

    #[test]
    fn test_reserved_ids() {
        let vocab = small_vocab();
        assert_eq!(vocab.pad_id(), 0);
        assert_eq!(vocab.unk_id(), 1);
        assert_eq!(vocab.start_id(), 2);
        assert_eq!(vocab.end_id(), 3);
        assert_eq!(vocab.id_of("[START]").unwrap(), 2);
        assert_eq!(vocab.len(), 8);
    }

    #[test]
    fn test_lookup_and_marker() {
        let vocab = small_vocab();
        assert_eq!(vocab.lookup("go"), Some(4));
        assert_eq!(vocab.lookup("ing"), None);
        assert_eq!(vocab.lookup_continuation("ing"), Some(5));
        assert_eq!(vocab.token(5), Some("##ing"));
        assert_eq!(vocab.token(100), None);
        assert!(vocab.is_continuation("##ing"));
        assert!(!vocab.is_continuation("go"));
        assert_eq!(vocab.strip_marker("##ing"), "ing");
        assert_eq!(vocab.strip_marker("go"), "go");
    }

    #[test]
    fn test_unknown_token_lookup_fails() {
        let vocab = small_vocab();
        assert!(matches!(
            vocab.id_of("nope"),
            Err(PieceworkError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let result = Vocabulary::<u32>::new(
            ReservedTokens::default(),
            DEFAULT_MARKER,
            ["go", "go"],
        );
        assert!(matches!(result, Err(PieceworkError::Parse(_))));
    }

    #[test]
    fn test_reserved_order_enforced() {
        let entries = vec![
            "[UNK]".to_owned(),
            "[PAD]".to_owned(),
            "[START]".to_owned(),
            "[END]".to_owned(),
        ];
        let result = Vocabulary::<u32>::from_ordered_entries(
            entries,
            ReservedTokens::default(),
            DEFAULT_MARKER,
        );
        assert!(matches!(result, Err(PieceworkError::Parse(_))));
    }

    #[test]
    fn test_token_type_capacity() {
        let pieces = (0..300).map(|i| format!("p{i}"));
        let result =
            Vocabulary::<u8>::new(ReservedTokens::default(), DEFAULT_MARKER, pieces);
        assert!(matches!(result, Err(PieceworkError::Config(_))));
    }
}
