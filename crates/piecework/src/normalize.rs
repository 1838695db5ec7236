//! # Text Normalization
//!
//! Normalization applied before both training and encoding, so the two
//! always agree on word boundaries.

/// Case-folding and whitespace normalization.
///
/// `normalize` collapses runs of whitespace to single spaces, trims the
/// ends, and optionally lowercases. Pre-tokenization is whitespace based:
/// a "word" is a maximal run of non-whitespace characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    /// Whether to case-fold input text.
    pub lowercase: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { lowercase: true }
    }
}

impl Normalizer {
    /// Create a normalizer.
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }

    /// Normalize a text sample.
    ///
    /// ## Arguments
    /// * `text` - The raw input text.
    ///
    /// ## Returns
    /// The normalized text: single-space separated words, optionally
    /// case-folded.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            if self.lowercase {
                for c in word.chars() {
                    out.extend(c.to_lowercase());
                }
            } else {
                out.push_str(word);
            }
        }
        out
    }
}
