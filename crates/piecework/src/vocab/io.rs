//! # Vocabulary File I/O
//!
//! The only persisted artifact the core needs: one token string per line,
//! order-significant, reserved tokens in the fixed leading positions.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{
    errors::{PieceworkError, PwResult},
    types::TokenType,
    vocab::{ReservedTokens, Vocabulary},
};

impl<T: TokenType> Vocabulary<T> {
    /// Write the vocabulary, one entry per line, in id order.
    pub fn write_to<W: Write>(&self, writer: W) -> PwResult<()> {
        let mut writer = BufWriter::new(writer);
        for entry in self.entries() {
            writeln!(writer, "{entry}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a vocabulary from a line-per-entry stream.
    ///
    /// ## Arguments
    /// * `reader` - The input stream.
    /// * `reserved` - The expected reserved tokens.
    /// * `marker` - The continuation-piece marker.
    ///
    /// ## Returns
    /// The vocabulary; empty lines and duplicates are parse errors.
    pub fn read_from<R: Read>(
        reader: R,
        reserved: ReservedTokens,
        marker: impl Into<String>,
    ) -> PwResult<Self> {
        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                return Err(PieceworkError::Parse(format!(
                    "empty vocabulary entry on line {}",
                    lineno + 1,
                )));
            }
            entries.push(line);
        }
        Self::from_ordered_entries(entries, reserved, marker)
    }

    /// Save the vocabulary to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> PwResult<()> {
        self.write_to(File::create(path)?)
    }

    /// Load a vocabulary from a file.
    pub fn load(
        path: impl AsRef<Path>,
        reserved: ReservedTokens,
        marker: impl Into<String>,
    ) -> PwResult<Self> {
        Self::read_from(File::open(path)?, reserved, marker)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use crate::vocab::{DEFAULT_MARKER, ReservedTokens, Vocabulary};

    #[test]
    fn test_vocab_file_roundtrip() {
        let vocab = Vocabulary::<u32>::new(
            ReservedTokens::default(),
            DEFAULT_MARKER,
            ["go", "##ing", "a", "##b"],
        )
        .unwrap();

        let dir = TempDir::new("piecework").unwrap();
        let path = dir.path().join("vocab.txt");

        vocab.save(&path).unwrap();
        let loaded =
            Vocabulary::<u32>::load(&path, ReservedTokens::default(), DEFAULT_MARKER)
                .unwrap();

        assert_eq!(loaded.entries(), vocab.entries());
        assert_eq!(loaded.lookup("##ing"), Some(5));
    }

    #[test]
    fn test_read_rejects_missing_reserved() {
        let data = "go\n##ing\n";
        let result = Vocabulary::<u32>::read_from(
            data.as_bytes(),
            ReservedTokens::default(),
            DEFAULT_MARKER,
        );
        assert!(result.is_err());
    }
}
