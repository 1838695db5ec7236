//! # Fixed-Width Sequence Packing
//!
//! Converts variable-length token sequences into fixed-width, padded,
//! optionally start/end-bracketed rows for batched consumption.

use crate::types::TokenType;

/// Options for [`SequencePacker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackerOptions<T: TokenType> {
    /// The fixed output width.
    pub length: usize,

    /// The padding id appended to short rows.
    pub pad_id: T,

    /// Optional sequence-start id, prepended before truncation.
    pub start_id: Option<T>,

    /// Optional sequence-end id, appended after truncation when room
    /// remains.
    pub end_id: Option<T>,
}

impl<T: TokenType> PackerOptions<T> {
    /// Create options with no bracketing tokens.
    pub fn new(
        length: usize,
        pad_id: T,
    ) -> Self {
        Self {
            length,
            pad_id,
            start_id: None,
            end_id: None,
        }
    }

    /// Sets the sequence-start id.
    pub fn with_start(
        self,
        start_id: T,
    ) -> Self {
        Self {
            start_id: Some(start_id),
            ..self
        }
    }

    /// Sets the sequence-end id.
    pub fn with_end(
        self,
        end_id: T,
    ) -> Self {
        Self {
            end_id: Some(end_id),
            ..self
        }
    }

    /// Initializes a [`SequencePacker`] from these options.
    pub fn init(self) -> SequencePacker<T> {
        SequencePacker::new(self)
    }
}

/// Packs token sequences into fixed-width rows.
///
/// Shifted input/target views over a packed row are the caller's concern;
/// the packer produces one row per sequence.
#[derive(Debug, Clone)]
pub struct SequencePacker<T: TokenType> {
    options: PackerOptions<T>,
}

impl<T: TokenType> SequencePacker<T> {
    /// Create a packer.
    pub fn new(options: PackerOptions<T>) -> Self {
        Self { options }
    }

    /// The packer options.
    pub fn options(&self) -> &PackerOptions<T> {
        &self.options
    }

    /// Pack one sequence to exactly `length` ids.
    ///
    /// The start marker participates in truncation; the end marker is
    /// appended after truncation, only when room remains, so it is never
    /// itself truncated away.
    pub fn pack(
        &self,
        sequence: &[T],
    ) -> Vec<T> {
        let o = &self.options;
        let mut row = Vec::with_capacity(o.length);
        if o.length == 0 {
            return row;
        }

        if let Some(start) = o.start_id {
            row.push(start);
        }
        for &token in sequence {
            if row.len() == o.length {
                break;
            }
            row.push(token);
        }
        if let Some(end) = o.end_id {
            if row.len() < o.length {
                row.push(end);
            }
        }
        row.resize(o.length, o.pad_id);
        row
    }

    /// Pack a batch of sequences into a [`PackedBatch`].
    pub fn pack_batch(
        &self,
        sequences: &[Vec<T>],
    ) -> PackedBatch<T> {
        let width = self.options.length;
        let mut data = Vec::with_capacity(sequences.len() * width);
        for sequence in sequences {
            data.extend(self.pack(sequence));
        }
        PackedBatch {
            data,
            rows: sequences.len(),
            width,
            pad_id: self.options.pad_id,
        }
    }
}

/// A `batch_size x sequence_length` row-major block of token ids.
///
/// Padding positions are exactly those equal to the pad id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBatch<T: TokenType> {
    data: Vec<T>,
    rows: usize,
    width: usize,
    pad_id: T,
}

impl<T: TokenType> PackedBatch<T> {
    /// The number of rows.
    pub fn batch_size(&self) -> usize {
        self.rows
    }

    /// The fixed row width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The padding id.
    pub fn pad_id(&self) -> T {
        self.pad_id
    }

    /// The flat row-major storage.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// One row.
    pub fn row(
        &self,
        index: usize,
    ) -> &[T] {
        &self.data[index * self.width..(index + 1) * self.width]
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Per-position padding indicators for one row.
    pub fn padding_mask(
        &self,
        index: usize,
    ) -> Vec<bool> {
        self.row(index).iter().map(|&t| t == self.pad_id).collect()
    }
}
