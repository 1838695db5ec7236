//! # `piecework` — Subword Tokenization and Decoding Core
//!
//! The reusable machinery under a translation pipeline:
//!
//! * [`training`] to induce a WordPiece [`vocab::Vocabulary`] from a corpus.
//! * [`tokenizer`] to encode text into subword token ids and back.
//! * [`packing`] to pack token sequences into fixed-width batches.
//! * [`generation`] to run greedy or nucleus (top-p) autoregressive search
//!   over a black-box next-token-probability source.
//!
//! The neural model itself is an external collaborator: it consumes packed
//! batches and supplies a [`generation::TokenPredictor`].
//!
//! ## Crate Features
//!
//! #### feature: ``rayon``
//!
//! Batch-level and counting parallelism using the ``rayon`` crate.
//!
//! #### feature: ``training``
//!
//! The training feature enables vocabulary induction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use piecework::generation::GenerationOptions;
//! use piecework::packing::PackerOptions;
//! use piecework::training::TrainerOptions;
//! use piecework::{Vocabulary, WordPieceTokenizer};
//!
//! let mut trainer = TrainerOptions::new(8_000).init();
//! trainer.feed(corpus_lines);
//! let vocab: Arc<Vocabulary<u32>> = trainer.train()?.into();
//!
//! let tokenizer = WordPieceTokenizer::new(vocab.clone());
//! let tokens = tokenizer.encode("a sample sentence");
//!
//! let packer = PackerOptions::new(64, vocab.pad_id())
//!     .with_start(vocab.start_id())
//!     .with_end(vocab.end_id())
//!     .init();
//! let batch = packer.pack_batch(&[tokens]);
//!
//! let engine = GenerationOptions::new(vocab.len(), 64, vocab.end_id()).init();
//! let outputs = engine.generate(&mut model, &prompts, &mut rng)?;
//! ```
#![warn(missing_docs, unused)]

pub mod errors;
pub mod generation;
pub mod normalize;
pub mod packing;
pub mod tokenizer;
pub mod types;
pub mod vocab;

#[cfg(feature = "training")]
pub mod training;

pub use errors::{PieceworkError, PwResult};
pub use tokenizer::WordPieceTokenizer;
pub use types::TokenType;
pub use vocab::{ReservedTokens, Vocabulary};
