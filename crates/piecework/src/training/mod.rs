//! # Vocabulary Induction
//!
//! Merge-based WordPiece vocabulary training.

mod wordpiece_trainer;

pub use wordpiece_trainer::{TrainerOptions, WordPieceTrainer};
