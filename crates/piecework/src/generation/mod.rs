//! # Autoregressive Decoding Engine
//!
//! Batched search over a black-box next-token-probability source.
//! The engine is polymorphic over any [`TokenPredictor`]: a neural model,
//! a lookup table, or a test mock.

mod strategy;

pub use strategy::SamplingStrategy;

use rand::Rng;

use crate::{
    errors::{PieceworkError, PwResult},
    types::TokenType,
};

/// Acceptable deviation of a probability distribution's sum from 1.
const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// Supplies next-token probability distributions for partial sequences.
///
/// Called once per generation step with the contexts of every sequence
/// still active; must return one vocabulary-sized probability simplex per
/// context, in order. Implemented for closures of the same shape.
pub trait TokenPredictor<T: TokenType> {
    /// One probability distribution per context.
    fn predict(
        &mut self,
        contexts: &[&[T]],
    ) -> PwResult<Vec<Vec<f32>>>;
}

impl<T, F> TokenPredictor<T> for F
where
    T: TokenType,
    F: FnMut(&[&[T]]) -> PwResult<Vec<Vec<f32>>>,
{
    fn predict(
        &mut self,
        contexts: &[&[T]],
    ) -> PwResult<Vec<Vec<f32>>> {
        self(contexts)
    }
}

/// Options for [`DecodingEngine`].
#[derive(Debug, Clone)]
pub struct GenerationOptions<T: TokenType> {
    /// The vocabulary size every distribution must match.
    pub vocab_size: usize,

    /// Maximum total sequence length, prompt included.
    pub max_length: usize,

    /// The id that terminates a sequence when produced.
    pub end_token: T,

    /// The next-token selection strategy.
    pub strategy: SamplingStrategy,
}

impl<T: TokenType> GenerationOptions<T> {
    /// Create options with the [`SamplingStrategy::Greedy`] strategy.
    pub fn new(
        vocab_size: usize,
        max_length: usize,
        end_token: T,
    ) -> Self {
        Self {
            vocab_size,
            max_length,
            end_token,
            strategy: SamplingStrategy::Greedy,
        }
    }

    /// Sets the selection strategy.
    pub fn with_strategy(
        self,
        strategy: SamplingStrategy,
    ) -> Self {
        Self { strategy, ..self }
    }

    /// Sets the maximum total sequence length.
    pub fn with_max_length(
        self,
        max_length: usize,
    ) -> Self {
        Self { max_length, ..self }
    }

    /// Initializes a [`DecodingEngine`] from these options.
    pub fn init(self) -> DecodingEngine<T> {
        DecodingEngine::new(self)
    }
}

/// Per-sequence decode state.
///
/// Active until the end token is produced or `max_length` is reached;
/// terminal states are final.
#[derive(Debug, Clone)]
struct DecodeState<T: TokenType> {
    tokens: Vec<T>,
    terminated: bool,
}

/// Batched autoregressive search over a [`TokenPredictor`].
///
/// Holds only configuration; each `generate` call owns its decode states,
/// so concurrent calls on different prompts share nothing mutable.
#[derive(Debug, Clone)]
pub struct DecodingEngine<T: TokenType> {
    options: GenerationOptions<T>,
}

impl<T: TokenType> DecodingEngine<T> {
    /// Create an engine.
    pub fn new(options: GenerationOptions<T>) -> Self {
        Self { options }
    }

    /// The engine options.
    pub fn options(&self) -> &GenerationOptions<T> {
        &self.options
    }

    /// Generate one terminated sequence per prompt.
    ///
    /// Randomness comes only from `rng`; greedy decoding never draws from
    /// it, so identical predictor outputs yield identical results.
    pub fn generate<M, R>(
        &self,
        model: &mut M,
        prompts: &[Vec<T>],
        rng: &mut R,
    ) -> PwResult<Vec<Vec<T>>>
    where
        M: TokenPredictor<T>,
        R: Rng + ?Sized,
    {
        self.generate_until(model, prompts, rng, || true)
    }

    /// Like [`Self::generate`], with a cooperative continuation check
    /// between steps.
    ///
    /// When `keep_going` returns false the loop stops and the current
    /// sequences are returned: terminated ones complete, the rest
    /// truncated in progress. No rollback is needed; each sequence owns
    /// its state.
    pub fn generate_until<M, R, C>(
        &self,
        model: &mut M,
        prompts: &[Vec<T>],
        rng: &mut R,
        mut keep_going: C,
    ) -> PwResult<Vec<Vec<T>>>
    where
        M: TokenPredictor<T>,
        R: Rng + ?Sized,
        C: FnMut() -> bool,
    {
        let o = &self.options;
        o.strategy.validate()?;

        let mut states: Vec<DecodeState<T>> = prompts
            .iter()
            .map(|prompt| DecodeState {
                terminated: prompt.len() >= o.max_length,
                tokens: prompt.clone(),
            })
            .collect();

        while states.iter().any(|s| !s.terminated) {
            if !keep_going() {
                break;
            }

            let active: Vec<usize> = states
                .iter()
                .enumerate()
                .filter(|(_, s)| !s.terminated)
                .map(|(i, _)| i)
                .collect();

            let contexts: Vec<&[T]> =
                active.iter().map(|&i| states[i].tokens.as_slice()).collect();
            let distributions = model.predict(&contexts)?;
            drop(contexts);

            if distributions.len() != active.len() {
                return Err(PieceworkError::Generation(format!(
                    "predictor returned {} distributions for {} contexts",
                    distributions.len(),
                    active.len(),
                )));
            }

            for (&i, probs) in active.iter().zip(&distributions) {
                check_distribution(probs, o.vocab_size)?;

                let choice = o.strategy.select(probs, rng)?;
                let token = T::from_usize(choice).ok_or_else(|| {
                    PieceworkError::Generation(format!(
                        "sampled token id {choice} does not fit the token type"
                    ))
                })?;

                let state = &mut states[i];
                state.tokens.push(token);
                if token == o.end_token || state.tokens.len() >= o.max_length {
                    state.terminated = true;
                }
            }
        }

        log::debug!(
            "decode complete: {} sequences, {} terminated",
            states.len(),
            states.iter().filter(|s| s.terminated).count(),
        );

        Ok(states.into_iter().map(|s| s.tokens).collect())
    }
}

/// Reject distributions that are not vocabulary-sized probability
/// simplexes.
fn check_distribution(
    probs: &[f32],
    vocab_size: usize,
) -> PwResult<()> {
    if probs.len() != vocab_size {
        return Err(PieceworkError::Generation(format!(
            "distribution length {} does not match vocab size {vocab_size}",
            probs.len(),
        )));
    }
    let sum: f64 = probs.iter().map(|&p| f64::from(p)).sum();
    if !sum.is_finite() || (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(PieceworkError::Generation(format!(
            "distribution sums to {sum}, expected ~1"
        )));
    }
    Ok(())
}
