//! # Next-Token Selection Strategies

use rand::Rng;
use rand::distr::{Distribution, weighted::WeightedIndex};

use crate::errors::{PieceworkError, PwResult};

/// How the engine selects the next token from a probability distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingStrategy {
    /// Always the highest-probability token; ties resolve to the smallest
    /// token id. Deterministic.
    Greedy,

    /// Nucleus sampling: draw from the smallest set of highest-probability
    /// tokens whose cumulative mass reaches `p`.
    ///
    /// `p = 1.0` degenerates to full-distribution sampling; `p` near 0
    /// converges toward greedy on peaked distributions.
    TopP {
        /// The cumulative-probability threshold, in `(0, 1]`.
        p: f64,
    },
}

impl SamplingStrategy {
    /// Nucleus sampling with threshold `p`.
    ///
    /// ## Returns
    /// The strategy, or [`PieceworkError::Config`] unless `p` is in
    /// `(0, 1]`.
    pub fn top_p(p: f64) -> PwResult<Self> {
        let strategy = SamplingStrategy::TopP { p };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Check strategy parameters.
    pub fn validate(&self) -> PwResult<()> {
        if let SamplingStrategy::TopP { p } = *self {
            if !(p > 0.0 && p <= 1.0) {
                return Err(PieceworkError::Config(format!(
                    "top-p threshold {p} outside (0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Select a token id from a probability distribution.
    pub(crate) fn select<R: Rng + ?Sized>(
        &self,
        probs: &[f32],
        rng: &mut R,
    ) -> PwResult<usize> {
        match *self {
            SamplingStrategy::Greedy => Ok(argmax(probs)),
            SamplingStrategy::TopP { p } => sample_top_p(probs, p, rng),
        }
    }
}

/// Index of the maximum probability; ties resolve to the smallest id.
fn argmax(probs: &[f32]) -> usize {
    let mut best = 0;
    for (id, &value) in probs.iter().enumerate().skip(1) {
        if value > probs[best] {
            best = id;
        }
    }
    best
}

/// Draw one token from the renormalized nucleus of the distribution.
///
/// [`WeightedIndex`] samples proportionally to the retained weights, which
/// is exactly the renormalized restricted distribution.
fn sample_top_p<R: Rng + ?Sized>(
    probs: &[f32],
    p: f64,
    rng: &mut R,
) -> PwResult<usize> {
    // Descending probability; ties to ascending id for determinism.
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        probs[b]
            .partial_cmp(&probs[a])
            .unwrap_or(core::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut cutoff = order.len();
    let mut cumulative = 0.0f64;
    for (rank, &id) in order.iter().enumerate() {
        cumulative += f64::from(probs[id]);
        if cumulative >= p {
            cutoff = rank + 1;
            break;
        }
    }
    let nucleus = &order[..cutoff];

    let weights: Vec<f32> = nucleus.iter().map(|&id| probs[id]).collect();
    let dist = WeightedIndex::new(&weights).map_err(|e| {
        PieceworkError::Generation(format!("degenerate nucleus weights: {e}"))
    })?;
    Ok(nucleus[dist.sample(rng)])
}
