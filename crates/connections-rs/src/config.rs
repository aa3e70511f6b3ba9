//! Solver configuration with defaults that reproduce the reference runs.
//!
//! [`SolverConfig`] is consumed by both the [`Solver`](crate::solver::Solver)
//! (seed, mistake budget, round cap) and the
//! [`LlmOracle`](crate::oracle::LlmOracle) (model, sampling, retry).

use crate::DEFAULT_MODEL;
use crate::api::retry::RetryConfig;

/// Wrong guesses tolerated before a run is abandoned.
pub const MAX_MISTAKES: usize = 4;

/// Seed for the item shuffle. Fixed so runs are reproducible.
pub const DEFAULT_SEED: u64 = 0xDEAD_BEEF;

/// Round-trip cap guarding against an oracle that never makes progress.
///
/// A normal run needs at most 8 rounds (4 that confirm, 4 that miss).
pub const DEFAULT_MAX_ROUNDS: u32 = 16;

/// Configuration for a puzzle run.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Shuffle seed. Default: [`DEFAULT_SEED`].
    pub seed: u64,
    /// Wrong-guess budget. Default: [`MAX_MISTAKES`].
    pub max_mistakes: usize,
    /// Maximum oracle round-trips. Default: [`DEFAULT_MAX_ROUNDS`].
    pub max_rounds: u32,
    /// Sampling temperature. Default: `1.0`.
    pub temperature: f32,
    /// Maximum tokens per LLM response. Default: `4096`.
    pub max_tokens: u32,
    /// Backoff for transient API failures.
    pub retry: RetryConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            seed: DEFAULT_SEED,
            max_mistakes: MAX_MISTAKES,
            max_rounds: DEFAULT_MAX_ROUNDS,
            temperature: 1.0,
            max_tokens: 4096,
            retry: RetryConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Defaults with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(max_retries);
        self
    }
}
