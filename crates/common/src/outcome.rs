//! Outcome decision for simulated external dependencies.
//!
//! Payment gateways, stock systems and carriers are not called for real.
//! Each participant or step that stands in for one asks an injected
//! [`OutcomeSource`] whether its attempt succeeded.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::OutcomeError;

/// Decides whether a simulated external call succeeds.
pub trait OutcomeSource: Send + Sync {
    /// Returns true if the attempt succeeds.
    fn decide(&self) -> bool;
}

/// Always returns the same outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOutcome(bool);

impl FixedOutcome {
    /// An outcome source that always succeeds.
    pub fn success() -> Self {
        Self(true)
    }

    /// An outcome source that always fails.
    pub fn failure() -> Self {
        Self(false)
    }
}

impl From<bool> for FixedOutcome {
    fn from(outcome: bool) -> Self {
        Self(outcome)
    }
}

impl OutcomeSource for FixedOutcome {
    fn decide(&self) -> bool {
        self.0
    }
}

/// Replays a fixed sequence of outcomes, then falls back to a default.
#[derive(Debug)]
pub struct ScriptedOutcome {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedOutcome {
    /// Creates a source that replays `script` and then keeps returning `fallback`.
    pub fn new(script: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
        }
    }

    /// Returns how many scripted outcomes have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl OutcomeSource for ScriptedOutcome {
    fn decide(&self) -> bool {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Seedable pseudo-random outcomes with a fixed success rate.
///
/// The same seed and rate produce the same sequence of outcomes.
#[derive(Debug)]
pub struct SeededOutcome {
    seed: u64,
    success_rate: f64,
    rng: Mutex<StdRng>,
}

impl SeededOutcome {
    /// Creates a source succeeding with probability `success_rate`.
    pub fn new(seed: u64, success_rate: f64) -> Result<Self, OutcomeError> {
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(OutcomeError::InvalidRate(success_rate));
        }
        Ok(Self {
            seed,
            success_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Returns the seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the configured success rate.
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl OutcomeSource for SeededOutcome {
    fn decide(&self) -> bool {
        self.rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .gen_bool(self.success_rate)
    }
}
