use crate::error::{EloError, Result};

pub const START_ELO: f64 = 1200.0;
pub const MIN_K_FACTOR: u32 = 1;
pub const MAX_K_FACTOR: u32 = 40;
pub const K_FACTOR_STEP: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepContext {
    pub min_k: u32,
    pub max_k: u32,
    pub k_step: u32,

    pub initial_elo: f64,   // Seed rating for players we haven't seen yet
    pub elo_delta: f64,     // Rating gap that means 10:1 odds
}

impl SweepContext {
    pub fn default() -> Self {
        Self {
            min_k: MIN_K_FACTOR,
            max_k: MAX_K_FACTOR,
            k_step: K_FACTOR_STEP,

            initial_elo: START_ELO,
            elo_delta: 400.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_step == 0 {
            return Err(EloError::InvalidConfig("kStep must be greater than zero".to_string()));
        }
        if self.min_k > self.max_k {
            return Err(EloError::InvalidConfig(format!(
                "minK ({}) is greater than maxK ({})",
                self.min_k, self.max_k
            )));
        }
        if !self.initial_elo.is_finite() {
            let reason = format!("initialElo must be finite, got {}", self.initial_elo);
            return Err(EloError::InvalidConfig(reason));
        }
        if !self.elo_delta.is_finite() || self.elo_delta <= 0.0 {
            let reason = format!("Elo delta must be positive, got {}", self.elo_delta);
            return Err(EloError::InvalidConfig(reason));
        }
        Ok(())
    }

    // Every K in [min_k, max_k] stepped by k_step. max_k is only hit when the step lands on it.
    pub fn k_factors(&self) -> impl Iterator<Item = u32> {
        let step = self.k_step.max(1) as usize;
        (self.min_k..=self.max_k).step_by(step)
    }

    pub fn contains_k(&self, k_factor: u32) -> bool {
        self.k_step > 0
            && k_factor >= self.min_k
            && k_factor <= self.max_k
            && (k_factor - self.min_k) % self.k_step == 0
    }
}
