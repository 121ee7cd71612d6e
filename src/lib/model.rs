use crate::error::{AbError, AbResult};
use serde::{Deserialize, Serialize};

/// Shape parameters of a Beta prior.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub alpha: f64,
    pub beta: f64,
}

impl Prior {
    pub fn new(alpha: f64, beta: f64) -> AbResult<Self> {
        validate_shape("alpha", alpha)?;
        validate_shape("beta", beta)?;
        Ok(Self { alpha, beta })
    }

    /// Beta(1, 1), the uniform prior.
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl Default for Prior {
    fn default() -> Self {
        Self::uniform()
    }
}

pub(crate) fn validate_shape(name: &str, value: f64) -> AbResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AbError::Configuration(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// A Beta-Bernoulli model
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BetaBernoulliModel {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaBernoulliModel {
    /// Create a new Beta-Bernoulli model with alpha=1.0, beta=1.0
    pub fn new() -> Self {
        Self::from_prior(Prior::uniform())
    }

    pub fn from_prior(prior: Prior) -> Self {
        Self {
            alpha: prior.alpha,
            beta: prior.beta,
        }
    }

    /// Update parameters with `successes` successes and `failures` failures
    pub fn update(&mut self, successes: u64, failures: u64) {
        self.alpha += successes as f64;
        self.beta += failures as f64;
    }

    /// Compute mean of posterior
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let numerator = self.alpha * self.beta;
        let denominator = (self.alpha + self.beta).powi(2) * (self.alpha + self.beta + 1.0);
        numerator / denominator
    }

    /// Compute standard deviation of posterior
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl Default for BetaBernoulliModel {
    fn default() -> Self {
        Self::new()
    }
}
