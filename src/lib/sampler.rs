//! Random draws from Beta posteriors.
//!
//! Everything that needs randomness takes a `BetaSampler`, so callers choose
//! between a seeded generator, an entropy-seeded one, or a scripted stand-in
//! in tests.

use crate::error::{AbError, AbResult};
use rand::SeedableRng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use statrs::distribution::Beta;

pub trait BetaSampler {
    /// Draw one value from `Beta(alpha, beta)`.
    fn sample_beta(&mut self, alpha: f64, beta: f64) -> AbResult<f64>;

    /// Draw `n` independent values from `Beta(alpha, beta)`.
    fn sample_beta_n(&mut self, alpha: f64, beta: f64, n: usize) -> AbResult<Vec<f64>> {
        (0..n).map(|_| self.sample_beta(alpha, beta)).collect()
    }
}

/// Beta sampler backed by `statrs` and any `rand` generator.
pub struct RngSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSampler<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

fn beta_distribution(alpha: f64, beta: f64) -> AbResult<Beta> {
    Beta::new(alpha, beta).map_err(|e| {
        AbError::Configuration(format!(
            "Cannot build Beta({}, {}) distribution: {}",
            alpha, beta, e
        ))
    })
}

impl<R: Rng> BetaSampler for RngSampler<R> {
    fn sample_beta(&mut self, alpha: f64, beta: f64) -> AbResult<f64> {
        let dist = beta_distribution(alpha, beta)?;
        Ok(dist.sample(&mut self.rng))
    }

    fn sample_beta_n(&mut self, alpha: f64, beta: f64, n: usize) -> AbResult<Vec<f64>> {
        let dist = beta_distribution(alpha, beta)?;
        Ok((0..n).map(|_| dist.sample(&mut self.rng)).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Returns pre-scripted values, ignoring the shape parameters.
    pub(crate) struct ScriptedSampler {
        pub values: VecDeque<f64>,
    }

    impl ScriptedSampler {
        pub(crate) fn new(values: Vec<f64>) -> Self {
            Self {
                values: values.into(),
            }
        }
    }

    impl BetaSampler for ScriptedSampler {
        fn sample_beta(&mut self, _alpha: f64, _beta: f64) -> AbResult<f64> {
            self.values
                .pop_front()
                .ok_or_else(|| AbError::InvalidArgument("scripted sampler exhausted".to_string()))
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = RngSampler::seeded(7);
        let mut b = RngSampler::seeded(7);
        let xs = a.sample_beta_n(3.0, 5.0, 50).unwrap();
        let ys = b.sample_beta_n(3.0, 5.0, 50).unwrap();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_samples_in_unit_interval() {
        let mut sampler = RngSampler::seeded(1);
        for x in sampler.sample_beta_n(0.5, 0.5, 1000).unwrap() {
            assert!((0.0..=1.0).contains(&x));
        }
    }

    #[test]
    fn test_sample_mean_matches_beta_mean() {
        let mut sampler = RngSampler::seeded(11);
        let xs = sampler.sample_beta_n(20.0, 80.0, 20_000).unwrap();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert!((mean - 0.2).abs() < 0.005, "mean = {}", mean);
    }

    #[test]
    fn test_invalid_shape() {
        let mut sampler = RngSampler::seeded(1);
        assert!(matches!(
            sampler.sample_beta(0.0, 1.0),
            Err(AbError::Configuration(_))
        ));
        assert!(sampler.sample_beta_n(1.0, -2.0, 3).is_err());
    }
}
