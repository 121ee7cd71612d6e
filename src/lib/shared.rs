//! Mutex-guarded tracker and bandit for concurrent callers.
//!
//! Writers hold the lock for the whole counter update. Readers copy the
//! `(alpha, beta)` pair under the lock and sample after releasing it, so a
//! draw never sees half of an update.

use crate::bandit::{BanditAllocator, select_from};
use crate::error::{AbError, AbResult};
use crate::model::BetaBernoulliModel;
use crate::sampler::BetaSampler;
use crate::tracker::{PosteriorTracker, TrackerSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct SharedTracker {
    inner: Arc<Mutex<PosteriorTracker>>,
}

impl SharedTracker {
    pub fn new(tracker: PosteriorTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn record(&self, variant: &str, impressions: u64, successes: u64) -> AbResult<()> {
        self.inner.lock().record(variant, impressions, successes)
    }

    pub fn sample<S: BetaSampler + ?Sized>(
        &self,
        variant: &str,
        n: usize,
        sampler: &mut S,
    ) -> AbResult<Vec<f64>> {
        if n == 0 {
            return Err(AbError::InvalidArgument(
                "number of samples must be positive".to_string(),
            ));
        }
        let posterior = self.posterior(variant)?;
        sampler.sample_beta_n(posterior.alpha, posterior.beta, n)
    }

    pub fn posterior(&self, variant: &str) -> AbResult<BetaBernoulliModel> {
        Ok(self.inner.lock().variant(variant)?.posterior)
    }

    pub fn posterior_mean(&self, variant: &str) -> AbResult<f64> {
        self.inner.lock().posterior_mean(variant)
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Run `f` against a consistent view of the whole tracker.
    pub fn with_tracker<T>(&self, f: impl FnOnce(&PosteriorTracker) -> T) -> T {
        let tracker = self.inner.lock();
        f(&*tracker)
    }
}

#[derive(Clone)]
pub struct SharedBandit {
    inner: Arc<Mutex<BanditAllocator>>,
}

impl SharedBandit {
    pub fn new(bandit: BanditAllocator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bandit)),
        }
    }

    pub fn select_arm<S: BetaSampler + ?Sized>(&self, sampler: &mut S) -> AbResult<usize> {
        let posteriors: Vec<BetaBernoulliModel> = {
            let bandit = self.inner.lock();
            (0..bandit.n_arms())
                .map(|i| bandit.arm(i).map(|a| a.posterior))
                .collect::<AbResult<_>>()?
        };
        select_from(posteriors, sampler)
    }

    pub fn update(&self, arm: usize, reward: u32) -> AbResult<()> {
        self.inner.lock().update(arm, reward)
    }

    pub fn estimated_rates(&self) -> Vec<f64> {
        self.inner.lock().estimated_rates()
    }

    pub fn pulls(&self) -> Vec<u64> {
        self.inner.lock().pulls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RngSampler;
    use std::thread;

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let shared = SharedTracker::default();
        thread::scope(|s| {
            for t in 0..8 {
                let shared = shared.clone();
                s.spawn(move || {
                    for _ in 0..500 {
                        shared.record("control", 10, (t % 3) as u64).unwrap();
                    }
                });
            }
        });
        let expected_successes: u64 = (0..8).map(|t| (t % 3) as u64 * 500).sum();
        shared.with_tracker(|tracker| {
            let state = tracker.variant("control").unwrap();
            assert_eq!(state.impressions, 8 * 500 * 10);
            assert_eq!(state.successes, expected_successes);
            assert_eq!(state.alpha(), 1.0 + expected_successes as f64);
            assert_eq!(
                state.beta(),
                1.0 + (state.impressions - expected_successes) as f64
            );
        });
    }

    #[test]
    fn test_concurrent_bandit_updates() {
        let shared = SharedBandit::new(BanditAllocator::new(3).unwrap());
        thread::scope(|s| {
            for t in 0..6u64 {
                let shared = shared.clone();
                s.spawn(move || {
                    let mut sampler = RngSampler::seeded(t);
                    for i in 0..300 {
                        let arm = shared.select_arm(&mut sampler).unwrap();
                        shared.update(arm, (i % 2) as u32).unwrap();
                    }
                });
            }
        });
        assert_eq!(shared.pulls().iter().sum::<u64>(), 6 * 300);
        assert_eq!(shared.estimated_rates().len(), 3);
    }

    #[test]
    fn test_shared_sample() {
        let shared = SharedTracker::default();
        shared.record("a", 1000, 900).unwrap();
        let mut sampler = RngSampler::seeded(4);
        let xs = shared.sample("a", 100, &mut sampler).unwrap();
        assert_eq!(xs.len(), 100);
        assert!(xs.iter().all(|x| *x > 0.8));
        assert!(shared.sample("b", 10, &mut sampler).is_err());
        assert!((shared.posterior_mean("a").unwrap() - 901.0 / 1002.0).abs() < 1e-12);
    }
}
