use crate::bandit::BanditAllocator;
use crate::error::{AbError, AbResult};
use crate::model::Prior;
use crate::sampler::BetaSampler;
use log::{debug, info};
use rand::Rng;
use serde::Serialize;
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub n_users: u64,
    pub true_rates: Vec<f64>,
    pub allocations: Vec<u64>,
    pub estimated_rates: Vec<f64>,
    pub total_reward: u64,
}

impl SimulationReport {
    /// Index of the arm that received the most traffic, lowest index on ties.
    pub fn most_allocated(&self) -> usize {
        let max = self.allocations.iter().copied().max().unwrap_or(0);
        self.allocations
            .iter()
            .position(|&a| a == max)
            .unwrap_or(0)
    }
}

/// Route `n_users` through a Thompson-sampling bandit whose arms convert at
/// the hidden `true_rates`.
pub fn simulate<S: BetaSampler + ?Sized, R: Rng>(
    true_rates: &[f64],
    n_users: u64,
    prior: Prior,
    sampler: &mut S,
    rng: &mut R,
) -> AbResult<SimulationReport> {
    if true_rates.is_empty() {
        return Err(AbError::InvalidArgument(
            "at least one true rate is required".to_string(),
        ));
    }
    if let Some(rate) = true_rates.iter().find(|r| !(0.0..=1.0).contains(*r)) {
        return Err(AbError::InvalidArgument(format!(
            "true rates must lie in [0, 1], got {}",
            rate
        )));
    }
    let mut bandit = BanditAllocator::from_prior(true_rates.len(), prior)?;
    info!(
        "Simulating {} users over {} arms",
        n_users,
        bandit.n_arms()
    );

    let timer = Instant::now();
    let mut allocations = vec![0u64; true_rates.len()];
    let mut total_reward = 0u64;
    for _ in 0..n_users {
        let arm = bandit.select_arm(sampler)?;
        allocations[arm] += 1;
        let reward = rng.gen_bool(true_rates[arm]) as u32;
        total_reward += reward as u64;
        bandit.update(arm, reward)?;
    }
    debug!("Simulation finished in {:?}", timer.elapsed());

    Ok(SimulationReport {
        n_users,
        true_rates: true_rates.to_vec(),
        allocations,
        estimated_rates: bandit.estimated_rates(),
        total_reward,
    })
}
