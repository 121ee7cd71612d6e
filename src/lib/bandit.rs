//! Thompson-sampling allocation over Beta-Bernoulli arms.

use crate::error::{AbError, AbResult};
use crate::model::{BetaBernoulliModel, Prior};
use crate::sampler::BetaSampler;
use crate::tracker::SNAPSHOT_VERSION;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmState {
    #[serde(flatten)]
    pub posterior: BetaBernoulliModel,
    pub pulls: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BanditSnapshot {
    pub version: u32,
    pub prior: Prior,
    pub arms: Vec<ArmState>,
}

#[derive(Clone, Debug)]
pub struct BanditAllocator {
    prior: Prior,
    arms: Vec<ArmState>,
}

impl BanditAllocator {
    pub fn new(n_arms: usize) -> AbResult<Self> {
        Self::from_prior(n_arms, Prior::uniform())
    }

    pub fn with_prior(n_arms: usize, alpha: f64, beta: f64) -> AbResult<Self> {
        Self::from_prior(n_arms, Prior::new(alpha, beta)?)
    }

    pub fn from_prior(n_arms: usize, prior: Prior) -> AbResult<Self> {
        if n_arms == 0 {
            return Err(AbError::Configuration(
                "a bandit needs at least one arm".to_string(),
            ));
        }
        let arm = ArmState {
            posterior: BetaBernoulliModel::from_prior(prior),
            pulls: 0,
        };
        Ok(Self {
            prior,
            arms: vec![arm; n_arms],
        })
    }

    pub fn n_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn prior(&self) -> Prior {
        self.prior
    }

    pub fn arm(&self, arm: usize) -> AbResult<&ArmState> {
        self.arms.get(arm).ok_or(AbError::InvalidArm {
            arm,
            n_arms: self.arms.len(),
        })
    }

    /// Sample every arm's posterior once and return the argmax.
    /// Ties go to the lowest index.
    pub fn select_arm<S: BetaSampler + ?Sized>(&self, sampler: &mut S) -> AbResult<usize> {
        select_from(self.arms.iter().map(|a| a.posterior), sampler)
    }

    pub fn update(&mut self, arm: usize, reward: u32) -> AbResult<()> {
        let n_arms = self.arms.len();
        if reward > 1 {
            return Err(AbError::InvalidReward(reward));
        }
        let state = self
            .arms
            .get_mut(arm)
            .ok_or(AbError::InvalidArm { arm, n_arms })?;
        state.posterior.update(reward as u64, 1 - reward as u64);
        state.pulls += 1;
        trace!(
            "Arm {} reward {}, posterior Beta({}, {})",
            arm,
            reward,
            state.posterior.alpha,
            state.posterior.beta
        );
        Ok(())
    }

    /// Posterior mean success rate per arm.
    pub fn estimated_rates(&self) -> Vec<f64> {
        self.arms.iter().map(|a| a.posterior.mean()).collect()
    }

    pub fn pulls(&self) -> Vec<u64> {
        self.arms.iter().map(|a| a.pulls).collect()
    }

    pub fn snapshot(&self) -> BanditSnapshot {
        BanditSnapshot {
            version: SNAPSHOT_VERSION,
            prior: self.prior,
            arms: self.arms.clone(),
        }
    }

    pub fn restore(snapshot: BanditSnapshot) -> AbResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AbError::InvalidArgument(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let prior = Prior::new(snapshot.prior.alpha, snapshot.prior.beta)?;
        if snapshot.arms.is_empty() {
            return Err(AbError::Configuration(
                "a bandit needs at least one arm".to_string(),
            ));
        }
        for (i, arm) in snapshot.arms.iter().enumerate() {
            // Each pull adds exactly one to alpha + beta.
            let expected_total = prior.alpha + prior.beta + arm.pulls as f64;
            let total = arm.posterior.alpha + arm.posterior.beta;
            if arm.posterior.alpha < prior.alpha
                || arm.posterior.beta < prior.beta
                || (total - expected_total).abs() > 1e-9
            {
                return Err(AbError::InvalidObservation {
                    variant: format!("arm {}", i),
                    reason: format!(
                        "Beta({}, {}) inconsistent with prior Beta({}, {}) after {} pulls",
                        arm.posterior.alpha, arm.posterior.beta, prior.alpha, prior.beta, arm.pulls
                    ),
                });
            }
        }
        debug!("Restored bandit with {} arms", snapshot.arms.len());
        Ok(Self {
            prior,
            arms: snapshot.arms,
        })
    }
}

pub(crate) fn select_from<S, I>(posteriors: I, sampler: &mut S) -> AbResult<usize>
where
    S: BetaSampler + ?Sized,
    I: IntoIterator<Item = BetaBernoulliModel>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, posterior) in posteriors.into_iter().enumerate() {
        let draw = sampler.sample_beta(posterior.alpha, posterior.beta)?;
        match best {
            Some((_, best_draw)) if draw <= best_draw => {}
            _ => best = Some((i, draw)),
        }
    }
    best.map(|(i, _)| i)
        .ok_or_else(|| AbError::Configuration("a bandit needs at least one arm".to_string()))
}
