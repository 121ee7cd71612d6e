//! Monte Carlo comparison of two variants' Beta posteriors.

use crate::error::{AbError, AbResult};
use crate::sampler::BetaSampler;
use crate::tracker::PosteriorTracker;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub const DEFAULT_N_SAMPLES: usize = 10_000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    pub n_samples: usize,
    pub confidence_level: f64,
    /// Evaluate variants that have no impressions yet, using the prior alone.
    pub allow_prior_only: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_N_SAMPLES,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            allow_prior_only: false,
        }
    }
}

impl EvaluationSettings {
    pub fn validate(&self) -> AbResult<()> {
        validate_numeric(self.n_samples, self.confidence_level)
    }
}

fn validate_numeric(n_samples: usize, confidence_level: f64) -> AbResult<()> {
    if n_samples == 0 {
        return Err(AbError::InvalidArgument(
            "number of samples must be positive".to_string(),
        ));
    }
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(AbError::InvalidArgument(format!(
            "confidence level must lie in (0, 1), got {}",
            confidence_level
        )));
    }
    Ok(())
}

/// Decision summary for B against baseline A.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub variant_a: String,
    pub variant_b: String,
    /// Share of paired draws where B's sample exceeds A's.
    pub prob_b_better: f64,
    /// Mean of `(b - a) / a` over the draws.
    pub expected_lift: f64,
    pub lift_interval: (f64, f64),
    pub confidence_level: f64,
    pub n_samples: usize,
    /// Draws left out of the lift statistics because `(b - a) / a` was not
    /// finite, i.e. A's sample was 0 or too close to it.
    pub excluded_lift_samples: usize,
}

/// Lift statistics computed from two equally long sample vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct LiftSummary {
    pub prob_b_better: f64,
    pub expected_lift: f64,
    pub lift_interval: (f64, f64),
    pub excluded: usize,
}

/// Empirical percentile of sorted data, interpolating linearly between
/// order statistics. `q` is a fraction in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

pub fn summarize_lift(
    samples_a: &[f64],
    samples_b: &[f64],
    confidence_level: f64,
) -> AbResult<LiftSummary> {
    if samples_a.len() != samples_b.len() || samples_a.is_empty() {
        return Err(AbError::InvalidArgument(format!(
            "sample vectors must be non-empty and of equal length ({} vs {})",
            samples_a.len(),
            samples_b.len()
        )));
    }
    validate_numeric(samples_a.len(), confidence_level)?;

    let n = samples_a.len();
    let b_wins = samples_a
        .iter()
        .zip(samples_b)
        .filter(|&(a, b)| b > a)
        .count();

    // A zero or subnormal baseline draw gives an infinite or NaN ratio.
    let mut lifts: Vec<f64> = samples_a
        .iter()
        .zip(samples_b)
        .map(|(&a, &b)| (b - a) / a)
        .filter(|lift| lift.is_finite())
        .collect();
    let excluded = n - lifts.len();
    if lifts.is_empty() {
        return Err(AbError::DivisionByZero(n));
    }
    if excluded > 0 {
        warn!(
            "{} of {} baseline draws gave a non-finite lift; excluded from lift statistics",
            excluded, n
        );
    }

    // Running mean, a plain sum of very large ratios can overflow.
    let expected_lift = lifts
        .iter()
        .enumerate()
        .fold(0.0, |mean, (i, x)| mean + (x - mean) / (i + 1) as f64);
    lifts.sort_unstable_by_key(|x| OrderedFloat(*x));
    let tail = (1.0 - confidence_level) / 2.0;
    let lift_interval = (percentile(&lifts, tail), percentile(&lifts, 1.0 - tail));

    Ok(LiftSummary {
        prob_b_better: b_wins as f64 / n as f64,
        expected_lift,
        lift_interval,
        excluded,
    })
}

pub struct ExperimentEvaluator<S: BetaSampler> {
    sampler: S,
    settings: EvaluationSettings,
}

impl<S: BetaSampler> ExperimentEvaluator<S> {
    pub fn new(sampler: S) -> Self {
        Self {
            sampler,
            settings: EvaluationSettings::default(),
        }
    }

    pub fn with_settings(sampler: S, settings: EvaluationSettings) -> AbResult<Self> {
        settings.validate()?;
        Ok(Self { sampler, settings })
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn evaluate(
        &mut self,
        tracker: &PosteriorTracker,
        variant_a: &str,
        variant_b: &str,
    ) -> AbResult<EvaluationResult> {
        let EvaluationSettings {
            n_samples,
            confidence_level,
            ..
        } = self.settings;
        self.evaluate_with(tracker, variant_a, variant_b, n_samples, confidence_level)
    }

    /// Like `evaluate`, overriding the sample count and confidence level.
    pub fn evaluate_with(
        &mut self,
        tracker: &PosteriorTracker,
        variant_a: &str,
        variant_b: &str,
        n_samples: usize,
        confidence_level: f64,
    ) -> AbResult<EvaluationResult> {
        validate_numeric(n_samples, confidence_level)?;
        for name in [variant_a, variant_b] {
            let state = tracker.variant(name)?;
            if state.impressions == 0 {
                if !self.settings.allow_prior_only {
                    return Err(AbError::InsufficientData(name.to_string()));
                }
                warn!("Variant '{}' has no impressions, evaluating on its prior", name);
            }
        }

        info!("Evaluating: {} vs {}", variant_b, variant_a);
        let samples_a = tracker.sample(variant_a, n_samples, &mut self.sampler)?;
        let samples_b = tracker.sample(variant_b, n_samples, &mut self.sampler)?;
        let summary = summarize_lift(&samples_a, &samples_b, confidence_level)?;
        debug!(
            "P(B > A) = {:.4}, lift = {:.4}, interval = [{:.4}, {:.4}]",
            summary.prob_b_better,
            summary.expected_lift,
            summary.lift_interval.0,
            summary.lift_interval.1
        );

        Ok(EvaluationResult {
            variant_a: variant_a.to_string(),
            variant_b: variant_b.to_string(),
            prob_b_better: summary.prob_b_better,
            expected_lift: summary.expected_lift,
            lift_interval: summary.lift_interval,
            confidence_level,
            n_samples,
            excluded_lift_samples: summary.excluded,
        })
    }
}
