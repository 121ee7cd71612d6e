use crate::error::{AbError, AbResult};
use crate::evaluator::EvaluationResult;
use crate::tracker::PosteriorTracker;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Thresholds for calling an experiment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub confidence_level: f64,
    pub min_sample_size: u64,
    /// Smallest relative lift worth declaring a winner for.
    pub uplift_threshold: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_sample_size: 1000,
            uplift_threshold: 0.01,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> AbResult<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(AbError::Configuration(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !self.uplift_threshold.is_finite() || self.uplift_threshold < 0.0 {
            return Err(AbError::Configuration(format!(
                "uplift threshold must be a non-negative number, got {}",
                self.uplift_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[strum(to_string = "needs more data")]
    NeedsMoreData,
    #[strum(to_string = "treatment wins")]
    TreatmentWins,
    #[strum(to_string = "control wins")]
    ControlWins,
    #[strum(to_string = "inconclusive")]
    Inconclusive,
}

/// Call an evaluated experiment, with variant A as control and B as treatment.
pub fn decide(
    config: &ExperimentConfig,
    result: &EvaluationResult,
    tracker: &PosteriorTracker,
) -> AbResult<Verdict> {
    config.validate()?;
    for name in [&result.variant_a, &result.variant_b] {
        let impressions = tracker.variant(name)?.impressions;
        if impressions < config.min_sample_size {
            debug!(
                "Variant '{}' has {} impressions, below the minimum of {}",
                name, impressions, config.min_sample_size
            );
            return Ok(Verdict::NeedsMoreData);
        }
    }

    let verdict = if result.prob_b_better >= config.confidence_level
        && result.expected_lift >= config.uplift_threshold
    {
        Verdict::TreatmentWins
    } else if 1.0 - result.prob_b_better >= config.confidence_level
        && result.expected_lift <= -config.uplift_threshold
    {
        Verdict::ControlWins
    } else {
        Verdict::Inconclusive
    };
    Ok(verdict)
}
