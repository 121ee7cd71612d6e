//! Bayesian A/B evaluation and Thompson-sampling allocation for binary
//! outcomes such as clicks and conversions.

pub mod bandit;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod model;
pub mod qini;
pub mod sampler;
pub mod shared;
pub mod simulation;
pub mod tracker;

pub use bandit::BanditAllocator;
pub use error::{AbError, AbResult};
pub use evaluator::{EvaluationResult, EvaluationSettings, ExperimentEvaluator};
pub use experiment::{ExperimentConfig, Verdict};
pub use model::{BetaBernoulliModel, Prior};
pub use sampler::{BetaSampler, RngSampler};
pub use tracker::PosteriorTracker;
