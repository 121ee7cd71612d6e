use thiserror::Error;

pub type AbResult<T> = Result<T, AbError>;

/// Contract violations raised by the tracker, evaluator and bandit.
///
/// None of these are transient. They are returned to the caller as soon as
/// they are detected and never retried.
#[derive(Error, Debug)]
pub enum AbError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid observation for variant '{variant}': {reason}")]
    InvalidObservation { variant: String, reason: String },

    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    #[error("Insufficient data: variant '{0}' has no recorded impressions")]
    InsufficientData(String),

    #[error("Invalid arm index {arm} (bandit has {n_arms} arms)")]
    InvalidArm { arm: usize, n_arms: usize },

    #[error("Invalid reward {0}, expected 0 or 1")]
    InvalidReward(u32),

    #[error("Division by zero: no finite lift among {0} draws of the baseline variant")]
    DivisionByZero(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
