// src/bin/abtest/cli.rs
use clap::{Parser, ValueEnum};

/// Aggregate counts for one variant, given as `NAME:IMPRESSIONS:SUCCESSES`.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantCounts {
    pub name: String,
    pub impressions: u64,
    pub successes: u64,
}

pub fn parse_variant(s: &str) -> Result<VariantCounts, String> {
    let parts: Vec<&str> = s.rsplitn(3, ':').collect();
    let [successes, impressions, name] = parts.as_slice() else {
        return Err(format!(
            "expected NAME:IMPRESSIONS:SUCCESSES, got '{}'",
            s
        ));
    };
    if name.is_empty() {
        return Err("variant name must not be empty".to_string());
    }
    let impressions = impressions
        .parse::<u64>()
        .map_err(|e| format!("invalid impressions '{}': {}", impressions, e))?;
    let successes = successes
        .parse::<u64>()
        .map_err(|e| format!("invalid successes '{}': {}", successes, e))?;
    Ok(VariantCounts {
        name: name.to_string(),
        impressions,
        successes,
    })
}

/// Bayesian evaluation of an A/B test from aggregate impression and success counts.
#[derive(Parser, Debug)]
#[command(name = "abtest", version, about = "Bayesian A/B test evaluation")]
pub struct Cli {
    #[arg(
        long = "variant",
        short = 'v',
        value_name = "NAME:IMPRESSIONS:SUCCESSES",
        value_parser = parse_variant,
        help = "Counts to record for a variant (repeatable)"
    )]
    pub variants: Vec<VariantCounts>,

    #[arg(long, default_value = "control", help = "Baseline variant (A)")]
    pub control: String,

    #[arg(long, default_value = "treatment", help = "Challenger variant (B)")]
    pub treatment: String,

    #[arg(long, default_value = "10000", help = "Monte Carlo draws per variant")]
    pub samples: usize,

    #[arg(long, default_value = "0.95", help = "Credible interval level")]
    pub confidence: f64,

    #[arg(long, help = "Alpha of the Beta prior for new variants [default: 1]")]
    pub prior_alpha: Option<f64>,

    #[arg(long, help = "Beta of the Beta prior for new variants [default: 1]")]
    pub prior_beta: Option<f64>,

    #[arg(
        long,
        default_value = "1000",
        help = "Impressions each variant needs before a winner is called"
    )]
    pub min_sample_size: u64,

    #[arg(
        long,
        default_value = "0.01",
        help = "Minimum relative lift to declare a winner"
    )]
    pub uplift_threshold: f64,

    #[arg(long, help = "Evaluate variants with no impressions on their prior alone")]
    pub allow_prior_only: bool,

    #[arg(long, help = "Seed for reproducible sampling")]
    pub seed: Option<u64>,

    #[arg(
        long,
        value_name = "FILE",
        help = "JSON state file, loaded before recording and written back afterwards"
    )]
    pub state: Option<String>,

    #[arg(long, help = "Print the report as JSON")]
    pub json: bool,

    #[arg(
        value_enum,
        long,
        default_value = "normal",
        value_name = "VERBOSITY",
        help = "Verbosity level"
    )]
    pub verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LogLevel {
    Verbose,
    Normal,
    Silent,
}
