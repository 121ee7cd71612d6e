// src/bin/bandit_sim/cli.rs
use clap::{Parser, ValueEnum};

/// Simulate Thompson-sampling traffic allocation against known conversion rates.
#[derive(Parser, Debug)]
#[command(name = "bandit_sim", version, about = "Thompson sampling traffic simulation")]
pub struct Cli {
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0.10,0.15",
        help = "True conversion rate of each arm, comma separated"
    )]
    pub rates: Vec<f64>,

    #[arg(long, short, default_value = "1000", help = "Number of simulated users")]
    pub users: u64,

    #[arg(long, help = "Seed for reproducible runs")]
    pub seed: Option<u64>,

    #[arg(long, default_value = "1.0", help = "Alpha of the Beta prior")]
    pub prior_alpha: f64,

    #[arg(long, default_value = "1.0", help = "Beta of the Beta prior")]
    pub prior_beta: f64,

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
