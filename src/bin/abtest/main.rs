use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use rustyab_utils::evaluator::{EvaluationSettings, ExperimentEvaluator};
use rustyab_utils::experiment::{self, ExperimentConfig};
use rustyab_utils::sampler::RngSampler;
use rustyab_utils::tracker::{PosteriorTracker, TrackerSnapshot};
use std::path::Path;

mod cli;
mod report;

fn load_tracker(args: &cli::Cli) -> Result<PosteriorTracker> {
    let mut tracker = match &args.state {
        Some(path) if Path::new(path).exists() => {
            info!("Loading state from {}", path);
            let snapshot = TrackerSnapshot::read_json(path)
                .with_context(|| format!("Could not read state file: {}", path))?;
            PosteriorTracker::restore(snapshot)?
        }
        _ => PosteriorTracker::new(),
    };
    if args.prior_alpha.is_some() || args.prior_beta.is_some() {
        let prior = tracker.prior();
        tracker.configure(
            args.prior_alpha.unwrap_or(prior.alpha),
            args.prior_beta.unwrap_or(prior.beta),
        )?;
    }
    Ok(tracker)
}

fn run(args: &cli::Cli) -> Result<report::Report> {
    let mut tracker = load_tracker(args)?;
    for counts in &args.variants {
        tracker
            .record(&counts.name, counts.impressions, counts.successes)
            .with_context(|| format!("Could not record counts for '{}'", counts.name))?;
    }
    if let Some(path) = &args.state {
        tracker
            .snapshot()
            .write_json(path)
            .with_context(|| format!("Could not write state file: {}", path))?;
        info!("Saved state for {} variants to {}", tracker.len(), path);
    }

    let sampler = match args.seed {
        Some(seed) => RngSampler::seeded(seed),
        None => RngSampler::from_entropy(),
    };
    let settings = EvaluationSettings {
        n_samples: args.samples,
        confidence_level: args.confidence,
        allow_prior_only: args.allow_prior_only,
    };
    let mut evaluator = ExperimentEvaluator::with_settings(sampler, settings)?;
    let evaluation = evaluator.evaluate(&tracker, &args.control, &args.treatment)?;

    let config = ExperimentConfig {
        confidence_level: args.confidence,
        min_sample_size: args.min_sample_size,
        uplift_threshold: args.uplift_threshold,
    };
    let verdict = experiment::decide(&config, &evaluation, &tracker)?;

    Ok(report::Report {
        variants: tracker.variants().into_iter().map(Into::into).collect(),
        evaluation,
        verdict,
    })
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    // Set up logging level
    match args.verbosity {
        cli::LogLevel::Silent => {
            env_logger::Builder::from_env(Env::default().default_filter_or("off")).init();
        }
        cli::LogLevel::Normal => {
            env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
        }
        cli::LogLevel::Verbose => {
            env_logger::Builder::from_env(Env::default().default_filter_or("debug")).init();
        }
    }

    let report = run(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}
