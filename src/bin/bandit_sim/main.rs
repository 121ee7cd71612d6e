use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use itertools::Itertools;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustyab_utils::model::Prior;
use rustyab_utils::sampler::RngSampler;
use rustyab_utils::simulation::{self, SimulationReport};

mod cli;

fn run(args: &cli::Cli) -> Result<SimulationReport> {
    let prior = Prior::new(args.prior_alpha, args.prior_beta)?;
    let (mut sampler, mut rng) = match args.seed {
        Some(seed) => (
            RngSampler::seeded(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        ),
        None => (RngSampler::from_entropy(), StdRng::from_entropy()),
    };
    Ok(simulation::simulate(
        &args.rates,
        args.users,
        prior,
        &mut sampler,
        &mut rng,
    )?)
}

fn to_text(report: &SimulationReport) -> String {
    let mut text = format!("Results after {} users:\n", report.n_users);
    for (arm, (allocated, rate)) in report
        .allocations
        .iter()
        .zip(&report.true_rates)
        .enumerate()
    {
        text.push_str(&format!(
            "   Traffic to arm {} (true rate {:.3}): {} users\n",
            arm, rate, allocated
        ));
    }
    text.push_str(&format!(
        "   Estimated rates: [{}]\n   Total conversions: {}\n",
        report
            .estimated_rates
            .iter()
            .map(|r| format!("{:.4}", r))
            .join(", "),
        report.total_reward
    ));
    text
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

    info!("Running Thompson sampling simulation");
    let report = run(&args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", to_text(&report));
    }
    info!("Most traffic went to arm {}", report.most_allocated());
    Ok(())
}
