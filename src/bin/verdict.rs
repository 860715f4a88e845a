#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use verdict_harness::Calibrator;

#[derive(Parser)]
#[command(name = "verdict", version, about = "Chatbot evaluation harness CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive per-turn thresholds from baseline run logs and rewrite the
    /// reference files
    Calibrate {
        /// Directory holding the *-baseline.csv run logs
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// Directory holding the reference CSVs to rewrite
        #[arg(long, default_value = "references")]
        references_dir: PathBuf,
        /// Number of baseline repetitions the logs came from
        #[arg(long)]
        iterations: u32,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Calibrate {
            output_dir,
            references_dir,
            iterations,
        } => calibrate(output_dir, references_dir, iterations),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn calibrate(
    output_dir: PathBuf,
    references_dir: PathBuf,
    iterations: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if iterations == 0 {
        return Err("iterations must be a positive number".into());
    }

    let calibrator = Calibrator::new(output_dir, references_dir, iterations);
    let outcomes = calibrator.run()?;

    if outcomes.is_empty() {
        println!("no run logs found");
        return Ok(());
    }

    for outcome in outcomes {
        println!(
            "calibrated {} ({} turns)",
            outcome.reference_path.display(),
            outcome.turns
        );
    }
    Ok(())
}
