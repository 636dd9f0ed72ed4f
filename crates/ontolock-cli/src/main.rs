//! CLI for ontolock — anchor digital state to physics.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ontolock")]
#[command(about = "ontolock — anchor digital state to physics")]
#[command(version = ontolock_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a physical identity: sample the source, derive commitment and helper data
    Enroll {
        /// Device seed for the simulated source
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Bit-error rate the simulated source injects between readings
        #[arg(long, default_value = "0.02")]
        ber: f64,

        /// Emit machine-readable JSON instead of human output
        #[arg(long)]
        json: bool,
    },

    /// Run the full seed-to-genesis pipeline against an in-memory ledger.
    /// Enrolls, admits a short trajectory (including one deliberately
    /// impossible transition), assembles and anchors the genesis artifact.
    Demo {
        /// Device seed for the simulated source
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Write the genesis artifact JSON to this path
        #[arg(long)]
        output: Option<String>,

        /// Permit declared forks of a consumed predecessor
        #[arg(long)]
        allow_forks: bool,
    },

    /// Score an attack-trial history for antifragility
    Score {
        /// Path to a JSON array of {attack_energy, entropy_before, entropy_after}
        input: String,

        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Enroll { seed, ber, json } => commands::enroll::run(seed, ber, json),
        Commands::Demo {
            seed,
            output,
            allow_forks,
        } => commands::demo::run(seed, output.as_deref(), allow_forks),
        Commands::Score { input, json } => commands::score::run(&input, json),
    }
}
