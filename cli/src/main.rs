//! g4ants-tools - offline utilities for G4ants job files
//!
//! Validates job configurations and turns binary output streams back into
//! their text form.

use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use g4ants_session_core::config::{HistoryMode, JobConfig, DEFAULT_PRECISION};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod decode;

use decode::StreamKind;

/// g4ants-tools - G4ants job utilities
#[derive(Parser, Debug)]
#[command(name = "g4ants-tools")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a job configuration and print a summary
    CheckConfig {
        /// Job configuration (JSON)
        file: PathBuf,
    },

    /// Decode a binary stream to the text format
    Decode {
        /// Stream layout
        #[arg(value_enum)]
        kind: StreamKind,

        /// Binary file
        file: PathBuf,

        /// Significant digits of real numbers
        #[arg(long, default_value_t = DEFAULT_PRECISION)]
        precision: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match cli.command {
        Commands::CheckConfig { file } => check_config(&file),
        Commands::Decode {
            kind,
            file,
            precision,
        } => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let events = decode::decode_file(kind, &file, precision, &mut out)?;
            info!(events, "decoded {}", file.display());
            Ok(())
        }
    }
}

fn check_config(file: &Path) -> Result<()> {
    let text =
        fs::read_to_string(file).with_context(|| format!("Cannot read {}", file.display()))?;
    let config = JobConfig::from_json_str(&text)
        .with_context(|| format!("Invalid job configuration {}", file.display()))?;

    println!("Receipt:     {}", config.receipt_file.display());
    println!("Geometry:    {}", config.gdml_file.display());
    println!("Physics:     {}", config.physics_list);
    println!(
        "Primaries:   {} ({:?})",
        config.primaries_file.display(),
        config.primaries_format
    );
    println!(
        "Deposition:  {} ({:?})",
        config.deposition_file.display(),
        config.output_format
    );
    println!("Seed:        {}", config.seed);
    println!("Events:      {}", config.num_events);
    let names: Vec<&str> = config.particles.iter().map(|p| p.name()).collect();
    println!("Particles:   {}", names.join(", "));
    println!("Materials:   {}", config.materials.join(", "));
    match config.history {
        HistoryMode::Off => println!("History:     off"),
        HistoryMode::BoundedTracks(n) => println!("History:     first {} tracks", n),
        HistoryMode::FullLog => println!("History:     full log"),
    }
    if let Some(exit) = &config.exit_particles {
        println!(
            "Exit:        {} from volume {}",
            exit.file.display(),
            exit.volume_name
        );
    }
    for monitor in &config.monitors {
        println!("Monitor:     {}", monitor.name);
    }
    for warning in &config.warnings {
        println!("Warning:     {}", warning);
    }
    println!("Fingerprint: {}", config.fingerprint);
    Ok(())
}
