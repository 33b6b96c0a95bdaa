//! Bumpcal - Automated Calibration Acquisition
//!
//! Drives a serial-attached bump-sensor device through a sequence of
//! physically-staged distances, collecting and checkpointing calibration
//! samples, then persists the aggregated table.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use bumpcal_core::{
    cli, parse_distance_list, AcquisitionConfig, AcquisitionError, CancelToken, PortLocator,
    SessionConnector,
};

/// Bumpcal CLI
#[derive(Parser, Debug)]
#[command(
    name = "bumpcal",
    author = "Bumpcal Team",
    version,
    about = "Automated calibration data acquisition over a serial link",
    long_about = None
)]
struct Cli {
    /// Serial port name (e.g. COM3, /dev/ttyUSB0); auto-detected when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Comma-separated distance list in centimeters (e.g. 3,5,10,15)
    #[arg(short, long)]
    distances: Option<String>,

    /// Accept the default distance schedule without prompting
    #[arg(short = 'y', long)]
    yes: bool,

    /// Directory for checkpoint and final table files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn build_config(args: &Cli) -> anyhow::Result<AcquisitionConfig> {
    let mut config = match &args.config {
        Some(path) => AcquisitionConfig::load(path)?,
        None => AcquisitionConfig::default(),
    };

    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(list) = &args.distances {
        config.target_distances = parse_distance_list(list)?;
    } else if !args.yes && args.config.is_none() {
        config.target_distances = cli::prompt_distance_schedule()?;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Cli::parse();
    tracing::info!("starting bumpcal v{}", env!("CARGO_PKG_VERSION"));

    if args.list_ports {
        let candidates = PortLocator.candidates();
        if candidates.is_empty() {
            println!("No serial ports found.");
        }
        for candidate in candidates {
            println!("  {} - {}", candidate.name, candidate.description);
        }
        return Ok(());
    }

    let config = build_config(&args)?;
    tracing::info!(
        "acquiring {} distances: {:?}",
        config.target_distances.len(),
        config.target_distances
    );

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; finishing up");
        handler_token.cancel();
    })
    .context("failed to install interrupt handler")?;

    let port = match &args.port {
        Some(port) => port.clone(),
        None => cli::resolve_port(PortLocator.locate()?)?,
    };

    let connector = SessionConnector::new(&config);
    let mut channel = connector.connect(&port)?;

    let outcome = bumpcal_core::run_session(channel.as_mut(), &config, cancel)?;
    cli::print_report(&outcome);

    match outcome.failure {
        None => {
            tracing::info!("acquisition complete");
            Ok(())
        }
        Some(AcquisitionError::Cancelled) => {
            println!("\nInterrupted; partial results were saved.");
            Ok(())
        }
        Some(e) => Err(e).context("session failed; partial results were saved"),
    }
}
