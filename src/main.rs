use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use mavgcs::stream::SampleThrottleExt;
use mavgcs::{
    GcsConfig, GroundControl, LinkStatus, MissionFile, MissionList, SquarePattern, UpdateRate, WaypointSource,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for an upload attempt that did not end accepted
const EXIT_UPLOAD_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "mavgcs")]
#[command(bin_name = "mavgcs")]
#[command(about = "MAVLink telemetry relay and mission uploader")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Relay(RelayArgs),
    Mission(MissionArgs),
}

#[derive(clap::Args)]
#[command(about = "Stream telemetry events as JSON lines until ctrl-c")]
struct RelayArgs {
    /// MAVLink connection string
    #[arg(long, default_value = "udp:127.0.0.1:14551")]
    connect: String,

    /// Limit position samples to this many per second
    #[arg(long)]
    max_rate: Option<u32>,
}

#[derive(clap::Args)]
#[command(about = "Generate or load a mission and optionally upload it")]
struct MissionArgs {
    /// Upload the generated mission
    #[arg(long)]
    upload: bool,

    /// MAVLink connection string
    #[arg(long, default_value = "udp:127.0.0.1:14550")]
    connect: String,

    /// Mission file (.plan or .txt) to load and upload
    #[arg(long)]
    load_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => GcsConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => GcsConfig::default(),
    };

    match cli.command {
        Commands::Relay(args) => relay(args, &config).await,
        Commands::Mission(args) => mission(args, &config).await,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries the event stream
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn relay(args: RelayArgs, config: &GcsConfig) -> Result<ExitCode> {
    let relay = GroundControl::relay(&args.connect, config)?;
    let events = relay.subscribe();
    let mut events = match UpdateRate::from_hz(args.max_rate).throttle_interval() {
        Some(period) => events.throttle_samples(period).boxed(),
        None => events,
    };
    let handle = relay.start();

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, stopping relay"),
            Err(e) => warn!("Cannot listen for ctrl-c: {}", e),
        }
        cancel.cancel();
    });

    // The loop publishes Stopped once it has closed the link
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
        if event.status() == Some(LinkStatus::Stopped) {
            break;
        }
    }

    handle.shutdown().await;
    Ok(ExitCode::SUCCESS)
}

async fn mission(args: MissionArgs, config: &GcsConfig) -> Result<ExitCode> {
    let mission: MissionList = match &args.load_file {
        Some(path) => MissionFile::new(path).load()?,
        None => SquarePattern::default().load()?,
    };
    info!("Mission created with {} items", mission.len());

    if !args.upload && args.load_file.is_none() {
        for waypoint in &mission {
            println!(
                "{}\t{}\t{:.7}\t{:.7}\t{}",
                waypoint.sequence, waypoint.command, waypoint.latitude, waypoint.longitude, waypoint.altitude
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let result = GroundControl::upload(&args.connect, &mission, config).await?;
    println!("Mission upload {result}");
    if result.is_accepted() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Upload did not complete: {}", result.outcome);
        Ok(ExitCode::from(EXIT_UPLOAD_FAILED))
    }
}
