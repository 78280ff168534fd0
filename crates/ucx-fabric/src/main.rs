//! ucx-fabric-scan - UCX Fabric Interface Scanner
//!
//! Entry point for the ucx-fabric-scan tool.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fabric_types::FabricInterfaceSet;
use ucx_fabric::{DiscoveryConfig, UcxProvider};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// List the fabric interfaces UCX can drive.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML discovery configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// libuct to load; may be repeated. Replaces configured candidates.
    #[arg(short, long = "library", value_name = "PATH")]
    libraries: Vec<String>,

    /// Print interfaces as JSON.
    #[arg(long)]
    json: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Initializes tracing/logging subsystem
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(args: &Args) -> anyhow::Result<DiscoveryConfig> {
    let mut config = match &args.config {
        Some(path) => DiscoveryConfig::from_file(path)?,
        None => DiscoveryConfig::default(),
    }
    .with_env_overrides();

    if !args.libraries.is_empty() {
        config.library_paths = args.libraries.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_interfaces(fis: &FabricInterfaceSet, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::to_string_pretty(fis).context("serializing interfaces")?;
        println!("{}", out);
    } else {
        print!("{}", fis);
    }
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    info!(libraries = ?config.library_paths, "--- Starting ucx-fabric-scan ---");

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let provider = UcxProvider::new(config);
    let fis = tokio::task::spawn_blocking(move || provider.get_fabric_interfaces(&cancel))
        .await
        .context("discovery task failed")??;

    print_interfaces(&fis, args.json)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_format);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
