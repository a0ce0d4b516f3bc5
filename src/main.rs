//! etcd configuration loader (v0.1)
//!
//! Loads a JSON document from etcd, keeps it fresh in the background and logs
//! every change until SIGINT/SIGTERM.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings.toml + CLI ──▶ config ──▶ lifecycle::startup
//!                                          │
//!                                          ▼
//!         ┌──────────── remote::ConfigLoader ◀──── snapshot() readers
//!         │  first load (exit 1 on failure)
//!         ▼
//!   remote::poller ──every reload delay──▶ store::EtcdStore ──▶ etcd gateway
//!         │
//!         └── lifecycle::Shutdown (signals) stops the loop
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use etcd_config_loader::config::{read_config, split_endpoints, validate_config, LoaderConfig};
use etcd_config_loader::lifecycle::{self, signals, Shutdown};
use etcd_config_loader::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "etcd-config-loader")]
#[command(about = "Load a JSON configuration document from etcd and keep it fresh", long_about = None)]
struct Cli {
    /// Settings file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store endpoints, comma-separated (overrides the settings file).
    #[arg(short, long)]
    endpoints: Option<String>,

    /// Key holding the configuration document (overrides the settings file).
    #[arg(short, long)]
    key: Option<String>,

    /// Pause between refreshes in milliseconds (overrides the settings file).
    #[arg(long)]
    reload_delay_ms: Option<u64>,

    /// Print the document once and exit.
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(&self, config: &mut LoaderConfig) {
        if let Some(endpoints) = &self.endpoints {
            config.store.endpoints = split_endpoints(endpoints);
        }
        if let Some(key) = &self.key {
            config.store.key.clone_from(key);
        }
        if let Some(delay_ms) = self.reload_delay_ms {
            config.reload.delay_ms = delay_ms;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match read_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: cannot read settings from {}: {}", path.display(), e);
                return Ok(ExitCode::FAILURE);
            }
        },
        None => LoaderConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for err in errors {
            eprintln!("Error: {}", err);
        }
        return Ok(ExitCode::FAILURE);
    }

    logging::init_logging(&config.observability);
    tracing::info!("etcd-config-loader v0.1.0 starting");

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let shutdown = Shutdown::new();
    let loader = match lifecycle::start::<serde_json::Value>(&config, &shutdown).await {
        Ok(loader) => loader,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start without configuration, exiting");
            return Ok(ExitCode::FAILURE);
        }
    };

    if cli.once {
        if let Some(document) = loader.snapshot() {
            println!("{}", serde_json::to_string_pretty(document.as_ref())?);
        }
        shutdown.trigger();
        loader.join().await;
        return Ok(ExitCode::SUCCESS);
    }

    signals::shutdown_on_signal(&shutdown).await;
    loader.join().await;

    let stats = loader.stats();
    tracing::info!(
        successful_loads = stats.successful_loads,
        failed_loads = stats.failed_loads,
        revision = stats.revision,
        "Shutdown complete"
    );
    Ok(ExitCode::SUCCESS)
}
