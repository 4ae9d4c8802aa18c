//! Line-oriented front end for the Balatro file bridge.
//!
//! Reads one JSON request per stdin line, answers with one JSON object per
//! stdout line, and between requests runs the state monitor. Logs go to
//! stderr so stdout carries responses only.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `bridge-config.yaml` (or `BRIDGE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate and open the shared directory
//! 4. Serve stdin until EOF or Ctrl-C

mod error;
mod handler;

use std::path::PathBuf;
use std::time::Duration;

use balatro_core::config::{BridgeConfig, LoggingConfig};
use balatro_core::orchestrator::Orchestrator;
use balatro_ipc::MessageChannel;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::BridgeError;
use crate::handler::Response;

/// Configuration file used when `BRIDGE_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "bridge-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the shared directory
/// fails validation, or stdout becomes unwritable.
#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let config_path = std::env::var("BRIDGE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = BridgeConfig::load_or_default(&config_path)?;

    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        base_path = config.channel.base_path,
        result_timeout_ms = config.channel.result_timeout_ms,
        monitor_enabled = config.monitor.enabled,
        monitor_interval_ms = config.monitor.interval_ms,
        "balatro-bridge starting"
    );

    let channel = MessageChannel::open(&config.channel).inspect_err(|e| {
        error!(error = %e, "cannot open shared directory");
    })?;
    let mut orchestrator = Orchestrator::from_config(channel, &config);

    serve(&mut orchestrator, &config).await?;

    info!("balatro-bridge stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the file.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Answer stdin requests and run monitor ticks until EOF or Ctrl-C.
async fn serve(
    orchestrator: &mut Orchestrator<MessageChannel>,
    config: &BridgeConfig,
) -> Result<(), BridgeError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let period = Duration::from_millis(config.monitor.interval_ms.max(1));
    let mut monitor = tokio::time::interval(period);
    monitor.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("awaiting requests on stdin");
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let response = handler::handle_line(orchestrator, &line).await;
                    write_response(&mut stdout, &response).await?;
                }
                None => {
                    info!("stdin closed, shutting down");
                    break;
                }
            },
            _ = monitor.tick(), if config.monitor.enabled => {
                orchestrator.monitor_tick();
            }
            _ = &mut ctrl_c => {
                info!("received Ctrl-C, shutting down");
                break;
            }
        }
    }
    Ok(())
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &Response,
) -> Result<(), BridgeError> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
