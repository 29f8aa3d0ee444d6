//! RDC client entry point.
//!
//! ```text
//! rdc-client                        Connect with defaults
//! rdc-client --config <path>        Use custom config TOML
//! rdc-client --remote <ip:port>     Override the remote endpoint
//! rdc-client --gen-config           Dump default config and exit
//! rdc-client --write-config <path>  Write default config to a file and exit
//! rdc-client --replay <trace.jsonl> Replay a network trace and exit
//! ```

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rdc_core::PerformanceCoordinator;

use rdc_client::config::ClientConfig;
use rdc_client::replay::{parse_trace, replay};
use rdc_client::transport::UdpTransport;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rdc-client", about = "RDC remote desktop session client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rdc-client.toml")]
    config: PathBuf,

    /// Remote address (overrides config). Example: 192.168.1.100:7340
    #[arg(short, long)]
    remote: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to PATH and exit.
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Replay a JSON-lines network trace through the bitrate controller
    /// and print one JSON line per adaptation step.
    #[arg(long, value_name = "TRACE")]
    replay: Option<PathBuf>,

    /// Samples fed between adaptation steps during replay.
    #[arg(long, default_value_t = 1)]
    adapt_every: usize,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }
    if let Some(path) = &cli.write_config {
        ClientConfig::write_default(path)?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(addr) = cli.remote {
        config.network.remote_address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rdc-client v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = cli.replay {
        return run_replay(&path, &config, cli.adapt_every);
    }

    config.validate()?;

    // ── 1. Transport ────────────────────────────────────────────

    let transport = Arc::new(
        UdpTransport::connect(
            &config.network.bind_address,
            &config.network.remote_address,
            Duration::from_millis(config.network.timeout_ms),
        )
        .await?,
    );

    // ── 2. Session ──────────────────────────────────────────────

    let coordinator =
        PerformanceCoordinator::new(config.session.clone(), config.viewport(), transport.clone())?;
    coordinator.start()?;
    let mut health = coordinator.health_receiver();

    // ── 3. Monitor until Ctrl+C ─────────────────────────────────

    let mut ticks: u32 = 0;
    let mut was_connected = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received");
                break;
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = health.borrow_and_update().clone();
                if snapshot.connected != was_connected {
                    was_connected = snapshot.connected;
                    if was_connected {
                        info!("remote reachable");
                    } else {
                        warn!("remote unreachable; input is held");
                    }
                }
                ticks = ticks.wrapping_add(1);
                let every = config.logging.health_every;
                if every > 0 && ticks % every == 0 {
                    info!(
                        bitrate_bps = snapshot.bitrate_bps,
                        quality = snapshot.quality.map_or("unknown", |q| q.as_str()),
                        rtt_ms = snapshot.avg_rtt_ms,
                        batches = snapshot.batches_sent,
                        frames_dropped = snapshot.frames.dropped,
                        ok = snapshot.meets_requirements,
                        "session health"
                    );
                }
            }
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    coordinator.shutdown().await;
    transport.close();
    info!("final health: {}", coordinator.health_json()?);

    Ok(())
}

fn run_replay(
    path: &Path,
    config: &ClientConfig,
    adapt_every: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = parse_trace(BufReader::new(File::open(path)?))?;
    info!(samples = samples.len(), trace = %path.display(), "replaying trace");

    let steps = replay(&samples, &config.session.bitrate, adapt_every)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for step in &steps {
        writeln!(out, "{}", serde_json::to_string(step)?)?;
    }

    if let Some(last) = steps.last() {
        info!(
            steps = steps.len(),
            final_bitrate_bps = last.bitrate_bps,
            "replay finished"
        );
    }
    Ok(())
}
