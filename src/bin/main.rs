//! asg-dns-sd binary entry point.
//!
//! Replays one lifecycle notification against a snapshot of the registry and
//! hosted zones, and prints the submitted change batch.

use asg_dns_sd::{telemetry, Config, LifecycleEvent, Notification, Reactor, Snapshot};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

/// Reconcile DNS-SD SRV records for an auto scaling group lifecycle event.
#[derive(Parser, Debug)]
#[command(name = "asg-dns-sd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Registry and hosted zone snapshot (JSON).
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Notification to replay (JSON); `-` reads stdin.
    #[arg(short, long, default_value = "-")]
    event: String,

    /// Treat the input as a bare lifecycle message instead of a notification envelope.
    #[arg(long)]
    raw: bool,

    /// Write the updated zones back to the snapshot file.
    #[arg(long)]
    write_back: bool,
}

async fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(path).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        snapshot = %args.snapshot.display(),
        event = %args.event,
        ttl = config.reactor.ttl,
        hostname = ?config.reactor.hostname,
        "Starting asg-dns-sd"
    );

    let result = run(&args, &config).await;

    telemetry::shutdown();

    if let Err(e) = result {
        error!("reconciliation failed: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: &Args, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let input = read_input(&args.event).await?;
    let event = if args.raw {
        LifecycleEvent::from_message(&input)?
    } else {
        let notification: Notification = serde_json::from_str(&input)
            .map_err(|e| asg_dns_sd::ReactorError::MalformedEvent(e.to_string()))?;
        LifecycleEvent::from_notification(&notification)?
    };

    let (registry, store) = Snapshot::load(&args.snapshot).await?.into_backends();
    let reactor = Reactor::new(registry, store, config.reactor.hostname).with_config(&config.reactor);

    let batch = reactor.process(&event).await?;
    println!("{}", serde_json::to_string_pretty(&batch)?);

    if args.write_back {
        Snapshot::capture(reactor.registry(), reactor.store())
            .save(&args.snapshot)
            .await?;
        info!(snapshot = %args.snapshot.display(), "snapshot updated");
    }

    info!(instance_id = %event.instance_id, "asg-dns-sd complete");
    Ok(())
}
