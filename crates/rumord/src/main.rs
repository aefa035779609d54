//! rumord - Rumor Broadcast Node Daemon
//!
//! Reads protocol envelopes from stdin (one JSON object per line), writes
//! replies and gossip to stdout, and logs to stderr.

use clap::Parser;
use rumor_node::GossipConfig;
use rumord::runtime::{spawn_writer, NodeRuntime};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rumord")]
#[command(about = "Rumor gossip broadcast node")]
#[command(version)]
struct Cli {
    /// Delay before the first gossip retry, in milliseconds
    #[arg(long, default_value_t = 100)]
    retry_base_ms: u64,

    /// Cap on the gossip retry backoff, in milliseconds
    #[arg(long, default_value_t = 2000)]
    retry_max_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for protocol traffic.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("rumord=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = GossipConfig::default()
        .with_retry_base(Duration::from_millis(cli.retry_base_ms))
        .with_retry_max(Duration::from_millis(cli.retry_max_ms));

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let _writer = spawn_writer(rx);

    NodeRuntime::new(config, tx).run().await
}
