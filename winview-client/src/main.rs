//! winview-client entry point.
//!
//! ```text
//! winview-client                    Connect with defaults
//! winview-client --server <addr>    Viewer address (overrides config)
//! winview-client --frames <n>       Stop after n frames
//! winview-client --config <path>    Use custom config TOML
//! winview-client --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use winview_core::WinClient;

use winview_client::config::ClientConfig;
use winview_client::pattern::TestPattern;
use winview_client::streamer::{StopReason, stream};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "winview-client", about = "Streams a test pattern to a winview viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "winview-client.toml")]
    config: PathBuf,

    /// Viewer address (overrides config). Example: 127.0.0.1:33315
    #[arg(short, long)]
    server: Option<String>,

    /// Stop after this many frames.
    #[arg(short, long)]
    frames: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.server_address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("winview-client v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect and wait for our id ──────────────────────────

    let addr = config.network.server_address.as_str();
    let mut client = tokio::time::timeout(config.connect_timeout(), WinClient::connect(addr))
        .await
        .map_err(|_| format!("no init from {addr} within {:?}", config.connect_timeout()))??;
    info!("connected to {addr} as client {}", client.id());

    // ── 2. Stream until closed ──────────────────────────────────

    let stream_cfg = &config.stream;
    let mut pattern = TestPattern::new(stream_cfg.width, stream_cfg.height, stream_cfg.format.into());
    info!(
        "streaming {}x{} {} at {} fps",
        pattern.width(),
        pattern.height(),
        pattern.format(),
        stream_cfg.fps
    );

    let reason = stream(&mut client, &mut pattern, config.frame_interval(), cli.frames).await?;
    match reason {
        StopReason::Closed => info!("closed by viewer"),
        StopReason::Disconnected => info!("viewer went away"),
        StopReason::FrameLimit => info!("frame limit reached"),
    }

    Ok(())
}
