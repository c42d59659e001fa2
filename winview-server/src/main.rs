//! winview-server entry point.
//!
//! ```text
//! winview-server                  Run in the foreground
//! winview-server --config <path>  Load a custom config TOML
//! winview-server --port <port>    Override the listen port
//! winview-server --verbose        Log at debug level
//! winview-server --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use winview_server::config::ServerConfig;
use winview_server::service::ViewerServer;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "winview-server", about = "Viewer for streamed window snapshots")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "winview-server.toml")]
    config: PathBuf,

    /// Port to listen on (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level regardless of the configured level.
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ServerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ServerConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // Init tracing.
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("winview-server v{}", env!("CARGO_PKG_VERSION"));
    info!("max payload: {} bytes", config.protocol.max_payload_bytes);
    if config.protocol.idle_timeout_ms > 0 {
        info!("idle timeout: {} ms", config.protocol.idle_timeout_ms);
    }

    let server = ViewerServer::new(config);
    let stop = server.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, closing sessions");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    server.run().await?;

    Ok(())
}
