use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use pier_client_core::config::Config;
use pier_client_core::emulator::stdio::StdioEmulatorFactory;
use pier_client_core::session::SessionController;
use pier_client_core::telemetry::logging::{self, LogConfig, LogLevel};
use pier_client_core::transport::websocket::{config::EndpointConfig, WebSocketChannel};

#[derive(Parser, Debug)]
#[command(
    name = "pier",
    about = "Attach this terminal to a remote process served over a websocket"
)]
struct Cli {
    /// Serving location: host, host:port, or full URL. The `ws/` endpoint
    /// is derived from it. Falls back to $PIER_SERVER.
    url: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[arg(long, help = "Write logs to a file instead of stderr")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig {
        level: cli.log_level,
        file: cli.log_file,
    })?;

    let config = Config::from_env();
    let location = cli.url.unwrap_or(config.server);
    let endpoint = EndpointConfig::new(location);

    let (channel, transport_events) = WebSocketChannel::connect(&endpoint)
        .await
        .context("unable to reach the remote endpoint")?;

    let (session, mut notices) = SessionController::new(channel, StdioEmulatorFactory::new());

    // Out-of-band notices go to stderr, never into terminal content.
    let notice_task = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            eprint!("\r\n[pier] {notice}\r\n");
        }
    });

    let summary = session.run(transport_events).await?;
    // The controller (and its notice sender) is gone now, so the task
    // drains whatever arrived before close and then ends on its own.
    let _ = notice_task.await;
    info!(?summary, "session finished");
    eprint!("\r\n");
    Ok(())
}
