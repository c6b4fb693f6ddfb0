//! Command-line entry point for kafka-mcp
//!
//! Serves MCP over stdin/stdout until the client closes its end. Register it
//! with an MCP client as a stdio server:
//!
//! ```json
//! {"mcpServers": {"kafka": {"command": "kafka-mcp", "args": ["--consume-deadline", "5s"]}}}
//! ```

use std::sync::Arc;

use clap::Parser;
use kafka_mcp::{build_server, init_tracing, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format);

    tracing::info!(
        consume_deadline = ?config.consume_deadline,
        send_timeout = ?config.send_timeout,
        metadata_timeout = ?config.metadata_timeout,
        default_count = config.default_count(),
        "Starting kafka-mcp {}",
        env!("CARGO_PKG_VERSION")
    );

    let server = Arc::new(build_server(&config));
    server.serve_stdio().await
}
