//! PDF Viewer MCP - Entry point
//!
//! Hosts PDF viewer instances over MCP on stdio. Any command line arguments
//! are taken as the directories local documents may be loaded from.

use pdf_viewer_mcp::{run_server, run_server_with_dirs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_viewer_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting PDF Viewer MCP");

    let resource_dirs: Vec<String> = std::env::args().skip(1).collect();
    if resource_dirs.is_empty() {
        run_server().await
    } else {
        run_server_with_dirs(resource_dirs).await
    }
}
