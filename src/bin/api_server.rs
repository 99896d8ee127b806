//! REST API Server for the scan-throughput dashboard
//!
//! Usage:
//!   ./target/release/api_server [options]
//!
//! Options:
//!   --port PORT           Port to listen on (default: 8080)
//!   --config PATH         JSON dashboard config
//!   --default-file PATH   Scan export served when no upload is selected
//!
//! REST endpoints:
//!   GET  /api/v1/health             - Health check
//!   GET  /api/v1/shifts             - Shift windows
//!   POST /api/v1/datasets           - Upload a scan CSV or xlsx (raw body)
//!   GET  /api/v1/dashboard          - Full dashboard view for a session
//!   GET  /api/v1/groups/:code       - Relative efficiency for one labor group

use anyhow::{Context, Result};
use clap::Parser;
use scan_throughput::api::{self, DashboardService};
use scan_throughput::config::DashboardConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the scan-throughput dashboard over REST")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// JSON dashboard config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scan export (CSV or xlsx) served when no upload is selected
    #[arg(long)]
    default_file: Option<PathBuf>,
}

fn print_banner(port: u16, config: &DashboardConfig) {
    println!("============================================================");
    println!("         SCAN THROUGHPUT DASHBOARD API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:           {}", port);
    println!("  REST:           http://localhost:{}/api/v1/", port);
    println!("  Sorting center: {}", config.sorting_center);
    println!("  Default file:   {}", config.default_file_path.display());
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health             Health check");
    println!("  GET  /api/v1/shifts             Shift windows");
    println!("  POST /api/v1/datasets           Upload scan CSV/xlsx");
    println!("  GET  /api/v1/dashboard          Dashboard view");
    println!("  GET  /api/v1/groups/:code       Labor group efficiency");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let args = Args::parse();
    let mut config = DashboardConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(path) = args.default_file {
        config.default_file_path = path;
    }

    print_banner(args.port, &config);

    let service = Arc::new(DashboardService::new(config));
    let app = api::router(service);

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
