//! ServiceHub server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use servicehub_core::ServiceRegistry;
use servicehub_server::HubServer;

/// ServiceHub - host, activate, and invoke dynamically loaded services.
#[derive(Parser, Debug)]
#[command(name = "servicehub")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:12345", env = "SERVICEHUB_LISTEN")]
    listen: SocketAddr,

    /// Directory scanned for service packages; uploads land here too.
    #[arg(long, default_value = "services", env = "SERVICEHUB_SERVICES_DIR")]
    services_dir: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            tracing_subscriber::EnvFilter::new("servicehub=debug")
        } else {
            tracing_subscriber::EnvFilter::new("servicehub=info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    std::fs::create_dir_all(&args.services_dir).with_context(|| {
        format!(
            "failed to create services directory {}",
            args.services_dir.display()
        )
    })?;

    let registry = Arc::new(ServiceRegistry::with_library_loader(args.services_dir));
    registry.load_all().await;
    tracing::info!(count = registry.count().await, "startup scan complete");

    HubServer::new(registry)
        .run(args.listen)
        .await
        .with_context(|| format!("server failed on {}", args.listen))?;

    Ok(())
}
