//! Multi-tenant reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  TENANT PROXY                    │
//!                         │                                                  │
//!   Client Request        │  ┌────────┐   ┌────────┐   ┌─────────────────┐   │
//!   ──────────────────────┼─▶│  net   │──▶│  http  │──▶│ routing         │   │
//!                         │  │listener│   │ server │   │ Host glob match │   │
//!                         │  └────────┘   └────────┘   └────────┬────────┘   │
//!                         │                                     ▼            │
//!                         │                            ┌─────────────────┐   │
//!                         │                            │ admission gate  │   │
//!                         │                            │ C running + Q   │   │
//!                         │                            └────────┬────────┘   │
//!                         │                                     ▼            │
//!   Client Response       │  ┌────────┐   ┌────────┐   ┌─────────────────┐   │
//!   ◀─────────────────────┼──│  CORS  │◀──│dispatch│◀──│ load_balancer   │◀──┼── Backend
//!                         │  │ policy │   │        │   │ round robin     │   │
//!                         │  └────────┘   └────────┘   └─────────────────┘   │
//!                         │                                                  │
//!                         │  config (watch + SIGHUP → snapshot swap)         │
//!                         │  observability · lifecycle · CDN sub-server      │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tenant_proxy::lifecycle;
use tenant_proxy::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "tenant-proxy", about = "Multi-tenant reverse proxy", disable_version_flag = true)]
struct Cli {
    /// Configuration file
    #[arg(short = 'f', long = "config", default_value = "config.toml")]
    config: PathBuf,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    logging::init();

    // axum-server builds its TLS config from the process-wide provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = ?cli.config, "tenant-proxy starting");

    match lifecycle::run(&cli.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
