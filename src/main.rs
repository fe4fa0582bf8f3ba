//!
//! folio-admin server binary
//! --------------------------
//! Command-line entry point for the admin backend. Configuration comes from defaults,
//! `FOLIO_*` environment variables and command-line flags, in increasing precedence.

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use folio_admin::config::{has_flag, ServerConfig, HELP};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{HELP}");
        return Ok(());
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let cfg = ServerConfig::from_env_and_args(&args)?;
    info!(target: "startup", "folio-admin starting: RUST_LOG='{}', http_port={}", rust_log, cfg.http_port);

    folio_admin::server::run_with_config(cfg).await
}
