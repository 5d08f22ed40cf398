use anyhow::{Context, Result};
use clap::Parser;
use gproxy_common::{ConfigFile, ConfigSnapshot};
use gproxy_core::Core;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut file = ConfigFile::from_path(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config))?;
    if let Some(host) = cli.host {
        file.host = Some(host);
    }
    if let Some(port) = cli.port {
        file.port = Some(port);
    }
    let admin_password = cli
        .admin_password
        .or_else(|| file.admin_password.clone())
        .unwrap_or_else(|| "pwd".to_string());

    let snapshot = ConfigSnapshot::from_file(file, admin_password.clone())
        .context("validating config")?;
    let bind = format!("{}:{}", snapshot.host, snapshot.port);

    let core = Core::new(snapshot);
    let app = gproxy_router::app(core.state(), admin_password, cli.config.clone());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("gproxy listening on {bind}");
    axum::serve(listener, app).await?;
    Ok(())
}
