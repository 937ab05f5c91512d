use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use graphql_mcp_server::server::Server;
use runtime::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod runtime;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = STYLES,
    about = "GraphQL MCP Server - expose any GraphQL API as tools for an AI agent",
)]
struct Args {
    /// Path to the config file
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let config: Config = match Args::parse().config {
        Some(config_path) => runtime::read_config(config_path)?,
        None => runtime::read_config_from_env()?,
    };

    let _guard = runtime::setup_logging(&config.logging)?;

    std::panic::set_hook(Box::new(|info| {
        error!(%info, "Panic");
    }));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(config));
    // Reading stdin blocks a worker thread that would otherwise hold up shutdown
    runtime.shutdown_background();
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(
        "GraphQL MCP Server v{} // (c) GraphQL MCP Server contributors // Licensed under MIT",
        env!("CARGO_PKG_VERSION")
    );

    let whitelists = config.whitelist.whitelists();
    info!(
        endpoint = %*config.endpoint,
        query_whitelist = whitelists.query.is_restricted(),
        mutation_whitelist = whitelists.mutation.is_restricted(),
        ttl = ?config.schema_cache.ttl,
        "Configured"
    );

    let server = Server::builder()
        .endpoint(config.endpoint.into_inner())
        .headers(config.headers)
        .maybe_api_key(config.api_key)
        .whitelists(whitelists)
        .schema_source(config.schema.into())
        .schema_ttl(config.schema_cache.ttl)
        .build()?;

    let cancellation_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancellation_token.clone()));

    server
        .serve(tokio::io::stdin(), tokio::io::stdout(), cancellation_token)
        .await?;
    info!("Input closed, exiting");
    Ok(())
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
    cancellation_token.cancel();
}
