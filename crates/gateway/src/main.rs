use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cx_gateway::api;
use cx_gateway::bootstrap;
use cx_gateway::cli::{self, Cli, Command, ConfigCommand};
use cx_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let config = cli::load_config(&cli.config)?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let config = cli::load_config(&cli.config)?;
            if !cli::validate(&config, &cli.config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let config = cli::load_config(&cli.config)?;
            cli::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("cx-gateway {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,cx_gateway=debug")),
        )
        .json()
        .init();
}

/// Start the gateway with the given configuration.
///
/// The shipped binary carries no Cx transport of its own (the wire
/// encoding lives with the embedding transport library), so it serves
/// either in provisioning-fallback mode or embedded with a transport
/// via [`bootstrap::build_app_state`].
async fn run_server(config: Arc<cx_domain::config::Config>) -> anyhow::Result<()> {
    tracing::info!("cx-gateway starting");

    if config.hss.configured {
        anyhow::bail!(
            "hss.configured is true but this binary embeds no Cx transport; \
             set hss.configured = false for provisioning-fallback mode, or embed \
             the gateway with a transport via bootstrap::build_app_state"
        );
    }

    let state = bootstrap::build_app_state(Arc::clone(&config), None)?;

    // The notification handler would be registered with the Cx
    // transport here; in fallback mode there is no inbound Cx leg.
    let _notifications = bootstrap::build_notification_handler(&state);

    // ── Management listener ──────────────────────────────────────────
    if let Some(management_port) = config.server.management_port {
        let addr = format!("{}:{}", config.server.host, management_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let management = api::management_router(state.clone());
        tracing::info!(%addr, "management listener ready");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, management).await {
                tracing::error!(error = %e, "management listener failed");
            }
        });
    }

    // ── Router-facing listener ───────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening for router requests");
    serve(listener, state).await
}

async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
