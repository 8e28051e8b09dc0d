use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use account_api::config::AppConfig;
use account_api::server::{app, AppState};
use account_api::session::CookieSessionStore;

#[derive(Parser)]
#[command(name = "account-api")]
#[command(about = "Session logout, current-user and health routes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Bind host, overrides SERVER_HOST")]
        host: Option<String>,

        #[arg(long, help = "Bind port, overrides ACCOUNT_API_PORT / PORT")]
        port: Option<u16>,
    },

    #[command(about = "Sign a session for a user and print its Set-Cookie value")]
    MintSession {
        #[arg(long, help = "User id to embed as the session subject")]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::MintSession { user } => {
            let cookie = CookieSessionStore::new(&config.security)
                .issue(user)
                .context("failed to sign session")?;
            println!("{}", cookie.to_str()?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting account API in {:?} mode", config.environment);
    let missing = config.missing_keys();
    if !missing.is_empty() {
        tracing::warn!("Missing configuration keys: {}", missing.join(", "));
    }

    let bind_addr = config.bind_addr();
    let state = AppState::from_config(config);
    let database = state.database.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Account API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
