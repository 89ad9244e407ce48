use clap::{Parser, Subcommand};

use crate::app::{router, AppState};
use crate::auth::hash_password;
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "transito-api")]
#[command(about = "Transito API - users, catalogs and citizen complaints over REST")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,

        #[arg(long, help = "Keep all data in memory instead of Postgres")]
        memory: bool,
    },

    #[command(about = "Print a bcrypt hash for seeding a user's contrasena column")]
    HashPassword {
        #[arg(help = "Plaintext password")]
        plaintext: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None, memory: false }) {
        Commands::Serve { port, memory } => serve(port, memory).await,
        Commands::HashPassword { plaintext } => {
            println!("{}", hash_password(&plaintext)?);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if memory {
        config.storage.mode = crate::config::StorageMode::Memory;
    }
    tracing::info!(
        environment = ?config.environment,
        storage = ?config.storage.mode,
        "Starting Transito API"
    );

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::from_config(config).await?;
    let database = state.database.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Transito API listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(database) = database {
        database.close_all().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
