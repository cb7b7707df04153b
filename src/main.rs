//! Study Companion HTTP server
//!
//! Starts an Axum web server exposing document upload and AI study aids.

use clap::Parser;
use study_companion::{
    cli::{self, Cli, Command},
    config::Config,
    handlers::{self, AppState},
    store::Store,
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config { output } => {
            let template = cli::generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Configuration template written to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(())
        }
        Command::SeedTypes => {
            let config = Config::from_file(&cli.config)?;
            telemetry::init(&config.observability.log_level);
            let store = Store::open(&config.storage.database_path)?;
            let created = cli::seed_types(&store)?;
            println!("Created {} document type(s)", created);
            Ok(())
        }
        Command::CreateUser { username, email } => {
            let config = Config::from_file(&cli.config)?;
            telemetry::init(&config.observability.log_level);
            let store = Store::open(&config.storage.database_path)?;
            let key = cli::create_user(&store, &username, &email)?;
            println!("{}", key);
            Ok(())
        }
        Command::Serve => serve(&cli.config).await,
    }
}

async fn serve(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::from_file(config_path)?);
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting Study Companion server on {}:{}",
        config.server.host,
        config.server.port
    );

    std::fs::create_dir_all(config.storage.media_root.join("documents"))?;

    let state = AppState::from_config(config.clone())?;
    state.caches().clone().start_sweeper(
        Duration::from_secs(config.cache.sweep_interval_seconds),
        state.metrics().clone(),
    );

    let app = handlers::router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
