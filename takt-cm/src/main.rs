//! takt-cm (Competition Management) - Takt backend service
//!
//! Startup sequence: tracing init, root folder resolution, database
//! initialization, then serve the API.

use anyhow::Result;
use clap::Parser;
use takt_cm::{build_router, AppState};
use takt_common::config;
use takt_common::db::init_database;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "takt-cm", about = "Takt competition-management service")]
struct Args {
    /// Root folder holding takt.db and uploaded media
    #[arg(long)]
    root: Option<String>,

    /// Listen port (overrides the settings table)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Takt Competition Management (takt-cm) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();

    let root = config::resolve_root_folder(args.root.as_deref());
    config::ensure_root_folder(&root)?;
    info!("Root folder: {}", root.display());

    let db_path = config::database_path(&root);
    let pool = init_database(&db_path).await?;
    info!("✓ Database ready: {}", db_path.display());

    let port = match args.port {
        Some(port) => port,
        None => config::load_listen_port(&pool).await?,
    };

    let state = AppState::new(pool, config::media_root(&root));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("takt-cm listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
