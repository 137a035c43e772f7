mod auth;
mod config;
mod db;
mod error;
mod extractors;
mod graphql;
mod routes;
mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
        schema: graphql::build_schema(),
    };

    // Build router
    let mut app = Router::new()
        .route("/", get(routes::index))
        .merge(routes::graphql::router())
        .layer(TraceLayer::new_for_http());

    // Credentialed CORS needs an exact origin; without one the API is
    // same-origin only and no CORS headers are emitted at all.
    if let Some(origin) = config.cors.allowed_origin.as_deref() {
        let cors = CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true);
        app = app.layer(cors);
        tracing::info!("CORS enabled for origin {origin}");
    }

    let app = app.with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
