//! CrewDesk - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crewdesk_backend::{
    api::{self, AppState},
    bootstrap,
    cli::{self, Cli, Command, LogFormat},
    config::{Config, StoreBackend},
    db,
    error::{AppError, Result},
    store::{MemoryStore, PgStore, Store},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format == LogFormat::Json);

    match cli.command() {
        Command::HashPassword { password } => {
            println!("{}", cli::hash_password(password.as_deref())?);
            Ok(())
        }
        Command::Serve => serve().await,
    }
}

async fn serve() -> Result<()> {
    let config = Config::from_env()?;
    tracing::info!(backend = ?config.store_backend, "Starting CrewDesk");

    let store = open_store(&config).await?;

    let report = bootstrap::provision(store.clone(), &config).await?;
    if report.admin_role_created || report.default_role_created {
        tracing::info!(
            admin_role = report.admin_role_created,
            default_role = report.default_role_created,
            "Seeded roles"
        );
    }

    let cors = cors_layer(&config.cors_origins)?;
    let addr: SocketAddr = config.bind_address.parse()?;

    let state = Arc::new(AppState::new(config, store));
    let app = api::routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Config("DATABASE_URL not set".into()))?;
            let pool = db::create_pool(url).await?;
            tracing::info!("Connected to database");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|_| AppError::Config(format!("Invalid CORS origin '{}'", o)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
