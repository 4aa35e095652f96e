use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use dotenvy::dotenv;
use http::HeaderValue;
use reelpay::app::create_router;
use reelpay::config::app_config::AppConfig;
use reelpay::logging::setup_logging;
use reelpay::models::AppState;
use reelpay::repositories::entitlement_repository::EntitlementRepository;
use reelpay::services::reconciliation_service::ReconciliationService;
use chrono::Utc;
use std::{env, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal};
use tokio::time::interval;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), eyre::Error> {
    setup_logging();

    info!("Starting ReelPay settlement service");

    dotenv().ok();
    let db_url = env::var("DATABASE_URL").map_err(|_| eyre::eyre!("DATABASE_URL must be set"))?;

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:5173".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .collect::<Vec<String>>();

    info!("cors origins: {:?}", cors_origins);

    let manager = ConnectionManager::<PgConnection>::new(db_url);
    let pool = Pool::builder().max_size(10).build(manager).map_err(|e| {
        error!("Failed to create database pool: {}", e);
        eyre::eyre!("Failed to create database pool: {}", e)
    })?;

    let config = AppConfig::from_env()?;
    let state = AppState::new(pool, config)?;

    tokio::spawn(expire_rentals(state.clone()));
    tokio::spawn(retry_reconciliations(state.clone()));

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(
            cors_origins
                .iter()
                .map(|s| s.parse::<HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?,
        );

    let app = create_router(state).layer(cors);

    let addr = format!("{}:{}", host, port).parse::<SocketAddr>()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);
    info!(
        "Swagger UI available at http://{}/swagger-ui/index.html#/",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

// handle Ctrl+C for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Flips active rentals past their expiry to expired.
async fn expire_rentals(state: Arc<AppState>) {
    let mut ticker = interval(std::time::Duration::from_secs(60));
    loop {
        ticker.tick().await;
        let mut conn = match state.db.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to get DB connection for rental expiry: {}", e);
                continue;
            }
        };
        match EntitlementRepository::expire_overdue_rentals(&mut conn, Utc::now()) {
            Ok(0) => {}
            Ok(n) => info!("Expired {} overdue rentals", n),
            Err(e) => error!("Failed to expire rentals: {}", e),
        }
    }
}

/// Re-drives settlements and refund reversals parked after money moved.
async fn retry_reconciliations(state: Arc<AppState>) {
    let mut ticker = interval(state.config.settlement.reconciliation_sweep_interval);
    loop {
        ticker.tick().await;
        match ReconciliationService::sweep_once(&state).await {
            Ok(0) => {}
            Ok(n) => info!("Resolved {} reconciliation tasks", n),
            Err(e) => error!("Reconciliation sweep failed: {}", e),
        }
    }
}
