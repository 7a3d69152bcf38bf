use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::{
    app::{self, config::AppConfig, state::AppState},
    auth::jwt::JwtConfig,
    error::AppError,
    telemetry,
};

pub async fn run() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing()
        .map_err(|err| AppError::Internal(format!("telemetry init failed: {}", err)))?;

    let config = AppConfig::from_env()?;
    let jwt = JwtConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(pool, config, jwt);
    let router = app::router::build_router(state)?;

    tracing::info!(%addr, "Server listening");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Internal(format!("bind failed: {}", err)))?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|err| AppError::Internal(format!("server error: {}", err)))?;

    Ok(())
}
