use sqlx::PgPool;
use std::sync::Arc;

use crate::{app::config::AppConfig, auth::jwt::JwtConfig, services::audit::AuditSink};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtConfig,
    pub audit: AuditSink,
}

impl AppState {
    pub fn new(db: PgPool, config: AppConfig, jwt: JwtConfig) -> Self {
        let audit = AuditSink::new(db.clone());
        Self {
            db,
            config: Arc::new(config),
            jwt,
            audit,
        }
    }
}
