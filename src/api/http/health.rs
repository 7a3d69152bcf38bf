use serde::Serialize;

use crate::dto::common::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_handle() -> ApiResponse<HealthStatus> {
    ApiResponse::ok(
        "Service is healthy",
        HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}
