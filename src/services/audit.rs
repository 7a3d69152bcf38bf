use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::actor::Actor, error::AppError, repositories::audit_logs as audit_repo,
    telemetry::RequestContext,
};

/// One row of the audit trail.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub request_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub ip: Option<String>,
    pub action: String,
    pub entity: String,
    pub detail: String,
}

impl AuditEntry {
    pub fn new(actor: &Actor, request: &RequestContext, action: &str, detail: String) -> Self {
        Self {
            request_id: non_empty(&request.request_id),
            user_id: actor.user_id,
            email: non_empty(&actor.email),
            role: non_empty(&actor.role_name)
                .or_else(|| Some(actor.role.display_name().to_string())),
            ip: request.client_ip.clone(),
            action: action.to_string(),
            entity: request.entity(),
            detail,
        }
    }
}

/// Fire-and-forget writer for the audit trail. A failed write is logged and
/// never surfaces to the caller.
#[derive(Clone)]
pub struct AuditSink {
    pool: PgPool,
}

impl AuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn record(
        &self,
        actor: &Actor,
        request: &RequestContext,
        action: &str,
        detail: impl Into<String>,
    ) {
        let entry = AuditEntry::new(actor, request, action, detail.into());
        tracing::info!(
            target: "audit",
            action = %entry.action,
            entity = %entry.entity,
            user_id = ?entry.user_id,
            detail = %entry.detail,
            "Audit entry"
        );

        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(error) = audit_repo::insert_audit_log(&pool, &entry).await {
                tracing::warn!(
                    action = %entry.action,
                    error = %error,
                    "Failed to persist audit entry"
                );
            }
        });
    }

    /// Records `Success` or the error text of an operation outcome.
    pub fn record_outcome<T>(
        &self,
        actor: &Actor,
        request: &RequestContext,
        action: &str,
        outcome: &Result<T, AppError>,
    ) {
        self.record(actor, request, action, outcome_detail(outcome));
    }
}

fn outcome_detail<T>(outcome: &Result<T, AppError>) -> String {
    match outcome {
        Ok(_) => "Success".to_string(),
        Err(error) => error.to_string(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_entry_carries_ip_and_entity() {
        let actor = Actor::guest(Some("198.51.100.4"));
        let request = RequestContext {
            request_id: "req-9".to_string(),
            trace_id: "req-9".to_string(),
            method: "POST".to_string(),
            path: "/api/v1/comments".to_string(),
            client_ip: Some("198.51.100.4".to_string()),
        };

        let entry = AuditEntry::new(&actor, &request, "CREATE_COMMENT", "Success".to_string());
        assert_eq!(entry.user_id, None);
        assert_eq!(entry.request_id.as_deref(), Some("req-9"));
        assert_eq!(entry.role.as_deref(), Some("Guest"));
        assert_eq!(entry.ip.as_deref(), Some("198.51.100.4"));
        assert_eq!(entry.entity, "POST /api/v1/comments");
    }

    #[test]
    fn outcome_detail_uses_error_text() {
        let ok: Result<(), AppError> = Ok(());
        assert_eq!(outcome_detail(&ok), "Success");

        let err: Result<(), AppError> = Err(AppError::Forbidden("nope".to_string()));
        assert_eq!(outcome_detail(&err), "Forbidden: nope");
    }
}
