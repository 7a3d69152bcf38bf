use sqlx::PgPool;

use crate::{error::AppError, services::audit::AuditEntry};

pub async fn insert_audit_log(pool: &PgPool, entry: &AuditEntry) -> Result<(), AppError> {
    crate::log_query_execute!(
        "audit_logs.insert_audit_log",
        sqlx::query(
            r#"
            INSERT INTO audit.audit_log (
                request_id,
                user_id,
                email,
                role,
                ip,
                action,
                entity,
                detail
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.request_id.as_deref())
        .bind(entry.user_id)
        .bind(entry.email.as_deref())
        .bind(entry.role.as_deref())
        .bind(entry.ip.as_deref())
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.detail)
        .execute(pool)
    )?;

    Ok(())
}
