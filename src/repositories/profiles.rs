use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ProfileBalaiRow {
    balai_id: Option<i64>,
}

/// Balai assignment of a live profile. `None` when the profile is missing,
/// deleted, or has no balai.
pub async fn find_balai_id(pool: &PgPool, user_id: Uuid) -> Result<Option<i64>, AppError> {
    let row = crate::log_query_fetch_optional!(
        "profiles.find_balai_id",
        sqlx::query_as::<_, ProfileBalaiRow>(
            r#"
                SELECT balai_id
                FROM core.profile
                WHERE user_id = $1
                  AND deleted_at IS NULL
                LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
    )?;

    Ok(row.and_then(|row| row.balai_id))
}
