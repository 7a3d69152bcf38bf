use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::comments::{Comment, CommentLink},
    repositories::surveys::{SCOPE_PREDICATE, bind_scope},
    usecases::scope::ScopeBinds,
};

#[derive(Debug)]
pub(crate) struct NewComment<'a> {
    pub survey_id: Uuid,
    pub parent_id: i64,
    pub user_id: Option<Uuid>,
    pub name: &'a str,
    pub detail: &'a str,
    pub images: &'a [String],
    pub created_by: &'a str,
}

pub(crate) async fn insert_comment(
    pool: &PgPool,
    params: NewComment<'_>,
) -> Result<Comment, AppError> {
    let comment = crate::log_query_fetch_one!(
        "comments.insert_comment",
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO survey.comment (
                user_id,
                survey_id,
                parent_id,
                is_resolved,
                name,
                detail,
                images,
                created_by,
                updated_by
            )
            VALUES ($1, $2, $3, FALSE, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(params.user_id)
        .bind(params.survey_id)
        .bind(params.parent_id)
        .bind(params.name)
        .bind(params.detail)
        .bind(params.images)
        .bind(params.created_by)
        .fetch_one(pool)
    )?;

    Ok(comment)
}

pub async fn find_comment(pool: &PgPool, comment_id: i64) -> Result<Option<Comment>, AppError> {
    let comment = crate::log_query_fetch_optional!(
        "comments.find_comment",
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT *
            FROM survey.comment
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(comment_id)
        .fetch_optional(pool)
    )?;

    Ok(comment)
}

/// True when `parent_id` names a live comment on `survey_id`.
pub async fn parent_on_survey(
    pool: &PgPool,
    parent_id: i64,
    survey_id: Uuid,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = crate::log_query_fetch_optional!(
        "comments.parent_on_survey",
        sqlx::query_as(
            r#"
            SELECT id
            FROM survey.comment
            WHERE id = $1
              AND survey_id = $2
              AND deleted_at IS NULL
            "#,
        )
        .bind(parent_id)
        .bind(survey_id)
        .fetch_optional(pool)
    )?;

    Ok(row.is_some())
}

/// Live comments on surveys visible under `scope`, oldest first.
pub async fn list_comments(
    pool: &PgPool,
    scope: ScopeBinds,
    survey_id: Option<Uuid>,
    keyword: Option<&str>,
) -> Result<Vec<Comment>, AppError> {
    let sql = format!(
        r#"
        SELECT c.*
        FROM survey.comment c
        JOIN survey.survey s ON s.id = c.survey_id
        LEFT JOIN core.profile p
            ON p.user_id = s.user_id
            AND p.deleted_at IS NULL
        WHERE c.deleted_at IS NULL
          AND {SCOPE_PREDICATE}
          AND ($5::uuid IS NULL OR c.survey_id = $5)
          AND ($6::text IS NULL OR c.name ILIKE '%' || $6 || '%' OR c.detail ILIKE '%' || $6 || '%')
        ORDER BY c.created_at ASC, c.id ASC
        "#
    );

    let query = bind_scope(sqlx::query_as::<_, Comment>(&sql), scope)
        .bind(survey_id)
        .bind(keyword);
    let comments = crate::log_query_fetch_all!("comments.list_comments", query.fetch_all(pool))?;

    Ok(comments)
}

pub async fn update_comment(
    pool: &PgPool,
    comment_id: i64,
    name: &str,
    detail: &str,
    images: &[String],
    actor_label: &str,
) -> Result<Option<Comment>, AppError> {
    let comment = crate::log_query_fetch_optional!(
        "comments.update_comment",
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE survey.comment
            SET
                name = $2,
                detail = $3,
                images = $4,
                updated_by = $5,
                updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(comment_id)
        .bind(name)
        .bind(detail)
        .bind(images)
        .bind(actor_label)
        .fetch_optional(pool)
    )?;

    Ok(comment)
}

pub async fn soft_delete_comment(
    pool: &PgPool,
    comment_id: i64,
    actor_label: &str,
) -> Result<bool, AppError> {
    let result = crate::log_query_execute!(
        "comments.soft_delete_comment",
        sqlx::query(
            r#"
            UPDATE survey.comment
            SET deleted_at = NOW(), deleted_by = $2, updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
            "#,
        )
        .bind(comment_id)
        .bind(actor_label)
        .execute(pool)
    )?;

    Ok(result.rows_affected() > 0)
}

/// Locks every comment of a survey, deleted ones included so the thread
/// stays connected through removed nodes.
pub async fn lock_thread_links(
    tx: &mut Transaction<'_, Postgres>,
    survey_id: Uuid,
) -> Result<Vec<CommentLink>, AppError> {
    let links = crate::log_query_fetch_all!(
        "comments.lock_thread_links",
        sqlx::query_as::<_, CommentLink>(
            r#"
            SELECT id, parent_id
            FROM survey.comment
            WHERE survey_id = $1
            FOR UPDATE
            "#,
        )
        .bind(survey_id)
        .fetch_all(&mut **tx)
    )?;

    Ok(links)
}

/// Sets or clears the resolution on the live comments among `comment_ids`,
/// confined to one survey.
pub async fn apply_resolution(
    tx: &mut Transaction<'_, Postgres>,
    survey_id: Uuid,
    comment_ids: &[i64],
    resolved: bool,
    actor_label: &str,
) -> Result<u64, AppError> {
    if comment_ids.is_empty() {
        return Ok(0);
    }

    let result = crate::log_query_execute!(
        "comments.apply_resolution",
        sqlx::query(
            r#"
            UPDATE survey.comment
            SET
                is_resolved = $2,
                resolved_by = CASE WHEN $2 THEN $3 ELSE NULL END,
                resolved_at = CASE WHEN $2 THEN NOW() ELSE NULL END,
                updated_by = $3,
                updated_at = NOW()
            WHERE id = ANY($1)
              AND survey_id = $4
              AND deleted_at IS NULL
            "#,
        )
        .bind(comment_ids)
        .bind(resolved)
        .bind(actor_label)
        .bind(survey_id)
        .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}
