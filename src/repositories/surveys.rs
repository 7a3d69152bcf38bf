use sqlx::{PgPool, Postgres, Transaction, postgres::PgArguments, query::QueryAs};
use uuid::Uuid;

use crate::{
    dto::surveys::{SurveyFilters, SurveyRequest},
    error::AppError,
    models::{
        roles::ApprovalStage,
        surveys::{StageStatus, Survey},
    },
    usecases::scope::ScopeBinds,
};

/// Survey joined with the owner's email and balai.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SurveyRow {
    #[sqlx(flatten)]
    pub survey: Survey,
    pub user_email: Option<String>,
    pub owner_balai_id: Option<i64>,
}

/// Locked row evaluated by the bulk stage decision.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActionCandidate {
    pub id: Uuid,
    pub is_submitted: bool,
    pub status_balai: StageStatus,
    pub status_eselon1: StageStatus,
    pub owner_balai_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct CountRow {
    total: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VerificationCounts {
    pub total: i64,
    pub verified_count: i64,
}

// $1 deny_all, $2 owner, $3 balai, $4 include_drafts
pub(crate) const SCOPE_PREDICATE: &str = r#"
    s.deleted_at IS NULL
    AND NOT $1::boolean
    AND ($2::uuid IS NULL OR s.user_id = $2)
    AND ($3::bigint IS NULL OR p.balai_id = $3)
    AND ($4::boolean OR s.is_submitted)
"#;

const FILTER_PREDICATE: &str = r#"
    AND ($5::text IS NULL OR s.address ILIKE '%' || $5 || '%')
    AND ($6::uuid IS NULL OR s.user_id = $6)
    AND (cardinality($7::text[]) = 0 OR s.survey_type = ANY($7))
    AND (cardinality($8::bigint[]) = 0 OR s.province_id = ANY($8))
    AND (cardinality($9::bigint[]) = 0 OR s.district_id = ANY($9))
    AND (cardinality($10::bigint[]) = 0 OR s.subdistrict_id = ANY($10))
    AND (cardinality($11::bigint[]) = 0 OR s.village_id = ANY($11))
    AND (cardinality($12::bigint[]) = 0 OR s.program_id = ANY($12))
    AND (cardinality($13::bigint[]) = 0 OR s.program_type_id = ANY($13))
    AND (cardinality($14::bigint[]) = 0 OR s.resource_id = ANY($14))
"#;

const SURVEY_FROM: &str = r#"
    FROM survey.survey s
    LEFT JOIN core.user u ON u.id = s.user_id
    LEFT JOIN core.profile p
        ON p.user_id = s.user_id
        AND p.deleted_at IS NULL
"#;

pub(crate) fn bind_scope<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    scope: ScopeBinds,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(scope.deny_all)
        .bind(scope.owner_id)
        .bind(scope.balai_id)
        .bind(scope.include_drafts)
}

fn bind_filters<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filters: &'q SurveyFilters,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filters.address.as_deref())
        .bind(filters.owner_id)
        .bind(filters.types.as_slice())
        .bind(filters.province_ids.as_slice())
        .bind(filters.district_ids.as_slice())
        .bind(filters.subdistrict_ids.as_slice())
        .bind(filters.village_ids.as_slice())
        .bind(filters.program_ids.as_slice())
        .bind(filters.program_type_ids.as_slice())
        .bind(filters.resource_ids.as_slice())
}

pub async fn insert_survey(
    pool: &PgPool,
    req: &SurveyRequest,
    actor_label: &str,
) -> Result<Survey, AppError> {
    let survey = crate::log_query_fetch_one!(
        "surveys.insert_survey",
        sqlx::query_as::<_, Survey>(
            r#"
            INSERT INTO survey.survey (
                user_id,
                address,
                coordinate,
                survey_type,
                status_balai,
                status_eselon1,
                is_submitted,
                images,
                province_id,
                district_id,
                subdistrict_id,
                village_id,
                program_id,
                program_type_id,
                resource_id,
                created_by,
                updated_by
            )
            VALUES (
                $1, $2, $3, $4, 'Pending', 'Pending', $5, $6,
                $7, $8, $9, $10, $11, $12, $13, $14, $14
            )
            RETURNING *
            "#,
        )
        .bind(req.user_id)
        .bind(req.address.trim())
        .bind(req.coordinate.trim())
        .bind(req.survey_type.trim())
        .bind(req.is_submitted)
        .bind(req.images.as_slice())
        .bind(req.province_id)
        .bind(req.district_id)
        .bind(req.subdistrict_id)
        .bind(req.village_id)
        .bind(req.program_id)
        .bind(req.program_type_id)
        .bind(req.resource_id)
        .bind(actor_label)
        .fetch_one(pool)
    )?;

    Ok(survey)
}

pub(crate) async fn find_survey(
    pool: &PgPool,
    survey_id: Uuid,
) -> Result<Option<SurveyRow>, AppError> {
    let sql = format!(
        r#"
        SELECT s.*, u.email AS user_email, p.balai_id AS owner_balai_id
        {SURVEY_FROM}
        WHERE s.id = $1
          AND s.deleted_at IS NULL
        LIMIT 1
        "#
    );

    let row = crate::log_query_fetch_optional!(
        "surveys.find_survey",
        sqlx::query_as::<_, SurveyRow>(&sql)
            .bind(survey_id)
            .fetch_optional(pool)
    )?;

    Ok(row)
}

/// Overwrites the owner-editable fields while the survey is still a draft or
/// waiting on Balai. `is_submitted` only ever moves from false to true.
pub async fn update_survey(
    pool: &PgPool,
    survey_id: Uuid,
    req: &SurveyRequest,
    actor_label: &str,
) -> Result<Option<Survey>, AppError> {
    let survey = crate::log_query_fetch_optional!(
        "surveys.update_survey",
        sqlx::query_as::<_, Survey>(
            r#"
            UPDATE survey.survey
            SET
                address = $2,
                coordinate = $3,
                survey_type = $4,
                is_submitted = is_submitted OR $5,
                images = $6,
                province_id = $7,
                district_id = $8,
                subdistrict_id = $9,
                village_id = $10,
                program_id = $11,
                program_type_id = $12,
                resource_id = $13,
                updated_by = $14,
                updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
              AND (is_submitted = FALSE OR status_balai = 'Pending')
            RETURNING *
            "#,
        )
        .bind(survey_id)
        .bind(req.address.trim())
        .bind(req.coordinate.trim())
        .bind(req.survey_type.trim())
        .bind(req.is_submitted)
        .bind(req.images.as_slice())
        .bind(req.province_id)
        .bind(req.district_id)
        .bind(req.subdistrict_id)
        .bind(req.village_id)
        .bind(req.program_id)
        .bind(req.program_type_id)
        .bind(req.resource_id)
        .bind(actor_label)
        .fetch_optional(pool)
    )?;

    Ok(survey)
}

/// Soft-deletes a draft. Returns false when nothing matched.
pub async fn soft_delete_survey(
    pool: &PgPool,
    survey_id: Uuid,
    actor_label: &str,
) -> Result<bool, AppError> {
    let result = crate::log_query_execute!(
        "surveys.soft_delete_survey",
        sqlx::query(
            r#"
            UPDATE survey.survey
            SET deleted_at = NOW(), deleted_by = $2, updated_at = NOW()
            WHERE id = $1
              AND deleted_at IS NULL
              AND is_submitted = FALSE
            "#,
        )
        .bind(survey_id)
        .bind(actor_label)
        .execute(pool)
    )?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_surveys(
    pool: &PgPool,
    scope: ScopeBinds,
    filters: &SurveyFilters,
    limit: i64,
    offset: i64,
) -> Result<Vec<SurveyRow>, AppError> {
    let sql = format!(
        r#"
        SELECT s.*, u.email AS user_email, p.balai_id AS owner_balai_id
        {SURVEY_FROM}
        WHERE {SCOPE_PREDICATE}
        {FILTER_PREDICATE}
        ORDER BY s.created_at DESC, s.id DESC
        LIMIT $15 OFFSET $16
        "#
    );

    let query = bind_filters(bind_scope(sqlx::query_as::<_, SurveyRow>(&sql), scope), filters)
        .bind(limit)
        .bind(offset);
    let rows = crate::log_query_fetch_all!("surveys.list_surveys", query.fetch_all(pool))?;

    Ok(rows)
}

pub async fn count_surveys(
    pool: &PgPool,
    scope: ScopeBinds,
    filters: &SurveyFilters,
) -> Result<i64, AppError> {
    let sql = format!(
        r#"
        SELECT COUNT(*) AS total
        {SURVEY_FROM}
        WHERE {SCOPE_PREDICATE}
        {FILTER_PREDICATE}
        "#
    );

    let query = bind_filters(bind_scope(sqlx::query_as::<_, CountRow>(&sql), scope), filters);
    let row = crate::log_query_fetch_one!("surveys.count_surveys", query.fetch_one(pool))?;

    Ok(row.total)
}

pub(crate) async fn verification_counts(
    pool: &PgPool,
    scope: ScopeBinds,
) -> Result<VerificationCounts, AppError> {
    let sql = format!(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (
                WHERE s.is_submitted AND s.status_eselon1 = 'Approved'
            ) AS verified_count
        {SURVEY_FROM}
        WHERE {SCOPE_PREDICATE}
        "#
    );

    let query = bind_scope(sqlx::query_as::<_, VerificationCounts>(&sql), scope);
    let counts =
        crate::log_query_fetch_one!("surveys.verification_counts", query.fetch_one(pool))?;

    Ok(counts)
}

/// Locks the live rows among `survey_ids` for the rest of the transaction.
pub(crate) async fn lock_action_candidates(
    tx: &mut Transaction<'_, Postgres>,
    survey_ids: &[Uuid],
) -> Result<Vec<ActionCandidate>, AppError> {
    let rows = crate::log_query_fetch_all!(
        "surveys.lock_action_candidates",
        sqlx::query_as::<_, ActionCandidate>(
            r#"
            SELECT
                s.id,
                s.is_submitted,
                s.status_balai,
                s.status_eselon1,
                p.balai_id AS owner_balai_id
            FROM survey.survey s
            LEFT JOIN core.profile p
                ON p.user_id = s.user_id
                AND p.deleted_at IS NULL
            WHERE s.id = ANY($1)
              AND s.deleted_at IS NULL
            FOR UPDATE OF s
            "#,
        )
        .bind(survey_ids)
        .fetch_all(&mut **tx)
    )?;

    Ok(rows)
}

/// Writes one stage decision to every id in a single statement. The WHERE
/// clause repeats the stage eligibility, so ineligible ids are never touched.
/// Notes are only overwritten when provided.
pub async fn apply_stage_decision(
    tx: &mut Transaction<'_, Postgres>,
    stage: ApprovalStage,
    survey_ids: &[Uuid],
    decision: StageStatus,
    notes: Option<&str>,
    actor_label: &str,
) -> Result<u64, AppError> {
    if survey_ids.is_empty() {
        return Ok(0);
    }

    let sql = match stage {
        ApprovalStage::Balai => {
            r#"
            UPDATE survey.survey
            SET
                status_balai = $2,
                notes = COALESCE($3, notes),
                updated_by = $4,
                updated_at = NOW()
            WHERE id = ANY($1)
              AND deleted_at IS NULL
              AND is_submitted
              AND status_balai = 'Pending'
            "#
        }
        ApprovalStage::Eselon1 => {
            r#"
            UPDATE survey.survey
            SET
                status_eselon1 = $2,
                notes = COALESCE($3, notes),
                updated_by = $4,
                updated_at = NOW()
            WHERE id = ANY($1)
              AND deleted_at IS NULL
              AND is_submitted
              AND status_balai = 'Approved'
              AND status_eselon1 = 'Pending'
            "#
        }
    };

    let result = crate::log_query_execute!(
        "surveys.apply_stage_decision",
        sqlx::query(sql)
            .bind(survey_ids)
            .bind(decision)
            .bind(notes)
            .bind(actor_label)
            .execute(&mut **tx)
    )?;

    Ok(result.rows_affected())
}
