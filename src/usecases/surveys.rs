use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    app::state::AppState,
    auth::actor::Actor,
    dto::{
        common::Paginated,
        surveys::{
            ActionSurveyRequest, ActionSurveyResult, FailedSurvey, SurveyListQuery,
            SurveyRequest, SurveyResponse, VerificationSummary,
        },
    },
    error::{AppError, AppResult},
    models::{
        roles::{ApprovalStage, Role},
        surveys::{StageStatus, Survey, stages_consistent},
    },
    repositories::{
        profiles as profile_repo,
        surveys::{self as survey_repo, ActionCandidate, SurveyRow},
    },
    telemetry::{BusinessEvent, RequestContext},
    usecases::scope::{SurveyScope, resolve_scope},
};

pub struct SurveyService;

impl SurveyService {
    pub async fn create(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        req: SurveyRequest,
    ) -> AppResult<SurveyResponse> {
        let outcome = Self::create_survey(state, actor, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "CREATE_SURVEY", &outcome);
        outcome
    }

    async fn create_survey(
        state: &AppState,
        actor: &Actor,
        req: SurveyRequest,
    ) -> AppResult<SurveyResponse> {
        let actor_id = actor.require_user_id()?;
        validate_survey_request(&req)?;
        ensure_can_create(actor.role, actor_id, req.user_id)?;

        let survey = survey_repo::insert_survey(&state.db, &req, &actor.label()).await?;

        BusinessEvent::SurveyCreated {
            survey_id: survey.id,
            owner_id: survey.user_id,
            is_submitted: survey.is_submitted,
        }
        .log();

        Ok(SurveyResponse::from_survey(
            survey,
            Some(actor.email.clone()).filter(|email| !email.is_empty()),
        ))
    }

    pub async fn update(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        survey_id: Uuid,
        req: SurveyRequest,
    ) -> AppResult<SurveyResponse> {
        let outcome = Self::update_survey(state, actor, survey_id, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "UPDATE_SURVEY", &outcome);
        outcome
    }

    async fn update_survey(
        state: &AppState,
        actor: &Actor,
        survey_id: Uuid,
        req: SurveyRequest,
    ) -> AppResult<SurveyResponse> {
        let actor_id = actor.require_user_id()?;
        validate_survey_request(&req)?;

        let stored = survey_repo::find_survey(&state.db, survey_id)
            .await?
            .ok_or(AppError::NotFound("Survey not found".to_string()))?;
        ensure_owner_may_edit(&stored.survey, actor_id, req.user_id)?;

        let was_submitted = stored.survey.is_submitted;
        let survey = survey_repo::update_survey(&state.db, survey_id, &req, &actor.label())
            .await?
            .ok_or(AppError::Forbidden(
                "Survey can no longer be edited".to_string(),
            ))?;

        BusinessEvent::SurveyUpdated {
            survey_id,
            actor_id,
            submitted_now: !was_submitted && survey.is_submitted,
        }
        .log();

        Ok(SurveyResponse::from_survey(survey, stored.user_email))
    }

    pub async fn delete(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        survey_id: Uuid,
    ) -> AppResult<()> {
        let outcome = Self::delete_survey(state, actor, survey_id).await;
        state
            .audit
            .record_outcome(actor, ctx, "DELETE_SURVEY", &outcome);
        outcome
    }

    async fn delete_survey(state: &AppState, actor: &Actor, survey_id: Uuid) -> AppResult<()> {
        let actor_id = actor.require_user_id()?;

        let stored = survey_repo::find_survey(&state.db, survey_id)
            .await?
            .ok_or(AppError::NotFound("Survey not found".to_string()))?;
        ensure_owner_may_delete(&stored.survey, actor_id)?;

        let deleted = survey_repo::soft_delete_survey(&state.db, survey_id, &actor.label()).await?;
        if !deleted {
            return Err(AppError::Forbidden(
                "Submitted surveys cannot be deleted".to_string(),
            ));
        }

        BusinessEvent::SurveyDeleted {
            survey_id,
            actor_id,
        }
        .log();

        Ok(())
    }

    /// Role-scoped detail. Surveys outside the caller's scope read as missing.
    pub async fn get(state: &AppState, actor: &Actor, survey_id: Uuid) -> AppResult<SurveyResponse> {
        let row = survey_repo::find_survey(&state.db, survey_id)
            .await?
            .ok_or(AppError::NotFound("Survey not found".to_string()))?;

        let scope = resolve_scope(&state.db, actor).await;
        if !scope.permits(
            row.survey.user_id,
            row.owner_balai_id,
            row.survey.is_submitted,
        ) {
            return Err(AppError::NotFound("Survey not found".to_string()));
        }

        Ok(to_response(row))
    }

    pub async fn list(
        state: &AppState,
        actor: &Actor,
        query: SurveyListQuery,
    ) -> AppResult<Paginated<SurveyResponse>> {
        let window = query.page_request();
        let filters = query.filters(actor.role.can_filter_by_owner())?;
        let scope = resolve_scope(&state.db, actor).await;
        if scope == SurveyScope::Nothing {
            return Ok(Paginated::new(Vec::new(), 0, window));
        }

        let binds = scope.binds();
        let total = survey_repo::count_surveys(&state.db, binds, &filters).await?;
        let rows =
            survey_repo::list_surveys(&state.db, binds, &filters, window.limit, window.offset())
                .await?;

        let data = rows.into_iter().map(to_response).collect();
        Ok(Paginated::new(data, total, window))
    }

    pub async fn verification_summary(
        state: &AppState,
        actor: &Actor,
    ) -> AppResult<VerificationSummary> {
        let scope = resolve_scope(&state.db, actor).await;
        if scope == SurveyScope::Nothing {
            return Ok(summarize(0, 0));
        }

        let counts = survey_repo::verification_counts(&state.db, scope.binds()).await?;
        Ok(summarize(counts.total, counts.verified_count))
    }

    /// Applies one stage decision to a batch. Ineligible ids are reported,
    /// not raised.
    pub async fn action(
        state: &AppState,
        ctx: &RequestContext,
        actor: &Actor,
        req: ActionSurveyRequest,
    ) -> AppResult<ActionSurveyResult> {
        let outcome = Self::action_surveys(state, actor, req).await;
        state
            .audit
            .record_outcome(actor, ctx, "ACTION_SURVEY", &outcome);
        outcome
    }

    async fn action_surveys(
        state: &AppState,
        actor: &Actor,
        req: ActionSurveyRequest,
    ) -> AppResult<ActionSurveyResult> {
        let action = parse_action_request(req)?;
        let actor_id = actor.require_user_id()?;
        let stage = actor.role.verifier_stage().ok_or(AppError::Forbidden(
            "Only verificators may approve or reject surveys".to_string(),
        ))?;

        let work = async {
            let verifier_balai = match stage {
                ApprovalStage::Balai => Some(
                    profile_repo::find_balai_id(&state.db, actor_id)
                        .await?
                        .ok_or(AppError::Forbidden(
                            "User is not assigned to any balai".to_string(),
                        ))?,
                ),
                ApprovalStage::Eselon1 => None,
            };

            let mut tx = state.db.begin().await?;
            let candidates = survey_repo::lock_action_candidates(&mut tx, &action.survey_ids).await?;
            let (eligible, failed_details) =
                partition_candidates(stage, verifier_balai, &action.survey_ids, &candidates);
            let applied = survey_repo::apply_stage_decision(
                &mut tx,
                stage,
                &eligible,
                action.decision,
                action.notes.as_deref(),
                &actor.label(),
            )
            .await?;
            // Dropping the transaction on mismatch rolls the batch back.
            ensure_batch_applied(eligible.len(), applied)?;
            tx.commit().await?;

            Ok::<_, AppError>(ActionSurveyResult {
                success_count: eligible.len(),
                failed_count: failed_details.len(),
                failed_details,
            })
        };

        let result = tokio::time::timeout(state.config.request_timeout, work)
            .await
            .map_err(|_| AppError::Timeout("Survey action did not complete in time".to_string()))??;

        BusinessEvent::SurveysActioned {
            actor_id,
            stage,
            decision: action.decision,
            success_count: result.success_count,
            failed_count: result.failed_count,
        }
        .log();

        Ok(result)
    }
}

fn to_response(row: SurveyRow) -> SurveyResponse {
    let survey = row.survey;
    if survey.is_submitted && !stages_consistent(survey.status_balai, survey.status_eselon1) {
        tracing::warn!(
            survey_id = %survey.id,
            status_balai = ?survey.status_balai,
            status_eselon1 = ?survey.status_eselon1,
            "Survey stage statuses violate approval order"
        );
    }
    SurveyResponse::from_survey(survey, row.user_email)
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

fn require_id(value: i64, field: &str) -> AppResult<()> {
    if value <= 0 {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_survey_request(req: &SurveyRequest) -> AppResult<()> {
    if req.user_id.is_nil() {
        return Err(AppError::ValidationError("user_id is required".to_string()));
    }
    require_text(&req.address, "address")?;
    require_text(&req.coordinate, "coordinate")?;
    require_text(&req.survey_type, "type")?;
    require_id(req.province_id, "province_id")?;
    require_id(req.district_id, "district_id")?;
    require_id(req.subdistrict_id, "subdistrict_id")?;
    require_id(req.village_id, "village_id")?;
    Ok(())
}

pub fn ensure_can_create(role: Role, actor_id: Uuid, owner_id: Uuid) -> AppResult<()> {
    if role != Role::Surveyor {
        return Err(AppError::Forbidden(
            "Only surveyors may create surveys".to_string(),
        ));
    }
    if owner_id != actor_id {
        return Err(AppError::BadRequest(
            "Surveys can only be created for yourself".to_string(),
        ));
    }
    Ok(())
}

pub fn ensure_owner_may_edit(survey: &Survey, actor_id: Uuid, owner_id: Uuid) -> AppResult<()> {
    if survey.user_id != actor_id || owner_id != actor_id {
        return Err(AppError::BadRequest(
            "You can only edit your own survey".to_string(),
        ));
    }
    let status = survey.status();
    if !status.is_owner_editable() {
        return Err(AppError::Forbidden(format!(
            "Survey cannot be edited in status {}",
            status.label()
        )));
    }
    Ok(())
}

pub fn ensure_owner_may_delete(survey: &Survey, actor_id: Uuid) -> AppResult<()> {
    if survey.user_id != actor_id {
        return Err(AppError::BadRequest(
            "You can only delete your own survey".to_string(),
        ));
    }
    if survey.is_submitted {
        return Err(AppError::Forbidden(
            "Submitted surveys cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

/// Validated bulk decision with distinct ids in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageAction {
    pub survey_ids: Vec<Uuid>,
    pub decision: StageStatus,
    pub notes: Option<String>,
}

pub fn parse_action_request(req: ActionSurveyRequest) -> AppResult<StageAction> {
    if req.survey_ids.is_empty() {
        return Err(AppError::ValidationError(
            "survey_ids must not be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut survey_ids = Vec::with_capacity(req.survey_ids.len());
    for raw in &req.survey_ids {
        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::ValidationError(format!("Invalid survey id: {raw}")))?;
        if seen.insert(id) {
            survey_ids.push(id);
        }
    }

    let decision = match req.action.trim() {
        "Approved" => StageStatus::Approved,
        "Rejected" => StageStatus::Rejected,
        other => {
            return Err(AppError::ValidationError(format!(
                "Invalid action '{other}', expected Approved or Rejected"
            )));
        }
    };

    let notes = req
        .notes
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());
    // Only a rejection stores notes; approvals keep what is already there.
    let notes = match decision {
        StageStatus::Rejected if notes.is_none() => {
            return Err(AppError::ValidationError(
                "notes are required when rejecting".to_string(),
            ));
        }
        StageStatus::Rejected => notes,
        _ => None,
    };

    Ok(StageAction {
        survey_ids,
        decision,
        notes,
    })
}

/// The locked eligible rows and the rows the UPDATE touched must agree.
pub(crate) fn ensure_batch_applied(eligible: usize, applied: u64) -> AppResult<()> {
    if u64::try_from(eligible).ok() == Some(applied) {
        Ok(())
    } else {
        tracing::error!(eligible, applied, "Stage decision touched an unexpected row count");
        Err(AppError::Internal(format!(
            "stage decision applied to {applied} rows, expected {eligible}"
        )))
    }
}

/// Why a locked candidate cannot take a decision at `stage`.
pub(crate) fn ineligibility(
    stage: ApprovalStage,
    verifier_balai: Option<i64>,
    candidate: &ActionCandidate,
) -> Option<&'static str> {
    if !candidate.is_submitted {
        return Some("survey has not been submitted");
    }
    match stage {
        ApprovalStage::Balai => {
            if candidate.status_balai != StageStatus::Pending {
                Some("balai status is not pending")
            } else if verifier_balai.is_none() || candidate.owner_balai_id != verifier_balai {
                Some("survey does not belong to your balai")
            } else {
                None
            }
        }
        ApprovalStage::Eselon1 => {
            if candidate.status_balai != StageStatus::Approved
                || candidate.status_eselon1 != StageStatus::Pending
            {
                Some("survey is not approved by balai or already verified")
            } else {
                None
            }
        }
    }
}

/// Splits the requested ids into eligible ids and failure entries. Every
/// requested id lands in exactly one of the two.
pub(crate) fn partition_candidates(
    stage: ApprovalStage,
    verifier_balai: Option<i64>,
    requested: &[Uuid],
    candidates: &[ActionCandidate],
) -> (Vec<Uuid>, Vec<FailedSurvey>) {
    let by_id: HashMap<Uuid, &ActionCandidate> = candidates
        .iter()
        .map(|candidate| (candidate.id, candidate))
        .collect();

    let mut eligible = Vec::new();
    let mut failed = Vec::new();
    for id in requested {
        let reason = match by_id.get(id) {
            None => Some("survey not found"),
            Some(candidate) => ineligibility(stage, verifier_balai, candidate),
        };
        match reason {
            None => eligible.push(*id),
            Some(reason) => failed.push(FailedSurvey {
                survey_id: *id,
                reason: reason.to_string(),
            }),
        }
    }
    (eligible, failed)
}

pub fn summarize(total: i64, verified_count: i64) -> VerificationSummary {
    let percent = if total > 0 {
        ((verified_count as f64 / total as f64) * 1000.0).round() / 10.0
    } else {
        0.0
    };
    VerificationSummary {
        total,
        verified_count,
        percent,
    }
}
