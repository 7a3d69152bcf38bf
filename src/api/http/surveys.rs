use axum::{Extension, extract::State};
use uuid::Uuid;

use crate::{
    api::http::extract::{ApiJson, ApiPath, ApiQuery},
    app::state::AppState,
    auth::actor::Actor,
    dto::{
        common::{ApiResponse, Paginated},
        surveys::{
            ActionSurveyRequest, ActionSurveyResult, SurveyListQuery, SurveyRequest,
            SurveyResponse, VerificationSummary,
        },
    },
    error::AppError,
    telemetry::RequestContext,
    usecases::surveys::SurveyService,
};

pub async fn list_surveys_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<SurveyListQuery>,
) -> Result<ApiResponse<Paginated<SurveyResponse>>, AppError> {
    let page = SurveyService::list(&state, &actor, query).await?;
    Ok(ApiResponse::ok("Surveys retrieved", page))
}

pub async fn verification_summary_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<ApiResponse<VerificationSummary>, AppError> {
    let summary = SurveyService::verification_summary(&state, &actor).await?;
    Ok(ApiResponse::ok("Verification summary retrieved", summary))
}

pub async fn get_survey_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(survey_id): ApiPath<Uuid>,
) -> Result<ApiResponse<SurveyResponse>, AppError> {
    let survey = SurveyService::get(&state, &actor, survey_id).await?;
    Ok(ApiResponse::ok("Survey retrieved", survey))
}

pub async fn create_survey_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<SurveyRequest>,
) -> Result<ApiResponse<SurveyResponse>, AppError> {
    let survey = SurveyService::create(&state, &ctx, &actor, req).await?;
    Ok(ApiResponse::created("Survey created", survey))
}

pub async fn update_survey_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiPath(survey_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<SurveyRequest>,
) -> Result<ApiResponse<SurveyResponse>, AppError> {
    let survey = SurveyService::update(&state, &ctx, &actor, survey_id, req).await?;
    Ok(ApiResponse::ok("Survey updated", survey))
}

pub async fn delete_survey_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiPath(survey_id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, AppError> {
    SurveyService::delete(&state, &ctx, &actor, survey_id).await?;
    Ok(ApiResponse::ok("Survey deleted", ()))
}

pub async fn action_survey_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<ActionSurveyRequest>,
) -> Result<ApiResponse<ActionSurveyResult>, AppError> {
    let action = req.action.clone();
    let result = SurveyService::action(&state, &ctx, &actor, req).await?;
    Ok(ApiResponse::ok(result.message(&action), result))
}
