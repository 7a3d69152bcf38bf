use axum::{Extension, extract::State};

use crate::{
    api::http::extract::{ApiJson, ApiPath, ApiQuery},
    app::state::AppState,
    auth::actor::Actor,
    dto::{
        comments::{
            ActionCommentRequest, ActionCommentResult, CommentListQuery, CommentResponse,
            CreateCommentRequest, UpdateCommentRequest,
        },
        common::{ApiResponse, Paginated},
    },
    error::AppError,
    telemetry::RequestContext,
    usecases::comments::CommentService,
};

pub async fn list_comments_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<CommentListQuery>,
) -> Result<ApiResponse<Paginated<CommentResponse>>, AppError> {
    let page = CommentService::list(&state, &actor, query).await?;
    Ok(ApiResponse::ok("Comments retrieved", page))
}

pub async fn get_comment_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(comment_id): ApiPath<i64>,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let comment = CommentService::get(&state, &actor, comment_id).await?;
    Ok(ApiResponse::ok("Comment retrieved", comment))
}

pub async fn create_comment_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let comment = CommentService::create_public(&state, &ctx, &actor, req).await?;
    Ok(ApiResponse::created("Comment created", comment))
}

pub async fn update_comment_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiPath(comment_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> Result<ApiResponse<CommentResponse>, AppError> {
    let comment = CommentService::update(&state, &ctx, &actor, comment_id, req).await?;
    Ok(ApiResponse::ok("Comment updated", comment))
}

pub async fn delete_comment_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiPath(comment_id): ApiPath<i64>,
) -> Result<ApiResponse<()>, AppError> {
    CommentService::delete(&state, &ctx, &actor, comment_id).await?;
    Ok(ApiResponse::ok("Comment deleted", ()))
}

pub async fn action_comment_handle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<ActionCommentRequest>,
) -> Result<ApiResponse<ActionCommentResult>, AppError> {
    let action = req.action.trim().to_string();
    let result = CommentService::action(&state, &ctx, &actor, req).await?;
    Ok(ApiResponse::ok(
        format!("Comment thread marked {action}"),
        result,
    ))
}
