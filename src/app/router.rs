use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::http::{comments as comments_http, health, surveys as surveys_http},
    app::state::AppState,
    auth::middleware::{auth_middleware, public_middleware},
    error::AppError,
    telemetry::request_logging_middleware,
};

fn cors_layer(allow_origin: &str) -> Result<CorsLayer, AppError> {
    let origin = allow_origin
        .parse::<HeaderValue>()
        .map_err(|err| AppError::Internal(format!("invalid CORS origin: {}", err)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]))
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config.cors_allow_origin)?;

    // Guests are allowed; a bearer token, when sent, must be valid.
    let public_routes = Router::new()
        .route("/surveys", get(surveys_http::list_surveys_handle))
        .route(
            "/surveys/summary/verification",
            get(surveys_http::verification_summary_handle),
        )
        .route("/surveys/{survey_id}", get(surveys_http::get_survey_handle))
        .route(
            "/comments",
            get(comments_http::list_comments_handle).post(comments_http::create_comment_handle),
        )
        .route(
            "/comments/{comment_id}",
            get(comments_http::get_comment_handle),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            public_middleware,
        ));

    let protected_routes = Router::new()
        .route("/surveys", post(surveys_http::create_survey_handle))
        .route("/surveys/action", post(surveys_http::action_survey_handle))
        .route(
            "/surveys/{survey_id}",
            put(surveys_http::update_survey_handle)
                .delete(surveys_http::delete_survey_handle),
        )
        .route(
            "/comments/action",
            post(comments_http::action_comment_handle),
        )
        .route(
            "/comments/{comment_id}",
            put(comments_http::update_comment_handle)
                .delete(comments_http::delete_comment_handle),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    Ok(Router::new()
        .route("/health", get(health::health_handle))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost: every response, errors included, carries request ids.
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state))
}
