use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    app::state::AppState, auth::actor::Actor, error::AppError, telemetry::RequestContext,
};

/// Requires a valid bearer token and stores the resulting [`Actor`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthorized(
        "Missing authorization token".to_string(),
    ))?;

    let actor = decode_actor(&state, token)?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Accepts anonymous callers as the guest identity. A token that is present
/// but invalid is still rejected.
pub async fn public_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = match bearer_token(&req) {
        Some(token) => decode_actor(&state, token)?,
        None => {
            let client_ip = req
                .extensions()
                .get::<RequestContext>()
                .and_then(|ctx| ctx.client_ip.clone());
            Actor::guest(client_ip.as_deref())
        }
    };
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn decode_actor(state: &AppState, token: &str) -> Result<Actor, AppError> {
    let claims = state
        .jwt
        .verify_token(token)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    Actor::from_claims(claims, &state.config.roles)
}
