use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

/// Validates the bearer token and attaches the caller as an `Extension<User>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Missing or malformed authorization header".to_string()))?;

    let user = validate_token(bearer.token(), &state.config.jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if user.has_any_role(allowed) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}
