use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use shamba_types::api::Claims;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Validate the bearer token and confirm its session has not been revoked.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("rejected token: {}", e);
        ApiError::Unauthorized
    })?;
    let claims = token_data.claims;

    let (sid, sub) = (claims.sid, claims.sub);
    let active = blocking(state, move |db| Ok(db.session_is_active(sid, sub)?)).await?;
    if !active {
        return Err(ApiError::Unauthorized);
    }
    Ok(claims)
}

/// Extract and validate the session from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
