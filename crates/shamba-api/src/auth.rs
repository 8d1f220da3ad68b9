use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::{HeaderMap, StatusCode}, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use shamba_db::Database;
use shamba_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, SessionResponse};

use crate::blocking;
use crate::error::ApiError;
use crate::middleware::authenticate;
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub storage: Storage,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let email = req.email.trim().to_string();

    let (user_id, session_id, profile) = blocking(&state, move |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("An account with this email already exists".into()));
        }

        // Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| {
                error!("password hashing failed: {}", e);
                ApiError::Internal
            })?
            .to_string();

        let user_id = Uuid::new_v4();
        let phone = req.phone_number.as_deref().map(str::trim).filter(|p| !p.is_empty());
        db.create_account(user_id, &email, &password_hash, &req.full_name, phone, req.user_type)?;

        let session_id = Uuid::new_v4();
        db.create_session(session_id, user_id)?;
        let profile = db.get_profile(user_id)?.ok_or(ApiError::Internal)?;
        Ok((user_id, session_id, profile))
    })
    .await?;

    info!("registered {} as {}", profile.email, profile.user_type.as_str());
    let token = create_token(&state, user_id, session_id, &profile.email)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, profile })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();

    let (user_id, session_id, profile) = blocking(&state, move |db| {
        let user = db.get_user_by_email(&email)?.ok_or(ApiError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
            error!("stored hash for {} is unreadable: {}", user.email, e);
            ApiError::Internal
        })?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        let user_id: Uuid = user.id.parse().map_err(|e| {
            error!("corrupt user id '{}': {}", user.id, e);
            ApiError::Internal
        })?;
        let session_id = Uuid::new_v4();
        db.create_session(session_id, user_id)?;
        let profile = db.get_profile(user_id)?.ok_or(ApiError::Internal)?;
        Ok((user_id, session_id, profile))
    })
    .await?;

    let token = create_token(&state, user_id, session_id, &profile.email)?;
    Ok(Json(AuthResponse { token, profile }))
}

/// Revoke the caller's session. The token stops working immediately.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = claims.sid;
    blocking(&state, move |db| Ok(db.revoke_session(sid)?)).await?;
    info!("session {} revoked", sid);
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user, or `null`. Never an error for a bad token.
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = match authenticate(&state, &headers).await {
        Ok(claims) => claims,
        Err(ApiError::Unauthorized) => return Ok(Json(SessionResponse { user: None })),
        Err(e) => return Err(e),
    };
    let user = blocking(&state, move |db| Ok(db.get_profile(claims.sub)?)).await?;
    Ok(Json(SessionResponse { user }))
}

fn create_token(state: &AppStateInner, user_id: Uuid, session_id: Uuid, email: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(state.token_ttl_days)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("token encoding failed: {}", e);
        ApiError::Internal
    })
}
