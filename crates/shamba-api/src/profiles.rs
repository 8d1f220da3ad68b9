use axum::{Extension, Json, extract::State, response::IntoResponse};

use shamba_types::api::{Claims, UpdateProfileRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = blocking(&state, move |db| Ok(db.get_profile(claims.sub)?))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let profile = blocking(&state, move |db| {
        let mut merged = db.get_profile(claims.sub)?.ok_or(ApiError::NotFound)?;
        req.apply(&mut merged);
        let check = db.check_location(merged.county_id, merged.sub_county_id, merged.ward_id)?;
        if !check.is_valid() {
            return Err(ApiError::Validation(check.message().into()));
        }
        db.update_profile(claims.sub, &req)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(profile))
}
