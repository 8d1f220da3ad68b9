use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_counties(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let counties = blocking(&state, |db| Ok(db.list_counties()?)).await?;
    Ok(Json(counties))
}

pub async fn list_sub_counties(
    State(state): State<AppState>,
    Path(county_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let sub_counties = blocking(&state, move |db| Ok(db.list_sub_counties(county_id)?)).await?;
    Ok(Json(sub_counties))
}

pub async fn list_wards(
    State(state): State<AppState>,
    Path(sub_county_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let wards = blocking(&state, move |db| Ok(db.list_wards(sub_county_id)?)).await?;
    Ok(Json(wards))
}
