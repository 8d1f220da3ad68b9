use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use shamba_types::api::{Claims, CreateStoreRequest, MyStoreResponse, StoreQuery, UpdateStoreRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_stores(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = blocking(&state, move |db| Ok(db.list_stores(&query)?)).await?;
    Ok(Json(page))
}

pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = blocking(&state, move |db| Ok(db.store_detail(id)?))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(detail))
}

/// The caller's most recent active store with every product, listed or not.
pub async fn my_store(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(&state, move |db| {
        let store = db
            .active_stores_for_owner(claims.sub)?
            .into_iter()
            .next()
            .ok_or(ApiError::NotFound)?;
        let products = db.store_products(store.id, true)?;
        Ok(MyStoreResponse { store, products })
    })
    .await?;
    Ok(Json(response))
}

pub async fn create_store(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let store = blocking(&state, move |db| {
        let check = db.check_location(req.county_id, req.sub_county_id, req.ward_id)?;
        if !check.is_valid() {
            return Err(ApiError::Validation(check.message().into()));
        }
        Ok(db.insert_store(Uuid::new_v4(), claims.sub, &req)?)
    })
    .await?;

    info!("store {} '{}' opened by {}", store.id, store.name, store.owner_id);
    Ok((StatusCode::CREATED, Json(store)))
}

pub async fn update_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStoreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let store = blocking(&state, move |db| {
        let current = db.get_store(id)?.ok_or(ApiError::NotFound)?;
        if current.owner_id != claims.sub {
            return Err(ApiError::Forbidden);
        }

        let mut merged = current;
        req.apply(&mut merged);
        let check = db.check_location(merged.county_id, merged.sub_county_id, merged.ward_id)?;
        if !check.is_valid() {
            return Err(ApiError::Validation(check.message().into()));
        }

        db.update_store(id, &req)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(store))
}
