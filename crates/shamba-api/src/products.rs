use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use shamba_db::Database;
use shamba_types::api::{AddImageRequest, Claims, CreateProductRequest, ProductQuery, UpdateProductRequest};
use shamba_types::models::{FEATURED_LIMIT, Product};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = blocking(&state, move |db| Ok(db.list_products(&query)?)).await?;
    Ok(Json(page))
}

pub async fn featured_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = blocking(&state, |db| Ok(db.featured_products(FEATURED_LIMIT)?)).await?;
    Ok(Json(items))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = blocking(&state, move |db| Ok(db.product_detail(id)?))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(detail))
}

/// Create a product in one of the caller's active stores.
///
/// Without a store the caller gets `store_required` and the client sends
/// them to store creation. The optional image is attached afterwards; if
/// that fails the product still stands.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let owner = claims.sub;

    let product = blocking(&state, move |db| {
        let stores = db.active_stores_for_owner(owner)?;
        let store = match req.store_id {
            Some(id) => stores.into_iter().find(|s| s.id == id).ok_or(ApiError::Forbidden)?,
            None => stores.into_iter().next().ok_or(ApiError::StoreRequired)?,
        };

        let check = db.check_location(req.county_id, req.sub_county_id, req.ward_id)?;
        if !check.is_valid() {
            return Err(ApiError::Validation(check.message().into()));
        }

        let product = db.insert_product(Uuid::new_v4(), store.id, &req)?;
        info!("product {} listed in store {}", product.id, store.id);

        if let Some(url) = req.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
            if let Err(e) = db.add_product_image(Uuid::new_v4(), product.id, url, true) {
                warn!("product {} created without its image: {:#}", product.id, e);
            }
        }
        Ok(product)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let product = blocking(&state, move |db| {
        let mut merged = owned_product(db, id, claims.sub)?;
        req.apply(&mut merged);
        let check = db.check_location(merged.county_id, merged.sub_county_id, merged.ward_id)?;
        if !check.is_valid() {
            return Err(ApiError::Validation(check.message().into()));
        }

        db.update_product(id, &req)?.ok_or(ApiError::NotFound)
    })
    .await?;

    Ok(Json(product))
}

pub async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.image_url.trim().is_empty() {
        return Err(ApiError::Validation("Image URL is required".into()));
    }

    let image = blocking(&state, move |db| {
        owned_product(db, id, claims.sub)?;
        Ok(db.add_product_image(Uuid::new_v4(), id, req.image_url.trim(), req.is_primary)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(image)))
}

/// The product, provided `user_id` owns its store.
fn owned_product(db: &Database, id: Uuid, user_id: Uuid) -> Result<Product, ApiError> {
    let product = db.get_product(id)?.ok_or(ApiError::NotFound)?;
    let store = db.get_store(product.store_id)?.ok_or(ApiError::NotFound)?;
    if store.owner_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(product)
}
