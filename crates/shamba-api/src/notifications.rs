use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use shamba_types::api::{Claims, MarkedRead, NotificationList};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = blocking(&state, move |db| Ok(db.list_notifications(claims.sub)?)).await?;
    let unread = notifications.iter().filter(|n| !n.is_read).count() as u32;
    Ok(Json(NotificationList { notifications, unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let found = blocking(&state, move |db| Ok(db.mark_notification_read(id, claims.sub)?)).await?;
    if !found {
        return Err(ApiError::NotFound);
    }
    Ok(Json(MarkedRead { updated: 1 }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = blocking(&state, move |db| Ok(db.mark_all_notifications_read(claims.sub)?)).await?;
    Ok(Json(MarkedRead { updated }))
}
