pub mod auth;
pub mod chats;
pub mod error;
pub mod locations;
pub mod middleware;
pub mod notifications;
pub mod products;
pub mod profiles;
pub mod storage;
pub mod stores;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use shamba_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Assemble the full HTTP surface around `state`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/session", get(auth::session))
        .route("/products", get(products::list_products))
        .route("/products/featured", get(products::featured_products))
        .route("/products/{id}", get(products::get_product))
        .route("/stores", get(stores::list_stores))
        .route("/stores/{id}", get(stores::get_store))
        .route("/counties", get(locations::list_counties))
        .route("/counties/{id}/sub-counties", get(locations::list_sub_counties))
        .route("/sub-counties/{id}/wards", get(locations::list_wards))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/chats", get(chats::list_chats).post(chats::contact_seller))
        .route(
            "/chats/{id}/messages",
            get(chats::get_messages).post(chats::send_message),
        )
        .route("/my/store", get(stores::my_store))
        .route("/stores", post(stores::create_store))
        .route("/stores/{id}", axum::routing::patch(stores::update_store))
        .route("/products", post(products::create_product))
        .route("/products/{id}", axum::routing::patch(products::update_product))
        .route("/products/{id}/images", post(products::add_image))
        .route(
            "/storage/{bucket}",
            post(storage::upload).layer(DefaultBodyLimit::max(storage::MAX_UPLOAD_BYTES * 2)),
        )
        .route("/storage/{bucket}/{*key}", delete(storage::delete_object))
        .route("/profile", get(profiles::get_profile).patch(profiles::update_profile))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/files", ServeDir::new(state.storage.dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}
