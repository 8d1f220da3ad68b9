use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use shamba_db::{ChatRow, Database, NewNotification};
use shamba_types::api::{Claims, ContactSellerRequest, ContactSellerResponse, MessagesResponse, SendMessageRequest};
use shamba_types::models::NotificationType;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

const PREVIEW_CHARS: usize = 80;

/// Open (or reuse) the chat about a product and send the opening line.
pub async fn contact_seller(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ContactSellerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let buyer_id = claims.sub;

    let (chat_id, created) = blocking(&state, move |db| {
        let product = db
            .get_product(req.product_id)?
            .filter(|p| p.is_active)
            .ok_or(ApiError::NotFound)?;
        let store = db
            .get_store(product.store_id)?
            .filter(|s| s.is_active)
            .ok_or(ApiError::NotFound)?;
        if store.owner_id == buyer_id {
            return Err(ApiError::Validation("You cannot contact yourself about your own product".into()));
        }

        let opening = format!("Hi! I'm interested in your product: {}", product.title);
        let inquiry = NewNotification {
            id: Uuid::new_v4(),
            user_id: store.owner_id,
            kind: NotificationType::ProductInquiry,
            title: "New product inquiry".into(),
            message: Some(format!("Someone is interested in {}", product.title)),
            related_id: None,
        };
        Ok(db.open_chat(Uuid::new_v4(), buyer_id, store.owner_id, product.id, &opening, inquiry)?)
    })
    .await?;

    if created {
        info!("chat {} opened by {}", chat_id, buyer_id);
    }
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ContactSellerResponse { chat_id, created })))
}

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let chats = blocking(&state, move |db| Ok(db.list_chats(claims.sub)?)).await?;
    Ok(Json(chats))
}

/// Messages oldest first. Reading marks the counterpart's messages read.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let reader = claims.sub;
    let (messages, marked_read) = blocking(&state, move |db| {
        member_chat(db, chat_id, reader)?;
        Ok(db.read_messages(chat_id, reader)?)
    })
    .await?;
    Ok(Json(MessagesResponse { messages, marked_read }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty".into()));
    }
    let sender = claims.sub;

    let message = blocking(&state, move |db| {
        let chat = member_chat(db, chat_id, sender)?;
        let notification = NewNotification {
            id: Uuid::new_v4(),
            user_id: chat.counterpart_of(sender),
            kind: NotificationType::Message,
            title: "New message".into(),
            message: Some(preview(&content)),
            related_id: Some(chat.id),
        };
        Ok(db.send_message(Uuid::new_v4(), &chat, sender, &content, notification)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

fn member_chat(db: &Database, chat_id: Uuid, user_id: Uuid) -> Result<ChatRow, ApiError> {
    let chat = db.get_chat(chat_id)?.ok_or(ApiError::NotFound)?;
    if !chat.involves(user_id) {
        return Err(ApiError::Forbidden);
    }
    Ok(chat)
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}
