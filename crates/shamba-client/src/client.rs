use std::sync::{Arc, RwLock};

use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use shamba_types::api::{
    AddImageRequest, AuthResponse, ContactSellerRequest, ContactSellerResponse, CreateProductRequest,
    CreateStoreRequest, ErrorBody, LoginRequest, MarkedRead, MessagesResponse, MyStoreResponse,
    NotificationList, ProductQuery, RegisterRequest, SendMessageRequest, SessionResponse, StoreQuery,
    UpdateProductRequest, UpdateProfileRequest, UpdateStoreRequest, UploadResponse,
};
use shamba_types::models::{
    ChatSummary, County, Message, Page, Product, ProductCard, ProductDetail, ProductImage, Profile, Store,
    StoreDetail, StoreSummary, SubCounty, Ward,
};

use crate::error::{ClientError, Result};

/// Typed HTTP client for the marketplace API.
///
/// Clones share the bearer token, so the session context and every screen
/// see the same sign-in state.
#[derive(Clone)]
pub struct MarketClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl MarketClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.token().is_none() {
            return Err(ClientError::NotSignedIn);
        }
        Ok(self.request(method, path))
    }

    async fn json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
        let resp = checked(req.send().await?).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn empty(req: RequestBuilder) -> Result<()> {
        checked(req.send().await?).await?;
        Ok(())
    }

    // -- Auth --

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        req.validate()?;
        Self::json(self.request(Method::POST, "/auth/register").json(req)).await
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        Self::json(self.request(Method::POST, "/auth/login").json(req)).await
    }

    pub async fn logout(&self) -> Result<()> {
        Self::empty(self.authed(Method::POST, "/auth/logout")?).await
    }

    pub async fn session(&self) -> Result<SessionResponse> {
        Self::json(self.request(Method::GET, "/auth/session")).await
    }

    // -- Products --

    pub async fn products(&self, query: &ProductQuery) -> Result<Page<ProductCard>> {
        Self::json(self.request(Method::GET, "/products").query(query)).await
    }

    pub async fn featured_products(&self) -> Result<Vec<ProductCard>> {
        Self::json(self.request(Method::GET, "/products/featured")).await
    }

    pub async fn product(&self, id: Uuid) -> Result<ProductDetail> {
        Self::json(self.request(Method::GET, &format!("/products/{}", id))).await
    }

    pub async fn create_product(&self, req: &CreateProductRequest) -> Result<Product> {
        Self::json(self.authed(Method::POST, "/products")?.json(req)).await
    }

    pub async fn update_product(&self, id: Uuid, req: &UpdateProductRequest) -> Result<Product> {
        Self::json(self.authed(Method::PATCH, &format!("/products/{}", id))?.json(req)).await
    }

    pub async fn add_product_image(&self, id: Uuid, req: &AddImageRequest) -> Result<ProductImage> {
        Self::json(self.authed(Method::POST, &format!("/products/{}/images", id))?.json(req)).await
    }

    // -- Stores --

    pub async fn stores(&self, query: &StoreQuery) -> Result<Page<StoreSummary>> {
        Self::json(self.request(Method::GET, "/stores").query(query)).await
    }

    pub async fn store(&self, id: Uuid) -> Result<StoreDetail> {
        Self::json(self.request(Method::GET, &format!("/stores/{}", id))).await
    }

    pub async fn my_store(&self) -> Result<MyStoreResponse> {
        Self::json(self.authed(Method::GET, "/my/store")?).await
    }

    pub async fn create_store(&self, req: &CreateStoreRequest) -> Result<Store> {
        Self::json(self.authed(Method::POST, "/stores")?.json(req)).await
    }

    pub async fn update_store(&self, id: Uuid, req: &UpdateStoreRequest) -> Result<Store> {
        Self::json(self.authed(Method::PATCH, &format!("/stores/{}", id))?.json(req)).await
    }

    // -- Chat --

    pub async fn contact_seller(&self, product_id: Uuid) -> Result<ContactSellerResponse> {
        let body = ContactSellerRequest { product_id };
        Self::json(self.authed(Method::POST, "/chats")?.json(&body)).await
    }

    pub async fn chats(&self) -> Result<Vec<ChatSummary>> {
        Self::json(self.authed(Method::GET, "/chats")?).await
    }

    pub async fn messages(&self, chat_id: Uuid) -> Result<MessagesResponse> {
        Self::json(self.authed(Method::GET, &format!("/chats/{}/messages", chat_id))?).await
    }

    pub async fn send_message(&self, chat_id: Uuid, content: &str) -> Result<Message> {
        let body = SendMessageRequest { content: content.to_string() };
        Self::json(self.authed(Method::POST, &format!("/chats/{}/messages", chat_id))?.json(&body)).await
    }

    // -- Storage --

    pub async fn upload(&self, bucket: &str, content_type: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let req = self
            .authed(Method::POST, &format!("/storage/{}", bucket))?
            .header(header::CONTENT_TYPE, content_type)
            .body(data);
        Self::json(req).await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        Self::empty(self.authed(Method::DELETE, &format!("/storage/{}/{}", bucket, key))?).await
    }

    // -- Profile --

    pub async fn profile(&self) -> Result<Profile> {
        Self::json(self.authed(Method::GET, "/profile")?).await
    }

    pub async fn update_profile(&self, req: &UpdateProfileRequest) -> Result<Profile> {
        Self::json(self.authed(Method::PATCH, "/profile")?.json(req)).await
    }

    // -- Notifications --

    pub async fn notifications(&self) -> Result<NotificationList> {
        Self::json(self.authed(Method::GET, "/notifications")?).await
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<MarkedRead> {
        Self::json(self.authed(Method::POST, &format!("/notifications/{}/read", id))?).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<MarkedRead> {
        Self::json(self.authed(Method::POST, "/notifications/read-all")?).await
    }

    // -- Locations --

    pub async fn counties(&self) -> Result<Vec<County>> {
        Self::json(self.request(Method::GET, "/counties")).await
    }

    pub async fn sub_counties(&self, county_id: i64) -> Result<Vec<SubCounty>> {
        Self::json(self.request(Method::GET, &format!("/counties/{}/sub-counties", county_id))).await
    }

    pub async fn wards(&self, sub_county_id: i64) -> Result<Vec<Ward>> {
        Self::json(self.request(Method::GET, &format!("/sub-counties/{}/wards", sub_county_id))).await
    }
}

/// Pass 2xx through; turn anything else into `ClientError::Api`.
async fn checked(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    debug!("{} from server: {}", status, text);
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.message),
        Err(_) => (
            "unknown".to_string(),
            if text.is_empty() { status.to_string() } else { text },
        ),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signed_out_writes_fail_before_sending() {
        // nothing listens here; reaching the network would be an Http error
        let client = MarketClient::new("http://127.0.0.1:9/");
        assert_eq!(client.base_url(), "http://127.0.0.1:9");

        let err = client.chats().await.unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn clones_share_the_token() {
        let a = MarketClient::new("http://localhost:3000");
        let b = a.clone();
        a.set_token(Some("t".into()));
        assert_eq!(b.token().as_deref(), Some("t"));
    }
}
