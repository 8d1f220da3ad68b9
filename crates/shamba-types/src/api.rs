use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification, Product, ProductCard, ProductCategory, Profile, Store, UserType};

pub const MIN_PASSWORD_LEN: usize = 6;

/// A request failed local validation. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

fn invalid<T>(msg: &str) -> Result<T, ValidationError> {
    Err(ValidationError(msg.to_string()))
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Serde adapter for clearable patch fields. An absent field stays `None`;
/// an explicit `null` becomes `Some(None)`.
mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Overwrite `field` when the patch names it, `null` included.
fn patch_nullable<T: Clone>(field: &mut Option<T>, patch: &Option<Option<T>>) {
    if let Some(value) = patch {
        *field = value.clone();
    }
}

fn patch<T: Clone>(field: &mut T, patch: &Option<T>) {
    if let Some(value) = patch {
        *field = value.clone();
    }
}

// -- JWT Claims --

/// Claims carried by every session token. `sid` names the server-side
/// session row so sign-out can revoke the token before it expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.email.contains('@') {
            return invalid("Please enter a valid email address");
        }
        if self.password != self.confirm_password {
            return invalid("Passwords do not match");
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return invalid("Password must be at least 6 characters long");
        }
        if blank(&self.full_name) {
            return invalid("Full name is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Option<Profile>,
}

// -- Listing queries --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProductCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

// -- Stores --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStoreRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub show_phone_number: bool,
    #[serde(default)]
    pub store_image_url: Option<String>,
    pub county_id: Option<i64>,
    #[serde(default)]
    pub sub_county_id: Option<i64>,
    #[serde(default)]
    pub ward_id: Option<i64>,
}

impl CreateStoreRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if blank(&self.name) {
            return invalid("Store name is required");
        }
        if self.county_id.is_none() {
            return invalid("County is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStoreRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_phone_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub store_image_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub sub_county_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub ward_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateStoreRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.as_deref().is_some_and(blank) {
            return invalid("Store name is required");
        }
        Ok(())
    }

    /// Merge this patch into the stored row.
    pub fn apply(&self, store: &mut Store) {
        if let Some(name) = &self.name {
            store.name = name.trim().to_string();
        }
        patch_nullable(&mut store.description, &self.description);
        patch_nullable(&mut store.phone_number, &self.phone_number);
        patch_nullable(&mut store.email, &self.email);
        patch(&mut store.show_phone_number, &self.show_phone_number);
        patch_nullable(&mut store.store_image_url, &self.store_image_url);
        if self.county_id.is_some() {
            store.county_id = self.county_id;
        }
        patch_nullable(&mut store.sub_county_id, &self.sub_county_id);
        patch_nullable(&mut store.ward_id, &self.ward_id);
        patch(&mut store.is_active, &self.is_active);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyStoreResponse {
    pub store: Store,
    pub products: Vec<ProductCard>,
}

// -- Products --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub store_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: ProductCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity_available: i64,
    pub county_id: Option<i64>,
    #[serde(default)]
    pub sub_county_id: Option<i64>,
    #[serde(default)]
    pub ward_id: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if blank(&self.title) {
            return invalid("Product title is required");
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return invalid("Price must be zero or more");
        }
        if self.quantity_available < 0 {
            return invalid("Quantity must be zero or more");
        }
        if self.county_id.is_none() {
            return invalid("County is required");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProductCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub subcategory: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub sub_county_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub ward_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.as_deref().is_some_and(blank) {
            return invalid("Product title is required");
        }
        if self.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
            return invalid("Price must be zero or more");
        }
        if self.quantity_available.is_some_and(|q| q < 0) {
            return invalid("Quantity must be zero or more");
        }
        Ok(())
    }

    /// Merge this patch into the stored row.
    pub fn apply(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title = title.trim().to_string();
        }
        patch_nullable(&mut product.description, &self.description);
        patch(&mut product.category, &self.category);
        patch_nullable(&mut product.subcategory, &self.subcategory);
        patch(&mut product.price, &self.price);
        patch(&mut product.unit, &self.unit);
        patch(&mut product.quantity_available, &self.quantity_available);
        if self.county_id.is_some() {
            product.county_id = self.county_id;
        }
        patch_nullable(&mut product.sub_county_id, &self.sub_county_id);
        patch_nullable(&mut product.ward_id, &self.ward_id);
        patch(&mut product.is_active, &self.is_active);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddImageRequest {
    pub image_url: String,
    #[serde(default)]
    pub is_primary: bool,
}

// -- Chat --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactSellerRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSellerResponse {
    pub chat_id: Uuid,
    /// False when an existing chat for this buyer, seller and product was reused.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
    /// How many counterpart messages this read marked as read.
    pub marked_read: u32,
}

// -- Profile --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub county_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub sub_county_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub ward_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_phone_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub profile_picture_url: Option<Option<String>>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.as_deref().is_some_and(blank) {
            return invalid("Full name is required");
        }
        Ok(())
    }

    /// Merge this patch into the stored row.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.full_name {
            profile.full_name = name.trim().to_string();
        }
        patch_nullable(&mut profile.phone_number, &self.phone_number);
        patch_nullable(&mut profile.county_id, &self.county_id);
        patch_nullable(&mut profile.sub_county_id, &self.sub_county_id);
        patch_nullable(&mut profile.ward_id, &self.ward_id);
        patch(&mut profile.show_phone_number, &self.show_phone_number);
        patch(&mut profile.notifications_enabled, &self.notifications_enabled);
        patch(&mut profile.user_type, &self.user_type);
        patch_nullable(&mut profile.profile_picture_url, &self.profile_picture_url);
    }
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkedRead {
    pub updated: u32,
}

// -- Storage --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub bucket: String,
    pub key: String,
    pub url: String,
}
