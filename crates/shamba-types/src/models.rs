use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed page size for every paginated listing.
pub const PAGE_SIZE: u32 = 12;

/// Number of products shown on the home page.
pub const FEATURED_LIMIT: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// -- Enumerations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Crops,
    Livestock,
    Dairy,
    Poultry,
    Aquaculture,
    Horticulture,
    Cereals,
    Legumes,
    Fruits,
    Vegetables,
    FarmEquipment,
    Seeds,
    Fertilizers,
    Pesticides,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 14] = [
        Self::Crops,
        Self::Livestock,
        Self::Dairy,
        Self::Poultry,
        Self::Aquaculture,
        Self::Horticulture,
        Self::Cereals,
        Self::Legumes,
        Self::Fruits,
        Self::Vegetables,
        Self::FarmEquipment,
        Self::Seeds,
        Self::Fertilizers,
        Self::Pesticides,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crops => "crops",
            Self::Livestock => "livestock",
            Self::Dairy => "dairy",
            Self::Poultry => "poultry",
            Self::Aquaculture => "aquaculture",
            Self::Horticulture => "horticulture",
            Self::Cereals => "cereals",
            Self::Legumes => "legumes",
            Self::Fruits => "fruits",
            Self::Vegetables => "vegetables",
            Self::FarmEquipment => "farm_equipment",
            Self::Seeds => "seeds",
            Self::Fertilizers => "fertilizers",
            Self::Pesticides => "pesticides",
        }
    }

    /// Display label: first letter upper-cased, underscores as spaces.
    pub fn label(&self) -> String {
        let raw = self.as_str().replace('_', " ");
        let mut chars = raw.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant { kind: "product category", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Buyer,
    Seller,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

impl FromStr for UserType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(UnknownVariant { kind: "user type", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Message,
    ProductInquiry,
    StoreUpdate,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::ProductInquiry => "product_inquiry",
            Self::StoreUpdate => "store_update",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "product_inquiry" => Ok(Self::ProductInquiry),
            "store_update" => Ok(Self::StoreUpdate),
            "system" => Ok(Self::System),
            _ => Err(UnknownVariant { kind: "notification type", value: s.to_string() }),
        }
    }
}

// -- Geography --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct County {
    pub id: i64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCounty {
    pub id: i64,
    pub county_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    pub id: i64,
    pub sub_county_id: i64,
    pub name: String,
}

/// Resolved names for a location reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationNames {
    pub county: Option<String>,
    pub sub_county: Option<String>,
    pub ward: Option<String>,
}

// -- Profiles --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub county_id: Option<i64>,
    pub sub_county_id: Option<i64>,
    pub ward_id: Option<i64>,
    pub profile_picture_url: Option<String>,
    pub show_phone_number: bool,
    pub notifications_enabled: bool,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a profile attached to stores and products.
/// `phone_number` is only present when the owner chose to show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
}

// -- Stores --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub show_phone_number: bool,
    pub store_image_url: Option<String>,
    pub county_id: Option<i64>,
    pub sub_county_id: Option<i64>,
    pub ward_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store row as shown in the store listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    #[serde(flatten)]
    pub store: Store,
    pub location: LocationNames,
    pub product_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDetail {
    #[serde(flatten)]
    pub store: Store,
    pub location: LocationNames,
    pub owner: Option<PublicProfile>,
    pub products: Vec<ProductCard>,
}

// -- Products --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    pub image_url: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub subcategory: Option<String>,
    pub price: f64,
    pub unit: String,
    pub quantity_available: i64,
    pub county_id: Option<i64>,
    pub sub_county_id: Option<i64>,
    pub ward_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product as shown in listings: the row plus the names a card renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub store_name: String,
    pub store_county: Option<String>,
    pub location: LocationNames,
    /// Primary image first.
    pub images: Vec<ProductImage>,
}

impl ProductCard {
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|i| i.is_primary).or(self.images.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub card: ProductCard,
    pub store: StoreContact,
    pub seller: Option<PublicProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreContact {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

// -- Chat --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub product_title: String,
    pub counterpart: Counterpart,
    pub last_message: Option<String>,
    pub unread_count: u32,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The other participant of a chat, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: Option<String>,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Pagination --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, total: u64) -> Self {
        Self {
            items,
            page,
            page_size: PAGE_SIZE,
            total,
            total_pages: total_pages(total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn total_pages(total: u64) -> u32 {
    total.div_ceil(PAGE_SIZE as u64) as u32
}

/// Row offset of a 1-based page number. Page 0 is treated as page 1.
pub fn page_offset(page: u32) -> u32 {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}
