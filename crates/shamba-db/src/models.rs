//! Database row types and row mappers.
//!
//! Rows that only the DB layer cares about (credentials, chat membership)
//! get their own structs; everything else is mapped straight into the
//! shamba-types models the API serves.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use shamba_types::models::{
    LocationNames, Message, Notification, NotificationType, Product, ProductImage, Profile,
    PublicProfile, Store,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

/// Membership of a chat, used for access checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRow {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
}

impl ChatRow {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub fn counterpart_of(&self, user_id: Uuid) -> Uuid {
        if self.buyer_id == user_id { self.seller_id } else { self.buyer_id }
    }
}

/// A notification to raise as part of a larger write.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: Option<String>,
    pub related_id: Option<Uuid>,
}

/// Current time in the same format the schema defaults produce.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        // Rows written by hand through sqlite3 use datetime('now'): no zone.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

fn conversion_err<E>(row: &Row<'_>, col: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(col).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug)]
struct BadTimestamp(String);

impl std::fmt::Display for BadTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid timestamp '{}'", self.0)
    }
}

impl std::error::Error for BadTimestamp {}

pub(crate) fn uuid_col(row: &Row<'_>, col: &str) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(col)?;
    raw.parse().map_err(|e| conversion_err(row, col, e))
}

pub(crate) fn opt_uuid_col(row: &Row<'_>, col: &str) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(col)?;
    raw.map(|s| s.parse().map_err(|e| conversion_err(row, col, e)))
        .transpose()
}

pub(crate) fn time_col(row: &Row<'_>, col: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(col)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_err(row, col, BadTimestamp(raw)))
}

pub(crate) fn enum_col<T>(row: &Row<'_>, col: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(col)?;
    raw.parse().map_err(|e| conversion_err(row, col, e))
}

// -- Mappers --

pub const PROFILE_COLUMNS: &str = "p.id, p.email, p.full_name, p.phone_number, p.county_id, \
     p.sub_county_id, p.ward_id, p.profile_picture_url, p.show_phone_number, \
     p.notifications_enabled, p.user_type, p.created_at, p.updated_at";

pub(crate) fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: uuid_col(row, "id")?,
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        phone_number: row.get("phone_number")?,
        county_id: row.get("county_id")?,
        sub_county_id: row.get("sub_county_id")?,
        ward_id: row.get("ward_id")?,
        profile_picture_url: row.get("profile_picture_url")?,
        show_phone_number: row.get("show_phone_number")?,
        notifications_enabled: row.get("notifications_enabled")?,
        user_type: enum_col(row, "user_type")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

/// Public projection of a profile; phone is withheld unless the owner shows it.
pub fn public_profile(profile: &Profile, include_email: bool) -> PublicProfile {
    PublicProfile {
        id: profile.id,
        full_name: profile.full_name.clone(),
        email: include_email.then(|| profile.email.clone()),
        phone_number: if profile.show_phone_number {
            profile.phone_number.clone()
        } else {
            None
        },
        profile_picture_url: profile.profile_picture_url.clone(),
    }
}

pub const STORE_COLUMNS: &str = "s.id, s.owner_id, s.name, s.description, s.phone_number, \
     s.email, s.show_phone_number, s.store_image_url, s.county_id, s.sub_county_id, \
     s.ward_id, s.is_active, s.created_at, s.updated_at";

pub(crate) fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: uuid_col(row, "id")?,
        owner_id: uuid_col(row, "owner_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        phone_number: row.get("phone_number")?,
        email: row.get("email")?,
        show_phone_number: row.get("show_phone_number")?,
        store_image_url: row.get("store_image_url")?,
        county_id: row.get("county_id")?,
        sub_county_id: row.get("sub_county_id")?,
        ward_id: row.get("ward_id")?,
        is_active: row.get("is_active")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

pub const PRODUCT_COLUMNS: &str = "p.id, p.store_id, p.title, p.description, p.category, \
     p.subcategory, p.price, p.unit, p.quantity_available, p.county_id, p.sub_county_id, \
     p.ward_id, p.is_active, p.created_at, p.updated_at";

pub(crate) fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: uuid_col(row, "id")?,
        store_id: uuid_col(row, "store_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: enum_col(row, "category")?,
        subcategory: row.get("subcategory")?,
        price: row.get("price")?,
        unit: row.get("unit")?,
        quantity_available: row.get("quantity_available")?,
        county_id: row.get("county_id")?,
        sub_county_id: row.get("sub_county_id")?,
        ward_id: row.get("ward_id")?,
        is_active: row.get("is_active")?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
    })
}

/// Reads the `county_name`/`sub_county_name`/`ward_name` aliases a join produced.
pub(crate) fn location_from_row(row: &Row<'_>) -> rusqlite::Result<LocationNames> {
    Ok(LocationNames {
        county: row.get("county_name")?,
        sub_county: row.get("sub_county_name")?,
        ward: row.get("ward_name")?,
    })
}

pub(crate) fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ProductImage> {
    Ok(ProductImage {
        id: uuid_col(row, "id")?,
        image_url: row.get("image_url")?,
        is_primary: row.get("is_primary")?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_col(row, "id")?,
        chat_id: uuid_col(row, "chat_id")?,
        sender_id: uuid_col(row, "sender_id")?,
        content: row.get("content")?,
        is_read: row.get("is_read")?,
        created_at: time_col(row, "created_at")?,
    })
}

pub(crate) fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: uuid_col(row, "id")?,
        kind: enum_col(row, "type")?,
        title: row.get("title")?,
        message: row.get("message")?,
        related_id: opt_uuid_col(row, "related_id")?,
        is_read: row.get("is_read")?,
        created_at: time_col(row, "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_shapes() {
        let ts = parse_timestamp("2026-03-01T08:15:30.250Z").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 250);

        let legacy = parse_timestamp("2026-03-01 08:15:30").unwrap();
        assert_eq!(legacy.timestamp(), ts.timestamp());

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn now_timestamp_round_trips() {
        assert!(parse_timestamp(&now_timestamp()).is_some());
    }
}
