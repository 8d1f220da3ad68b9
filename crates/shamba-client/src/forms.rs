//! Form state behind the sign-up, store, product and profile pages.
//!
//! Each form turns itself into the matching request and runs the same
//! validation the server does, so obvious mistakes never leave the client.

use uuid::Uuid;

use shamba_types::api::{
    CreateProductRequest, CreateStoreRequest, RegisterRequest, UpdateProfileRequest, UploadResponse,
    ValidationError,
};
use shamba_types::models::{ProductCategory, Profile, UserType};

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// County, sub-county and ward pickers. Changing a level clears the levels
/// below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationFields {
    pub county_id: Option<i64>,
    pub sub_county_id: Option<i64>,
    pub ward_id: Option<i64>,
}

impl LocationFields {
    pub fn set_county(&mut self, county_id: Option<i64>) {
        if self.county_id != county_id {
            self.county_id = county_id;
            self.sub_county_id = None;
            self.ward_id = None;
        }
    }

    pub fn set_sub_county(&mut self, sub_county_id: Option<i64>) {
        if self.sub_county_id != sub_county_id {
            self.sub_county_id = sub_county_id;
            self.ward_id = None;
        }
    }

    pub fn set_ward(&mut self, ward_id: Option<i64>) {
        self.ward_id = ward_id;
    }

    pub fn pick(&mut self, pick: LocationPick) {
        match pick {
            LocationPick::County(id) => self.set_county(id),
            LocationPick::SubCounty(id) => self.set_sub_county(id),
            LocationPick::Ward(id) => self.set_ward(id),
        }
    }
}

/// One change to a location picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPick {
    County(Option<i64>),
    SubCounty(Option<i64>),
    Ward(Option<i64>),
}

/// An image picker backed by object storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageField {
    bucket: String,
    url: Option<String>,
    /// Set when the current image was uploaded through this field.
    uploaded: Option<UploadResponse>,
}

impl ImageField {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            url: None,
            uploaded: None,
        }
    }

    /// Start from an image saved earlier. It is not ours to delete.
    pub fn with_current(bucket: &str, url: Option<String>) -> Self {
        Self {
            url,
            ..Self::new(bucket)
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Show a fresh upload. Returns the upload it replaced, which the
    /// caller should delete.
    pub fn set_uploaded(&mut self, upload: UploadResponse) -> Option<UploadResponse> {
        self.url = Some(upload.url.clone());
        self.uploaded.replace(upload)
    }

    /// Clear the image. Returns the object to delete when it was uploaded
    /// through this field.
    pub fn remove(&mut self) -> Option<UploadResponse> {
        self.url = None;
        self.uploaded.take()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub phone_number: String,
    pub user_type: UserType,
}

impl SignUpForm {
    pub fn to_request(&self) -> Result<RegisterRequest, ValidationError> {
        let req = RegisterRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            full_name: self.full_name.trim().to_string(),
            phone_number: optional(&self.phone_number),
            user_type: self.user_type,
        };
        req.validate()?;
        Ok(req)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreForm {
    pub name: String,
    pub description: String,
    pub phone_number: String,
    pub email: String,
    pub show_phone_number: bool,
    pub location: LocationFields,
    pub image: ImageField,
}

impl Default for StoreForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            phone_number: String::new(),
            email: String::new(),
            show_phone_number: false,
            location: LocationFields::default(),
            image: ImageField::new("store-images"),
        }
    }
}

impl StoreForm {
    pub fn to_request(&self) -> Result<CreateStoreRequest, ValidationError> {
        let req = CreateStoreRequest {
            name: self.name.trim().to_string(),
            description: optional(&self.description),
            phone_number: optional(&self.phone_number),
            email: optional(&self.email),
            show_phone_number: self.show_phone_number,
            store_image_url: self.image.url().map(str::to_string),
            county_id: self.location.county_id,
            sub_county_id: self.location.sub_county_id,
            ward_id: self.location.ward_id,
        };
        req.validate()?;
        Ok(req)
    }
}

/// Numbers are kept as typed so a half-entered price is not lost.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    pub store_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Option<ProductCategory>,
    pub subcategory: String,
    pub price: String,
    pub unit: String,
    pub quantity_available: String,
    pub location: LocationFields,
    pub image: ImageField,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            store_id: None,
            title: String::new(),
            description: String::new(),
            category: None,
            subcategory: String::new(),
            price: String::new(),
            unit: String::new(),
            quantity_available: String::new(),
            location: LocationFields::default(),
            image: ImageField::new("product-images"),
        }
    }
}

impl ProductForm {
    pub fn to_request(&self) -> Result<CreateProductRequest, ValidationError> {
        let category = self
            .category
            .ok_or_else(|| ValidationError("Category is required".into()))?;
        let price: f64 = self
            .price
            .trim()
            .parse()
            .map_err(|_| ValidationError("Enter a valid price".into()))?;
        let quantity_available: i64 = match self.quantity_available.trim() {
            "" => 0,
            raw => raw
                .parse()
                .map_err(|_| ValidationError("Enter a valid quantity".into()))?,
        };

        let req = CreateProductRequest {
            store_id: self.store_id,
            title: self.title.trim().to_string(),
            description: optional(&self.description),
            category,
            subcategory: optional(&self.subcategory),
            price,
            unit: optional(&self.unit),
            quantity_available,
            county_id: self.location.county_id,
            sub_county_id: self.location.sub_county_id,
            ward_id: self.location.ward_id,
            image_url: self.image.url().map(str::to_string),
        };
        req.validate()?;
        Ok(req)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone_number: String,
    pub location: LocationFields,
    pub show_phone_number: bool,
    pub notifications_enabled: bool,
    pub user_type: UserType,
    pub avatar: ImageField,
}

impl ProfileForm {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            phone_number: profile.phone_number.clone().unwrap_or_default(),
            location: LocationFields {
                county_id: profile.county_id,
                sub_county_id: profile.sub_county_id,
                ward_id: profile.ward_id,
            },
            show_phone_number: profile.show_phone_number,
            notifications_enabled: profile.notifications_enabled,
            user_type: profile.user_type,
            avatar: ImageField::with_current("avatars", profile.profile_picture_url.clone()),
        }
    }

    pub fn to_request(&self) -> Result<UpdateProfileRequest, ValidationError> {
        // every field is sent, so a cleared field is stored as NULL
        let req = UpdateProfileRequest {
            full_name: Some(self.full_name.trim().to_string()),
            phone_number: Some(optional(&self.phone_number)),
            county_id: Some(self.location.county_id),
            sub_county_id: Some(self.location.sub_county_id),
            ward_id: Some(self.location.ward_id),
            show_phone_number: Some(self.show_phone_number),
            notifications_enabled: Some(self.notifications_enabled),
            user_type: Some(self.user_type),
            profile_picture_url: Some(self.avatar.url().map(str::to_string)),
        };
        req.validate()?;
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadResponse {
        UploadResponse {
            bucket: "product-images".into(),
            key: format!("owner/{}.jpg", name),
            url: format!("http://localhost:3000/files/product-images/owner/{}.jpg", name),
        }
    }

    fn product_form() -> ProductForm {
        ProductForm {
            title: "Kienyeji eggs".into(),
            category: Some(ProductCategory::Poultry),
            price: "450".into(),
            unit: "tray".into(),
            location: LocationFields { county_id: Some(22), ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn removed_image_is_not_submitted() {
        let mut form = product_form();
        assert!(form.image.set_uploaded(upload("a")).is_none());
        assert!(form.to_request().unwrap().image_url.is_some());

        let orphan = form.image.remove().unwrap();
        assert_eq!(orphan.key, "owner/a.jpg");
        assert_eq!(form.image.url(), None);
        assert_eq!(form.to_request().unwrap().image_url, None);
    }

    #[test]
    fn replacing_an_upload_hands_back_the_old_one() {
        let mut field = ImageField::new("store-images");
        field.set_uploaded(upload("a"));
        let old = field.set_uploaded(upload("b")).unwrap();
        assert_eq!(old.key, "owner/a.jpg");
        assert!(field.url().unwrap().ends_with("b.jpg"));
    }

    #[test]
    fn existing_image_is_not_ours_to_delete() {
        let mut field = ImageField::with_current("avatars", Some("http://x/me.png".into()));
        assert!(field.remove().is_none());
        assert_eq!(field.url(), None);
    }

    #[test]
    fn product_form_numbers() {
        let req = product_form().to_request().unwrap();
        assert_eq!(req.price, 450.0);
        assert_eq!(req.quantity_available, 0);
        assert_eq!(req.unit.as_deref(), Some("tray"));

        let mut form = product_form();
        form.price = "abc".into();
        assert_eq!(form.to_request().unwrap_err().0, "Enter a valid price");

        let mut form = product_form();
        form.category = None;
        assert!(form.to_request().is_err());
    }

    #[test]
    fn location_cascade() {
        let mut loc = LocationFields::default();
        loc.set_county(Some(47));
        loc.set_sub_county(Some(1));
        loc.set_ward(Some(2));
        loc.set_county(Some(47));
        assert_eq!(loc.ward_id, Some(2));
        loc.set_county(Some(32));
        assert_eq!(loc, LocationFields { county_id: Some(32), ..Default::default() });
    }

    #[test]
    fn sign_up_mismatch() {
        let form = SignUpForm {
            email: "a@b.co".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
            full_name: "A".into(),
            ..Default::default()
        };
        assert_eq!(form.to_request().unwrap_err().0, "Passwords do not match");
    }

    #[test]
    fn profile_form_sends_cleared_fields_as_null() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": Uuid::nil(),
            "email": "akinyi@example.com",
            "full_name": "Akinyi",
            "phone_number": "0712345678",
            "county_id": 47,
            "sub_county_id": 1,
            "ward_id": null,
            "profile_picture_url": "http://x/a.png",
            "show_phone_number": false,
            "notifications_enabled": true,
            "user_type": "buyer",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        }))
        .unwrap();

        let mut form = ProfileForm::from_profile(&profile);
        form.location.set_county(Some(32));
        form.phone_number = "  ".into();
        form.avatar.remove();

        let sent = serde_json::to_value(form.to_request().unwrap()).unwrap();
        assert_eq!(sent["county_id"], 32);
        assert!(sent["sub_county_id"].is_null());
        assert!(sent["phone_number"].is_null());
        assert!(sent["profile_picture_url"].is_null());
        assert!(sent.as_object().unwrap().contains_key("profile_picture_url"));
    }
}
