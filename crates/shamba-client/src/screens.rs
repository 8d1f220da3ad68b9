//! State machines behind each page.
//!
//! Screens never render anything. They load through the shared cache, hold
//! a view state, and turn user actions into an [`Outcome`]: an optional
//! toast and an optional navigation for the shell to carry out.

use tracing::warn;
use uuid::Uuid;

use shamba_types::api::{MyStoreResponse, NotificationList, UpdateProductRequest, UploadResponse};
use shamba_types::models::{
    ChatSummary, County, Message, Page, ProductCard, ProductDetail, Store, StoreDetail, StoreSummary, SubCounty, Ward,
};

use crate::cache::{QueryCache, keys};
use crate::client::MarketClient;
use crate::error::Result;
use crate::filters::{FilterState, ProductFilters, StoreFilters};
use crate::forms::{ImageField, LocationFields, LocationPick, ProductForm, ProfileForm, StoreForm};
use crate::routes::Route;
use crate::session::SessionContext;

/// Everything a screen needs: the session (and through it the client) and
/// the query cache.
pub struct AppContext {
    session: SessionContext,
    cache: QueryCache,
}

impl AppContext {
    pub fn new(base_url: &str) -> Self {
        Self {
            session: SessionContext::new(MarketClient::new(base_url)),
            cache: QueryCache::new(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn client(&self) -> &MarketClient {
        self.session.client()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Where a navigation to `route` actually lands.
    pub fn resolve(&self, route: Route) -> Route {
        if route.requires_auth() && !self.session.is_signed_in() {
            return Route::Auth;
        }
        route
    }

    /// Sign out and drop everything cached for the old user. The local
    /// session is gone even if the server could not be reached.
    pub async fn sign_out(&self) -> Outcome {
        let _ = self.session.sign_out().await;
        self.cache.clear().await;
        Outcome::navigate(Route::Home)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Empty,
    Items(T),
    Failed(String),
}

impl<T> ViewState<T> {
    fn from_result(result: Result<T>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => Self::Empty,
            Ok(value) => Self::Items(value),
            Err(e) if e.is_not_found() => Self::Empty,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn items(&self) -> Option<&T> {
        match self {
            Self::Items(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: Option<String>,
    pub destructive: bool,
}

impl Toast {
    pub fn success(title: &str, description: &str) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            destructive: false,
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".into(),
            description: Some(description.into()),
            destructive: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub toast: Option<Toast>,
    pub navigate: Option<Route>,
}

impl Outcome {
    pub fn toast(toast: Toast) -> Self {
        Self { toast: Some(toast), navigate: None }
    }

    pub fn navigate(route: Route) -> Self {
        Self { toast: None, navigate: Some(route) }
    }

    pub fn then(mut self, route: Route) -> Self {
        self.navigate = Some(route);
        self
    }
}

// -- Image uploads shared by the form screens --

async fn upload_into(ctx: &AppContext, field: &mut ImageField, content_type: &str, data: Vec<u8>) -> Outcome {
    match ctx.client().upload(field.bucket(), content_type, data).await {
        Ok(upload) => {
            if let Some(old) = field.set_uploaded(upload) {
                discard(ctx, old).await;
            }
            Outcome::toast(Toast::success("Image uploaded successfully", "Your image has been uploaded."))
        }
        Err(e) => Outcome::toast(Toast::error(e.to_string())),
    }
}

async fn remove_from(ctx: &AppContext, field: &mut ImageField) {
    if let Some(upload) = field.remove() {
        discard(ctx, upload).await;
    }
}

async fn discard(ctx: &AppContext, upload: UploadResponse) {
    if let Err(e) = ctx.client().delete_object(&upload.bucket, &upload.key).await {
        warn!("could not delete {}/{}: {}", upload.bucket, upload.key, e);
    }
}

// -- Location pickers shared by the form screens --

/// Choices for the county, sub-county and ward pickers. A level stays empty
/// until the level above it is chosen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationOptions {
    pub counties: Vec<County>,
    pub sub_counties: Vec<SubCounty>,
    pub wards: Vec<Ward>,
}

impl LocationOptions {
    /// Read the choices that match `fields`. Each level is cached under its
    /// parent's id.
    pub async fn refresh(&mut self, ctx: &AppContext, fields: &LocationFields) -> Result<()> {
        let client = ctx.client().clone();
        self.counties = ctx
            .cache()
            .fetch(keys::counties(), move || async move { client.counties().await })
            .await?;

        self.sub_counties = match fields.county_id {
            Some(id) => {
                let client = ctx.client().clone();
                ctx.cache()
                    .fetch(keys::sub_counties(id), move || async move { client.sub_counties(id).await })
                    .await?
            }
            None => Vec::new(),
        };

        self.wards = match fields.sub_county_id {
            Some(id) => {
                let client = ctx.client().clone();
                ctx.cache()
                    .fetch(keys::wards(id), move || async move { client.wards(id).await })
                    .await?
            }
            None => Vec::new(),
        };
        Ok(())
    }
}

async fn pick_into(
    ctx: &AppContext,
    fields: &mut LocationFields,
    options: &mut LocationOptions,
    pick: LocationPick,
) -> Outcome {
    fields.pick(pick);
    match options.refresh(ctx, fields).await {
        Ok(()) => Outcome::default(),
        Err(e) => Outcome::toast(Toast::error(e.to_string())),
    }
}

// -- Home --

pub struct HomeScreen {
    pub featured: ViewState<Vec<ProductCard>>,
}

impl HomeScreen {
    pub fn new() -> Self {
        Self { featured: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.featured = ViewState::Loading;
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::featured(), move || async move { client.featured_products().await })
            .await;
        self.featured = ViewState::from_result(result, |items| items.is_empty());
    }
}

impl Default for HomeScreen {
    fn default() -> Self {
        Self::new()
    }
}

// -- Listings --

pub struct ProductListScreen {
    pub filters: FilterState<ProductFilters>,
    pub view: ViewState<Page<ProductCard>>,
}

impl ProductListScreen {
    pub fn new(filters: FilterState<ProductFilters>) -> Self {
        Self { filters, view: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let query = self.filters.query();
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::product_list(&query), move || async move { client.products(&query).await })
            .await;
        if let Ok(page) = &result {
            self.filters.set_total_pages(page.total_pages);
        }
        self.view = ViewState::from_result(result, |page| page.is_empty());
    }

    pub async fn apply_filters(&mut self, ctx: &AppContext) {
        self.filters.apply();
        self.load(ctx).await;
    }

    pub async fn clear_filters(&mut self, ctx: &AppContext) {
        self.filters.clear();
        self.load(ctx).await;
    }

    pub async fn next_page(&mut self, ctx: &AppContext) {
        if self.filters.next_page() {
            self.load(ctx).await;
        }
    }

    pub async fn prev_page(&mut self, ctx: &AppContext) {
        if self.filters.prev_page() {
            self.load(ctx).await;
        }
    }
}

pub struct StoreListScreen {
    pub filters: FilterState<StoreFilters>,
    pub view: ViewState<Page<StoreSummary>>,
}

impl StoreListScreen {
    pub fn new() -> Self {
        Self { filters: FilterState::new(), view: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let query = self.filters.query();
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::store_list(&query), move || async move { client.stores(&query).await })
            .await;
        if let Ok(page) = &result {
            self.filters.set_total_pages(page.total_pages);
        }
        self.view = ViewState::from_result(result, |page| page.is_empty());
    }

    pub async fn apply_filters(&mut self, ctx: &AppContext) {
        self.filters.apply();
        self.load(ctx).await;
    }

    pub async fn clear_filters(&mut self, ctx: &AppContext) {
        self.filters.clear();
        self.load(ctx).await;
    }

    pub async fn next_page(&mut self, ctx: &AppContext) {
        if self.filters.next_page() {
            self.load(ctx).await;
        }
    }

    pub async fn prev_page(&mut self, ctx: &AppContext) {
        if self.filters.prev_page() {
            self.load(ctx).await;
        }
    }
}

impl Default for StoreListScreen {
    fn default() -> Self {
        Self::new()
    }
}

// -- Details --

pub struct ProductDetailScreen {
    pub id: Uuid,
    pub view: ViewState<ProductDetail>,
}

impl ProductDetailScreen {
    pub fn new(id: Uuid) -> Self {
        Self { id, view: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let (id, client) = (self.id, ctx.client().clone());
        let result = ctx
            .cache()
            .fetch(keys::product(id), move || async move { client.product(id).await })
            .await;
        self.view = ViewState::from_result(result, |_| false);
    }

    /// Signed out: straight to sign-in, nothing is written.
    pub async fn contact_seller(&self, ctx: &AppContext) -> Outcome {
        if !ctx.session().is_signed_in() {
            return Outcome::toast(Toast {
                title: "Sign in required".into(),
                description: Some("Please sign in to contact the seller.".into()),
                destructive: true,
            })
            .then(Route::Auth);
        }

        match ctx.client().contact_seller(self.id).await {
            Ok(_) => {
                ctx.cache().invalidate(&keys::chats()).await;
                Outcome::toast(Toast::success("Message sent!", "Your inquiry has been sent to the seller."))
                    .then(Route::Chat)
            }
            Err(e) if e.is_unauthorized() => Outcome::navigate(Route::Auth),
            Err(e) => {
                warn!("contact seller failed: {}", e);
                Outcome::toast(Toast::error("Failed to contact seller. Please try again."))
            }
        }
    }
}

pub struct StoreDetailScreen {
    pub id: Uuid,
    pub view: ViewState<StoreDetail>,
}

impl StoreDetailScreen {
    pub fn new(id: Uuid) -> Self {
        Self { id, view: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let (id, client) = (self.id, ctx.client().clone());
        let result = ctx
            .cache()
            .fetch(keys::store(id), move || async move { client.store(id).await })
            .await;
        self.view = ViewState::from_result(result, |_| false);
    }
}

// -- Store management --

pub struct MyStoreScreen {
    pub view: ViewState<MyStoreResponse>,
}

impl MyStoreScreen {
    pub fn new() -> Self {
        Self { view: ViewState::Loading }
    }

    /// `Empty` means the user has no store yet.
    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::my_store(), move || async move { client.my_store().await })
            .await;
        self.view = ViewState::from_result(result, |_| false);
    }

    /// List or unlist one of the store's products.
    pub async fn set_product_active(&mut self, ctx: &AppContext, product_id: Uuid, active: bool) -> Outcome {
        let req = UpdateProductRequest { is_active: Some(active), ..Default::default() };
        match ctx.client().update_product(product_id, &req).await {
            Ok(_) => {
                invalidate_listings(ctx).await;
                self.load(ctx).await;
                Outcome::default()
            }
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }
}

impl Default for MyStoreScreen {
    fn default() -> Self {
        Self::new()
    }
}

async fn invalidate_listings(ctx: &AppContext) {
    let cache = ctx.cache();
    cache.invalidate(&keys::products()).await;
    cache.invalidate(&keys::stores()).await;
    cache.invalidate(&keys::my_store()).await;
}

pub struct CreateStoreScreen {
    pub form: StoreForm,
    pub locations: LocationOptions,
}

impl CreateStoreScreen {
    pub fn new() -> Self {
        Self { form: StoreForm::default(), locations: LocationOptions::default() }
    }

    pub async fn load_locations(&mut self, ctx: &AppContext) -> Outcome {
        match self.locations.refresh(ctx, &self.form.location).await {
            Ok(()) => Outcome::default(),
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }

    pub async fn pick_location(&mut self, ctx: &AppContext, pick: LocationPick) -> Outcome {
        pick_into(ctx, &mut self.form.location, &mut self.locations, pick).await
    }

    pub async fn upload_image(&mut self, ctx: &AppContext, content_type: &str, data: Vec<u8>) -> Outcome {
        upload_into(ctx, &mut self.form.image, content_type, data).await
    }

    pub async fn remove_image(&mut self, ctx: &AppContext) {
        remove_from(ctx, &mut self.form.image).await;
    }

    /// On failure the form is left as it was.
    pub async fn submit(&mut self, ctx: &AppContext) -> Outcome {
        let req = match self.form.to_request() {
            Ok(req) => req,
            Err(e) => return Outcome::toast(Toast::error(e.0)),
        };
        match ctx.client().create_store(&req).await {
            Ok(_) => {
                invalidate_listings(ctx).await;
                self.form = StoreForm::default();
                self.locations.sub_counties.clear();
                self.locations.wards.clear();
                Outcome::toast(Toast::success(
                    "Store Created Successfully!",
                    "Your store is now live on the marketplace.",
                ))
                .then(Route::MyStore)
            }
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }
}

impl Default for CreateStoreScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateProductGate {
    Loading,
    SignInRequired,
    /// No active store; the page offers a way to `/create-store`.
    NeedsStore,
    Ready(Store),
    Failed(String),
}

pub struct CreateProductScreen {
    pub gate: CreateProductGate,
    pub form: ProductForm,
    pub locations: LocationOptions,
}

impl CreateProductScreen {
    pub fn new() -> Self {
        Self {
            gate: CreateProductGate::Loading,
            form: ProductForm::default(),
            locations: LocationOptions::default(),
        }
    }

    pub async fn pick_location(&mut self, ctx: &AppContext, pick: LocationPick) -> Outcome {
        pick_into(ctx, &mut self.form.location, &mut self.locations, pick).await
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        if !ctx.session().is_signed_in() {
            self.gate = CreateProductGate::SignInRequired;
            return;
        }
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::my_store(), move || async move { client.my_store().await })
            .await;
        self.gate = match result {
            Ok(mine) => {
                self.form.store_id = Some(mine.store.id);
                if let Err(e) = self.locations.refresh(ctx, &self.form.location).await {
                    warn!("could not load locations: {}", e);
                }
                CreateProductGate::Ready(mine.store)
            }
            Err(e) if e.is_not_found() => CreateProductGate::NeedsStore,
            Err(e) if e.is_unauthorized() => CreateProductGate::SignInRequired,
            Err(e) => CreateProductGate::Failed(e.to_string()),
        };
    }

    /// Where the gate sends the user, if anywhere.
    pub fn redirect(&self) -> Option<Route> {
        match self.gate {
            CreateProductGate::SignInRequired => Some(Route::Auth),
            CreateProductGate::NeedsStore => Some(Route::CreateStore),
            _ => None,
        }
    }

    pub async fn upload_image(&mut self, ctx: &AppContext, content_type: &str, data: Vec<u8>) -> Outcome {
        upload_into(ctx, &mut self.form.image, content_type, data).await
    }

    pub async fn remove_image(&mut self, ctx: &AppContext) {
        remove_from(ctx, &mut self.form.image).await;
    }

    pub async fn submit(&mut self, ctx: &AppContext) -> Outcome {
        let req = match self.form.to_request() {
            Ok(req) => req,
            Err(e) => return Outcome::toast(Toast::error(e.0)),
        };
        match ctx.client().create_product(&req).await {
            Ok(_) => {
                invalidate_listings(ctx).await;
                self.form = ProductForm {
                    store_id: self.form.store_id,
                    ..ProductForm::default()
                };
                self.locations.sub_counties.clear();
                self.locations.wards.clear();
                Outcome::toast(Toast::success(
                    "Product Created Successfully!",
                    "Your product has been added to your store.",
                ))
                .then(Route::MyStore)
            }
            Err(e) if e.is_store_required() => {
                self.gate = CreateProductGate::NeedsStore;
                Outcome::toast(Toast::error(e.to_string())).then(Route::CreateStore)
            }
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }
}

impl Default for CreateProductScreen {
    fn default() -> Self {
        Self::new()
    }
}

// -- Chat --

pub struct ChatScreen {
    pub chats: ViewState<Vec<ChatSummary>>,
    pub selected: Option<Uuid>,
    pub messages: Vec<Message>,
    pub draft: String,
}

impl ChatScreen {
    pub fn new() -> Self {
        Self {
            chats: ViewState::Loading,
            selected: None,
            messages: Vec::new(),
            draft: String::new(),
        }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.chats = ViewState::Loading;
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::chats(), move || async move { client.chats().await })
            .await;
        self.chats = ViewState::from_result(result, |chats| chats.is_empty());
    }

    /// Open a chat. Reading marks the other side's messages read, so the
    /// chat list's unread counts are refreshed when anything changed.
    pub async fn select(&mut self, ctx: &AppContext, chat_id: Uuid) -> Outcome {
        self.selected = Some(chat_id);
        match self.read_messages(ctx, chat_id).await {
            Ok(_) => Outcome::default(),
            Err(e) => {
                self.messages.clear();
                Outcome::toast(Toast::error(e.to_string()))
            }
        }
    }

    /// Returns whether the chat list was reloaded.
    async fn read_messages(&mut self, ctx: &AppContext, chat_id: Uuid) -> Result<bool> {
        let resp = ctx.client().messages(chat_id).await?;
        self.messages = resp.messages;
        if resp.marked_read == 0 {
            return Ok(false);
        }
        ctx.cache().invalidate(&keys::chats()).await;
        self.load(ctx).await;
        Ok(true)
    }

    /// Send the draft and re-read the conversation. A failed send keeps the
    /// draft. The chat list is fetched once either way.
    pub async fn send(&mut self, ctx: &AppContext) -> Outcome {
        let Some(chat_id) = self.selected else {
            return Outcome::default();
        };
        let content = self.draft.trim().to_string();
        if content.is_empty() {
            return Outcome::default();
        }

        if let Err(e) = ctx.client().send_message(chat_id, &content).await {
            return Outcome::toast(Toast::error(e.to_string()));
        }
        self.draft.clear();
        ctx.cache().invalidate(&keys::chats()).await;
        let reloaded = match self.read_messages(ctx, chat_id).await {
            Ok(reloaded) => reloaded,
            Err(e) => {
                warn!("could not re-read chat {}: {}", chat_id, e);
                false
            }
        };
        if !reloaded {
            self.load(ctx).await;
        }
        Outcome::default()
    }
}

impl Default for ChatScreen {
    fn default() -> Self {
        Self::new()
    }
}

// -- Profile --

pub struct ProfileScreen {
    pub form: Option<ProfileForm>,
    pub locations: LocationOptions,
    pub error: Option<String>,
}

impl ProfileScreen {
    pub fn new() -> Self {
        Self { form: None, locations: LocationOptions::default(), error: None }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::profile(), move || async move { client.profile().await })
            .await;
        match result {
            Ok(profile) => {
                let form = ProfileForm::from_profile(&profile);
                if let Err(e) = self.locations.refresh(ctx, &form.location).await {
                    warn!("could not load locations: {}", e);
                }
                self.form = Some(form);
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub async fn pick_location(&mut self, ctx: &AppContext, pick: LocationPick) -> Outcome {
        match self.form.as_mut() {
            Some(form) => pick_into(ctx, &mut form.location, &mut self.locations, pick).await,
            None => Outcome::default(),
        }
    }

    pub async fn upload_avatar(&mut self, ctx: &AppContext, content_type: &str, data: Vec<u8>) -> Outcome {
        match self.form.as_mut() {
            Some(form) => upload_into(ctx, &mut form.avatar, content_type, data).await,
            None => Outcome::default(),
        }
    }

    pub async fn remove_avatar(&mut self, ctx: &AppContext) {
        if let Some(form) = self.form.as_mut() {
            remove_from(ctx, &mut form.avatar).await;
        }
    }

    pub async fn save(&mut self, ctx: &AppContext) -> Outcome {
        let Some(form) = self.form.as_ref() else {
            return Outcome::default();
        };
        let req = match form.to_request() {
            Ok(req) => req,
            Err(e) => return Outcome::toast(Toast::error(e.0)),
        };
        match ctx.client().update_profile(&req).await {
            Ok(profile) => {
                ctx.cache().invalidate(&keys::profile()).await;
                ctx.session().update_profile(profile.clone());
                self.form = Some(ProfileForm::from_profile(&profile));
                Outcome::toast(Toast::success("Profile updated", "Your changes have been saved."))
            }
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }
}

impl Default for ProfileScreen {
    fn default() -> Self {
        Self::new()
    }
}

// -- Notifications --

pub struct NotificationsScreen {
    pub view: ViewState<NotificationList>,
}

impl NotificationsScreen {
    pub fn new() -> Self {
        Self { view: ViewState::Loading }
    }

    pub async fn load(&mut self, ctx: &AppContext) {
        self.view = ViewState::Loading;
        let client = ctx.client().clone();
        let result = ctx
            .cache()
            .fetch(keys::notifications(), move || async move { client.notifications().await })
            .await;
        self.view = ViewState::from_result(result, |list| list.notifications.is_empty());
    }

    pub fn unread(&self) -> u32 {
        self.view.items().map_or(0, |list| list.unread)
    }

    pub async fn mark_read(&mut self, ctx: &AppContext, id: Uuid) -> Outcome {
        let result = ctx.client().mark_notification_read(id).await.map(|_| ());
        self.after_write(ctx, result).await
    }

    pub async fn mark_all_read(&mut self, ctx: &AppContext) -> Outcome {
        let result = ctx.client().mark_all_notifications_read().await.map(|_| ());
        self.after_write(ctx, result).await
    }

    async fn after_write(&mut self, ctx: &AppContext, result: Result<()>) -> Outcome {
        match result {
            Ok(()) => {
                ctx.cache().invalidate(&keys::notifications()).await;
                self.load(ctx).await;
                Outcome::default()
            }
            Err(e) => Outcome::toast(Toast::error(e.to_string())),
        }
    }
}

impl Default for NotificationsScreen {
    fn default() -> Self {
        Self::new()
    }
}
