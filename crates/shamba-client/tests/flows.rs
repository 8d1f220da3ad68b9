use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;

use shamba_api::auth::{AppState, AppStateInner};
use shamba_api::storage::Storage;
use shamba_client::cache::keys;
use shamba_client::filters::{FilterState, ProductFilters};
use shamba_client::forms::{LocationFields, LocationPick, SignUpForm};
use shamba_client::screens::{
    ChatScreen, CreateProductGate, CreateProductScreen, CreateStoreScreen, NotificationsScreen,
    ProductDetailScreen, ProductListScreen, ProfileScreen,
};
use shamba_client::{AppContext, MarketClient, Route, ViewState};
use shamba_db::Database;
use shamba_types::models::{ProductCategory, UserType};

/// A live server on an ephemeral port.
struct Server {
    base_url: String,
    _dir: TempDir,
}

impl Server {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), &base_url).await.unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "flow-secret".into(),
            token_ttl_days: 30,
            storage,
        });
        let app = shamba_api::router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { base_url, _dir: dir }
    }

    async fn signed_up(&self, email: &str, user_type: UserType) -> AppContext {
        let ctx = AppContext::new(&self.base_url);
        let form = SignUpForm {
            email: email.into(),
            password: "shamba123".into(),
            confirm_password: "shamba123".into(),
            full_name: "Wanjiku Kamau".into(),
            user_type,
            ..Default::default()
        };
        ctx.session().sign_up(&form).await.unwrap();
        ctx
    }

    /// Seller with a store in Nairobi and one vegetable listing.
    async fn seller(&self, email: &str) -> AppContext {
        let ctx = self.signed_up(email, UserType::Seller).await;

        let mut store = CreateStoreScreen::new();
        store.form.name = "Kamau Greens".into();
        store.form.location.set_county(Some(47));
        let outcome = store.submit(&ctx).await;
        assert_eq!(outcome.navigate, Some(Route::MyStore));

        let mut product = CreateProductScreen::new();
        product.load(&ctx).await;
        assert!(matches!(product.gate, CreateProductGate::Ready(_)));
        product.form.title = "Sukuma wiki".into();
        product.form.category = Some(ProductCategory::Vegetables);
        product.form.price = "30".into();
        product.form.quantity_available = "40".into();
        product.form.location = LocationFields { county_id: Some(47), ..Default::default() };
        let outcome = product.submit(&ctx).await;
        assert_eq!(outcome.toast.unwrap().title, "Product Created Successfully!");
        ctx
    }
}

async fn only_product(ctx: &AppContext) -> uuid::Uuid {
    let mut list = ProductListScreen::new(FilterState::new());
    list.load(ctx).await;
    let page = list.view.items().expect("one listing");
    assert_eq!(page.items.len(), 1);
    page.items[0].product.id
}

#[tokio::test]
async fn product_before_store_redirects_to_store_creation() {
    let server = Server::start().await;
    let ctx = server.signed_up("otieno@example.com", UserType::Seller).await;

    let mut screen = CreateProductScreen::new();
    screen.load(&ctx).await;
    assert_eq!(screen.gate, CreateProductGate::NeedsStore);
    assert_eq!(screen.redirect(), Some(Route::CreateStore));

    // submitting anyway is refused by the server with a pointer to the store page
    screen.form.title = "Hass avocados".into();
    screen.form.category = Some(ProductCategory::Fruits);
    screen.form.price = "20".into();
    let outcome = screen.submit(&ctx).await;
    assert_eq!(outcome.navigate, Some(Route::CreateStore));
    assert!(outcome.toast.unwrap().destructive);
    assert_eq!(screen.form.title, "Hass avocados");
}

#[tokio::test]
async fn category_filter_narrows_listings() {
    let server = Server::start().await;
    let seller = server.seller("kamau@example.com").await;

    let mut list = ProductListScreen::new(FilterState::new());
    list.filters.draft = ProductFilters {
        category: Some(ProductCategory::Vegetables),
        ..Default::default()
    };
    list.apply_filters(&seller).await;
    assert_eq!(list.view.items().map(|p| p.items.len()), Some(1));

    list.filters.draft.category = Some(ProductCategory::Dairy);
    list.apply_filters(&seller).await;
    assert_eq!(list.view, ViewState::Empty);

    list.clear_filters(&seller).await;
    assert_eq!(list.view.items().map(|p| p.total), Some(1));
}

#[tokio::test]
async fn contacting_twice_keeps_one_conversation() {
    let server = Server::start().await;
    let seller = server.seller("kamau@example.com").await;
    let buyer = server.signed_up("achieng@example.com", UserType::Buyer).await;
    let product_id = only_product(&buyer).await;

    let detail = ProductDetailScreen::new(product_id);
    for _ in 0..2 {
        let outcome = detail.contact_seller(&buyer).await;
        assert_eq!(outcome.navigate, Some(Route::Chat));
        assert_eq!(outcome.toast.unwrap().title, "Message sent!");
    }
    assert_eq!(buyer.client().chats().await.unwrap().len(), 1);

    // each inquiry adds a message; opening the chat reads both
    let mut chat = ChatScreen::new();
    chat.load(&seller).await;
    let chats = chat.chats.items().unwrap().clone();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].unread_count, 2);

    chat.select(&seller, chats[0].id).await;
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.chats.items().unwrap()[0].unread_count, 0);

    chat.draft = "  Yes, still available  ".into();
    chat.send(&seller).await;
    assert!(chat.draft.is_empty());
    assert_eq!(chat.messages.len(), 3);
    assert_eq!(chat.messages[2].content, "Yes, still available");
    let listed = &chat.chats.items().unwrap()[0];
    assert_eq!(listed.last_message.as_deref(), Some("Yes, still available"));
    assert_eq!(listed.unread_count, 0);

    // a reply arriving while the chat is open is marked read by the next send
    buyer.client().send_message(chats[0].id, "Great, I'll take 10").await.unwrap();
    chat.draft = "Sawa".into();
    chat.send(&seller).await;
    assert_eq!(chat.messages.len(), 5);
    let listed = &chat.chats.items().unwrap()[0];
    assert_eq!(listed.last_message.as_deref(), Some("Sawa"));
    assert_eq!(listed.unread_count, 0);

    let mut inbox = NotificationsScreen::new();
    inbox.load(&buyer).await;
    assert_eq!(inbox.unread(), 2);
    inbox.mark_all_read(&buyer).await;
    assert_eq!(inbox.unread(), 0);
}

#[tokio::test]
async fn signed_out_contact_goes_to_sign_in() {
    let server = Server::start().await;
    let seller = server.seller("kamau@example.com").await;
    let product_id = only_product(&seller).await;

    let visitor = AppContext::new(&server.base_url);
    let outcome = ProductDetailScreen::new(product_id).contact_seller(&visitor).await;
    assert_eq!(outcome.navigate, Some(Route::Auth));
    assert!(seller.client().chats().await.unwrap().is_empty());
}

#[tokio::test]
async fn removed_upload_is_deleted() {
    let server = Server::start().await;
    let ctx = server.signed_up("chebet@example.com", UserType::Seller).await;

    let mut screen = CreateStoreScreen::new();
    screen.upload_image(&ctx, "image/png", b"\x89PNG fake image".to_vec()).await;
    let url = screen.form.image.url().expect("uploaded").to_string();
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);

    screen.remove_image(&ctx).await;
    assert_eq!(screen.form.image.url(), None);
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 404);
}

#[tokio::test]
async fn sign_out_revokes_the_token() {
    let server = Server::start().await;
    let ctx = server.signed_up("mwangi@example.com", UserType::Buyer).await;
    let token = ctx.session().current().unwrap().token;

    let outcome = ctx.sign_out().await;
    assert_eq!(outcome.navigate, Some(Route::Home));
    assert!(!ctx.session().is_signed_in());
    assert_eq!(ctx.resolve(Route::Profile), Route::Auth);

    let stale = MarketClient::new(&server.base_url);
    stale.set_token(Some(token));
    assert!(stale.profile().await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn location_pickers_follow_the_chosen_level() {
    let server = Server::start().await;
    let ctx = server.signed_up("njeri@example.com", UserType::Seller).await;

    let mut store = CreateStoreScreen::new();
    store.load_locations(&ctx).await;
    assert_eq!(store.locations.counties.len(), 47);
    assert!(store.locations.sub_counties.is_empty());
    assert!(store.locations.wards.is_empty());

    store.pick_location(&ctx, LocationPick::County(Some(47))).await;
    let names: Vec<&str> = store.locations.sub_counties.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"Westlands"));

    store.pick_location(&ctx, LocationPick::SubCounty(Some(1))).await;
    assert_eq!(store.locations.wards.len(), 2);
    store.pick_location(&ctx, LocationPick::Ward(Some(2))).await;
    assert_eq!(store.form.location.ward_id, Some(2));

    // another county clears the levels below it, choices included
    store.pick_location(&ctx, LocationPick::County(Some(32))).await;
    assert_eq!(store.form.location, LocationFields { county_id: Some(32), ..Default::default() });
    assert!(store.locations.sub_counties.iter().all(|s| s.county_id == 32));
    assert!(store.locations.wards.is_empty());
    assert!(ctx.cache().contains(&keys::sub_counties(47)).await);
    assert!(ctx.cache().contains(&keys::wards(1)).await);

    // the profile page starts from the saved location
    let mut profile = ProfileScreen::new();
    profile.load(&ctx).await;
    profile.pick_location(&ctx, LocationPick::County(Some(47))).await;
    profile.pick_location(&ctx, LocationPick::SubCounty(Some(4))).await;
    profile.save(&ctx).await;

    let mut reopened = ProfileScreen::new();
    reopened.load(&ctx).await;
    assert_eq!(reopened.form.unwrap().location.sub_county_id, Some(4));
    assert_eq!(reopened.locations.sub_counties.len(), 4);
    assert_eq!(reopened.locations.wards.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3]);
}
