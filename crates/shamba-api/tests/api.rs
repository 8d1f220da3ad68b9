use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use shamba_api::auth::{AppState, AppStateInner};
use shamba_api::storage::Storage;
use shamba_db::Database;

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), "http://localhost:3000").await.unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl_days: 30,
            storage,
        });
        Self {
            router: shamba_api::router(state.clone()),
            state,
            _dir: dir,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn register(&self, email: &str, user_type: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "shamba123",
                    "confirm_password": "shamba123",
                    "full_name": "Test Farmer",
                    "user_type": user_type,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// A seller with one store and one listed product. Returns (token, product id).
    async fn seller_with_product(&self, email: &str) -> (String, String) {
        let token = self.register(email, "seller").await;
        let (status, _) = self
            .call("POST", "/stores", Some(&token), Some(json!({ "name": "Mama Mboga", "county_id": 47 })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, product) = self
            .call(
                "POST",
                "/products",
                Some(&token),
                Some(json!({
                    "title": "Sukuma wiki",
                    "category": "vegetables",
                    "price": 30.0,
                    "quantity_available": 40,
                    "county_id": 47,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (token, product["id"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn mismatched_confirmation_creates_no_account() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "otieno@example.com",
                "password": "shamba123",
                "confirm_password": "shamba124",
                "full_name": "Otieno",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert_eq!(body["message"], "Passwords do not match");
    assert!(app.state.db.get_user_by_email("otieno@example.com").unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("njeri@example.com", "buyer").await;
    let (status, body) = app
        .call(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "email": "njeri@example.com",
                "password": "another1",
                "confirm_password": "another1",
                "full_name": "Njeri Again",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn revoked_session_is_rejected() {
    let app = TestApp::new().await;
    let token = app.register("kip@example.com", "buyer").await;

    let (status, session) = app.call("GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["email"], "kip@example.com");

    let (status, _) = app.call("POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.call("GET", "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, session) = app.call("GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["user"].is_null());

    let (status, login) = app
        .call("POST", "/auth/login", None, Some(json!({ "email": "kip@example.com", "password": "shamba123" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = login["token"].as_str().unwrap();
    let (status, _) = app.call("GET", "/profile", Some(fresh), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.register("wambui@example.com", "buyer").await;
    let (status, _) = app
        .call("POST", "/auth/login", None, Some(json!({ "email": "wambui@example.com", "password": "nope123" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creating_a_product_without_a_store_requires_one() {
    let app = TestApp::new().await;
    let token = app.register("mutua@example.com", "seller").await;
    let product = json!({
        "title": "Hass avocados",
        "category": "fruits",
        "price": 15.0,
        "county_id": 47,
        "image_url": "http://localhost:3000/files/product-images/x/a.jpg",
    });

    let (status, body) = app.call("POST", "/products", Some(&token), Some(product.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "store_required");

    let (status, _) = app.call("GET", "/my/store", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("POST", "/stores", Some(&token), Some(json!({ "name": "Mutua Orchards", "county_id": 22 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = app.call("POST", "/products", Some(&token), Some(product)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["unit"], "piece");

    let (status, detail) = app
        .call("GET", &format!("/products/{}", created["id"].as_str().unwrap()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["store_name"], "Mutua Orchards");
    assert_eq!(detail["images"][0]["is_primary"], true);

    let (status, mine) = app.call("GET", "/my/store", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn inconsistent_location_is_rejected() {
    let app = TestApp::new().await;
    let token = app.register("akinyi@example.com", "seller").await;
    // Naivasha (6) belongs to Nakuru, not Nairobi
    let (status, body) = app
        .call(
            "POST",
            "/stores",
            Some(&token),
            Some(json!({ "name": "Akinyi Fresh", "county_id": 47, "sub_county_id": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Sub-county does not belong to the selected county");
}

#[tokio::test]
async fn only_the_owner_may_edit_a_product() {
    let app = TestApp::new().await;
    let (_, product_id) = app.seller_with_product("owner@example.com").await;
    let other = app.register("other@example.com", "seller").await;

    let uri = format!("/products/{}", product_id);
    let (status, _) = app.call("PATCH", &uri, Some(&other), Some(json!({ "price": 1.0 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn category_filter_lists_only_that_category() {
    let app = TestApp::new().await;
    let (token, _) = app.seller_with_product("grace@example.com").await;
    let (status, _) = app
        .call(
            "POST",
            "/products",
            Some(&token),
            Some(json!({ "title": "Fresh milk", "category": "dairy", "price": 60.0, "county_id": 47 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = app.call("GET", "/products?category=dairy", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["page_size"], 12);
    assert_eq!(page["items"][0]["category"], "dairy");

    let (_, page) = app.call("GET", "/products?page=5", None, None).await;
    assert_eq!(page["total"], 2);
    assert!(page["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn contacting_a_seller_twice_reuses_the_chat() {
    let app = TestApp::new().await;
    let (seller, product_id) = app.seller_with_product("seller@example.com").await;
    let buyer = app.register("buyer@example.com", "buyer").await;
    let contact = json!({ "product_id": product_id });

    let (status, first) = app.call("POST", "/chats", Some(&buyer), Some(contact.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);

    let (status, second) = app.call("POST", "/chats", Some(&buyer), Some(contact.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(first["chat_id"], second["chat_id"]);

    let (_, chats) = app.call("GET", "/chats", Some(&buyer), None).await;
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0]["product_title"], "Sukuma wiki");
    assert_eq!(chats[0]["last_message"], "Hi! I'm interested in your product: Sukuma wiki");

    let (status, body) = app.call("POST", "/chats", Some(&seller), Some(contact)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (_, inbox) = app.call("GET", "/notifications", Some(&seller), None).await;
    assert_eq!(inbox["unread"], 2);
    assert_eq!(inbox["notifications"][0]["type"], "product_inquiry");
    let (_, marked) = app.call("POST", "/notifications/read-all", Some(&seller), None).await;
    assert_eq!(marked["updated"], 2);
}

#[tokio::test]
async fn reading_a_chat_marks_only_counterpart_messages() {
    let app = TestApp::new().await;
    let (seller, product_id) = app.seller_with_product("muuzaji@example.com").await;
    let buyer = app.register("mnunuzi@example.com", "buyer").await;
    let (_, opened) = app
        .call("POST", "/chats", Some(&buyer), Some(json!({ "product_id": product_id })))
        .await;
    let uri = format!("/chats/{}/messages", opened["chat_id"].as_str().unwrap());

    // the opening line is the buyer's own
    let (_, read) = app.call("GET", &uri, Some(&buyer), None).await;
    assert_eq!(read["marked_read"], 0);

    let (status, _) = app.call("POST", &uri, Some(&seller), Some(json!({ "content": "  Karibu!  " }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, read) = app.call("GET", &uri, Some(&seller), None).await;
    assert_eq!(read["marked_read"], 1);
    let messages = read["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["content"], "Karibu!");
    // the seller's reply stays unread until the buyer looks
    assert_eq!(messages[1]["is_read"], false);

    let (_, read) = app.call("GET", &uri, Some(&buyer), None).await;
    assert_eq!(read["marked_read"], 1);

    let (status, _) = app.call("POST", &uri, Some(&buyer), Some(json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stranger = app.register("stranger@example.com", "buyer").await;
    let (status, _) = app.call("GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn uploads_are_owner_scoped() {
    let app = TestApp::new().await;
    let token = app.register("picha@example.com", "seller").await;
    let other = app.register("mwingine@example.com", "seller").await;

    let upload = |content_type: &str, bucket: &str| {
        Request::builder()
            .method("POST")
            .uri(format!("/storage/{}", bucket))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(&b"\x89PNG fake image bytes"[..]))
            .unwrap()
    };

    let (status, body) = app.send(upload("text/plain", "product-images")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "unsupported_media_type");

    let (status, _) = app.send(upload("image/png", "secrets")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, uploaded) = app.send(upload("image/png", "product-images")).await;
    assert_eq!(status, StatusCode::CREATED);
    let key = uploaded["key"].as_str().unwrap().to_string();
    assert!(key.ends_with(".png"));
    assert_eq!(
        uploaded["url"],
        format!("http://localhost:3000/files/product-images/{}", key)
    );

    let public = Request::builder()
        .uri(format!("/files/product-images/{}", key))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(public).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let object = format!("/storage/product-images/{}", key);
    let (status, _) = app.call("DELETE", &object, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call("DELETE", &object, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    // deleting again is fine
    let (status, _) = app.call("DELETE", &object, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn moving_county_clears_the_old_sub_county() {
    let app = TestApp::new().await;
    let token = app.register("akinyi@example.com", "seller").await;

    let (status, _) = app
        .call(
            "PATCH",
            "/profile",
            Some(&token),
            Some(json!({ "county_id": 47, "sub_county_id": 1, "profile_picture_url": "http://x/a.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, profile) = app
        .call(
            "PATCH",
            "/profile",
            Some(&token),
            Some(json!({ "county_id": 32, "sub_county_id": null, "ward_id": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    assert_eq!(profile["county_id"], 32);
    assert!(profile["sub_county_id"].is_null());
    // not named, so kept
    assert_eq!(profile["profile_picture_url"], "http://x/a.png");

    let (status, profile) = app
        .call("PATCH", "/profile", Some(&token), Some(json!({ "profile_picture_url": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(profile["profile_picture_url"].is_null());

    let (_, store) = app
        .call(
            "POST",
            "/stores",
            Some(&token),
            Some(json!({ "name": "Akinyi Farm", "county_id": 47, "sub_county_id": 1 })),
        )
        .await;
    let uri = format!("/stores/{}", store["id"].as_str().unwrap());

    // a sub-county left over from the old county is still rejected
    let (status, _) = app.call("PATCH", &uri, Some(&token), Some(json!({ "county_id": 22 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, store) = app
        .call("PATCH", &uri, Some(&token), Some(json!({ "county_id": 22, "sub_county_id": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store["county_id"], 22);
    assert!(store["sub_county_id"].is_null());
}

fn image_upload(token: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/storage/product-images")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn deleting_a_reupload_keeps_the_first_copy() {
    let app = TestApp::new().await;
    let token = app.register("jepchirchir@example.com", "seller").await;
    let bytes = b"\x89PNG same image".to_vec();

    let (_, first) = app.send(image_upload(&token, bytes.clone())).await;
    let (_, second) = app.send(image_upload(&token, bytes)).await;
    assert_ne!(first["key"], second["key"]);

    let object = format!("/storage/product-images/{}", second["key"].as_str().unwrap());
    let (status, _) = app.call("DELETE", &object, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let public = Request::builder()
        .uri(format!("/files/product-images/{}", first["key"].as_str().unwrap()))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(public).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_and_oversized_uploads_are_rejected() {
    let app = TestApp::new().await;
    let token = app.register("barasa@example.com", "seller").await;

    let (status, body) = app.send(image_upload(&token, Vec::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let too_big = vec![0u8; shamba_api::storage::MAX_UPLOAD_BYTES + 1];
    let (status, body) = app.send(image_upload(&token, too_big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "payload_too_large");

    let exact = vec![0u8; shamba_api::storage::MAX_UPLOAD_BYTES];
    let (status, _) = app.send(image_upload(&token, exact)).await;
    assert_eq!(status, StatusCode::CREATED);
}
