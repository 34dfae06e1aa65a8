//! HTTP tests against the full router with an in-memory store and a fake
//! payment gateway.

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use shop_api::{create_router, AppConfig, AppState};
use shop_core::{
    Collection, Currency, DocumentStore, MemoryStore, PaymentGateway, PaymentIntent,
    ShopResult, Storage, TokenService,
};
use std::sync::{Arc, Mutex};

const SECRET: &str = "test-secret";

/// Records every amount it is asked to charge
#[derive(Default)]
struct FakeGateway {
    amounts: Mutex<Vec<i64>>,
}

impl FakeGateway {
    fn amounts(&self) -> Vec<i64> {
        self.amounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, amount: i64, currency: Currency) -> ShopResult<PaymentIntent> {
        self.amounts.lock().unwrap().push(amount);
        Ok(PaymentIntent {
            id: "pi_fake".to_string(),
            client_secret: format!("pi_fake_secret_{}", amount),
            amount,
            currency,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

struct TestApp {
    server: TestServer,
    state: AppState,
    store: Arc<MemoryStore>,
    gateway: Arc<FakeGateway>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(FakeGateway::default());
        let tokens = TokenService::new(SECRET, chrono::Duration::hours(1)).unwrap();
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let state = AppState::from_parts(
            Storage::new(store.clone()),
            tokens,
            gateway.clone(),
            config,
        );
        let server = TestServer::new(create_router(state.clone())).unwrap();

        Self {
            server,
            state,
            store,
            gateway,
        }
    }

    fn token(&self, email: &str) -> String {
        self.state.tokens.issue(email).unwrap()
    }

    async fn user(&self, email: &str) -> String {
        self.state
            .storage
            .upsert_user(email, Default::default())
            .await
            .unwrap();
        self.token(email)
    }

    async fn admin(&self, email: &str) -> String {
        let token = self.user(email).await;
        self.state.storage.make_admin(email).await.unwrap();
        token
    }

    async fn purchase_for(&self, email: &str) -> String {
        let response = self
            .server
            .post("/product")
            .json(&json!({
                "productId": "p1",
                "productName": "Mug",
                "userEmail": email,
                "quantity": 2,
                "price": 9.5
            }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["insertedId"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::new();

    let response = app.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Lukas server is running");

    let health = app.server.get("/health").await.json::<Value>();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["store"], "memory");
}

#[tokio::test]
async fn test_authentication_gate() {
    let app = TestApp::new();

    // No header
    let response = app.server.get("/user").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 401);

    // Not a bearer credential
    let response = app
        .server
        .get("/user")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // Garbage token
    let response = bearer(app.server.get("/user"), "not.a.token").await;
    response.assert_status(StatusCode::FORBIDDEN);

    // Signed with another secret
    let foreign = TokenService::new("other-secret", chrono::Duration::hours(1))
        .unwrap()
        .issue("a@x.com")
        .unwrap();
    bearer(app.server.get("/user"), &foreign)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Expired
    let expired = app
        .state
        .tokens
        .issue_at("a@x.com", chrono::Utc::now() - chrono::Duration::hours(2))
        .unwrap();
    bearer(app.server.get("/user"), &expired)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Valid
    let token = app.token("a@x.com");
    bearer(app.server.get("/user"), &token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_user_upsert_is_idempotent_and_issues_token() {
    let app = TestApp::new();

    let first = app
        .server
        .put("/user/new@x.com")
        .json(&json!({ "name": "New" }))
        .await;
    first.assert_status_ok();
    let body = first.json::<Value>();
    assert_eq!(body["result"]["matchedCount"], 0);
    assert!(body["result"]["upsertedId"].is_string());

    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(app.state.tokens.verify(&token).unwrap().email, "new@x.com");

    let second = app
        .server
        .put("/user/new@x.com")
        .json(&json!({ "name": "New" }))
        .await
        .json::<Value>();
    assert_eq!(second["result"]["matchedCount"], 1);
    assert_eq!(second["result"]["modifiedCount"], 0);

    let users = bearer(app.server.get("/user"), &token).await.json::<Value>();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "new@x.com");
    assert_eq!(users[0]["name"], "New");
}

#[tokio::test]
async fn test_user_upsert_cannot_set_role() {
    let app = TestApp::new();

    let response = app
        .server
        .put("/user/sneaky@x.com")
        .json(&json!({ "role": "admin" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("role"));

    let status = app.server.get("/admin/sneaky@x.com").await.json::<Value>();
    assert_eq!(status["admin"], false);
}

#[tokio::test]
async fn test_admin_gate() {
    let app = TestApp::new();
    let user = app.user("user@x.com").await;
    let admin = app.admin("admin@x.com").await;
    let stranger = app.token("ghost@x.com");

    bearer(app.server.get("/purchases"), &user)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(app.server.get("/purchases"), &stranger)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get("/purchases")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    bearer(app.server.get("/purchases"), &admin)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_admin_status_and_promotion() {
    let app = TestApp::new();
    let admin = app.admin("admin@x.com").await;
    app.user("user@x.com").await;

    let status = app.server.get("/admin/user@x.com").await.json::<Value>();
    assert_eq!(status["admin"], false);
    let status = app.server.get("/admin/nobody@x.com").await.json::<Value>();
    assert_eq!(status["admin"], false);

    let response = bearer(app.server.put("/user/admin/user@x.com"), &admin).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["modifiedCount"], 1);

    let status = app.server.get("/admin/user@x.com").await.json::<Value>();
    assert_eq!(status["admin"], true);

    bearer(app.server.put("/user/admin/nobody@x.com"), &admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();
    let user = app.user("user@x.com").await;
    let admin = app.admin("admin@x.com").await;

    // Upload requires a token
    let new_product = json!({ "name": "Mug", "price": 9.5, "available": 10 });
    app.server
        .post("/uploadProduct")
        .json(&new_product)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let inserted = bearer(app.server.post("/uploadProduct"), &user)
        .json(&new_product)
        .await
        .json::<Value>();
    let id = inserted["insertedId"].as_str().unwrap().to_string();

    let products = app.server.get("/product").await.json::<Value>();
    assert_eq!(products.as_array().unwrap().len(), 1);

    let product = bearer(app.server.get(&format!("/product/{}", id)), &user)
        .await
        .json::<Value>();
    assert_eq!(product["name"], "Mug");
    assert_eq!(product["_id"], id.as_str());

    // Restock
    let restocked = app
        .server
        .put(&format!("/product/{}", id))
        .json(&json!({ "available": 3 }))
        .await
        .json::<Value>();
    assert_eq!(restocked["matchedCount"], 1);
    let product = bearer(app.server.get(&format!("/product/{}", id)), &user)
        .await
        .json::<Value>();
    assert_eq!(product["available"], 3);

    // Only admins delete
    bearer(app.server.delete(&format!("/product/{}", id)), &user)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let deleted = bearer(app.server.delete(&format!("/product/{}", id)), &admin)
        .await
        .json::<Value>();
    assert_eq!(deleted["deletedCount"], 1);

    bearer(app.server.get(&format!("/product/{}", id)), &user)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_restock_upserts_unknown_product() {
    let app = TestApp::new();

    for _ in 0..2 {
        app.server
            .put("/product/fresh")
            .json(&json!({ "available": 7 }))
            .await
            .assert_status_ok();
    }

    let products = app.server.get("/product").await.json::<Value>();
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["_id"], "fresh");
    assert_eq!(products[0]["available"], 7);
}

#[tokio::test]
async fn test_purchase_and_payment_confirmation() {
    let app = TestApp::new();
    let buyer = app.user("buyer@x.com").await;
    let id = app.purchase_for("buyer@x.com").await;

    let mine = bearer(app.server.get("/purcahses"), &buyer)
        .add_query_param("email", "buyer@x.com")
        .await
        .json::<Value>();
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["total"], 19.0);
    assert_eq!(mine[0]["status"], "pending");
    assert_eq!(mine[0]["paid"], false);

    let confirmed = app
        .server
        .patch(&format!("/purcahses/{}", id))
        .json(&json!({
            "productId": "p1",
            "product": { "_id": "p1", "name": "Mug", "price": 9.5, "available": 8 },
            "status": "paid",
            "transactionId": "tx_1"
        }))
        .await;
    confirmed.assert_status_ok();
    let confirmed = confirmed.json::<Value>();
    assert_eq!(confirmed["purchase"]["modifiedCount"], 1);

    let purchase = bearer(app.server.get(&format!("/purcahses/{}", id)), &buyer)
        .await
        .json::<Value>();
    assert_eq!(purchase["paid"], true);
    assert_eq!(purchase["status"], "paid");
    assert_eq!(purchase["transactionId"], "tx_1");

    let payments = app.store.find(Collection::Payments, None).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["purchaseId"], id.as_str());
    assert_eq!(payments[0]["product"]["name"], "Mug");
    assert_eq!(payments[0]["product"]["price"], 9.5);
}

#[tokio::test]
async fn test_payment_confirmation_needs_product_object() {
    let app = TestApp::new();
    let id = app.purchase_for("buyer@x.com").await;

    let response = app
        .server
        .patch(&format!("/purcahses/{}", id))
        .json(&json!({
            "productId": "p1",
            "product": "Mug",
            "status": "paid",
            "transactionId": "tx_1"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 400);

    assert!(app
        .store
        .find(Collection::Payments, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = TestApp::new();
    let token = app.user("buyer@x.com").await;

    // Wrong type
    let response = bearer(app.server.post("/create-payment-intent"), &token)
        .json(&json!({ "payPrice": "lots" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 400);

    // Not JSON at all
    let response = app
        .server
        .put("/product/p1")
        .text("available=3")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 400);

    assert!(app.gateway.amounts().is_empty());
}

#[tokio::test]
async fn test_confirming_missing_purchase_writes_nothing() {
    let app = TestApp::new();

    app.server
        .patch("/purcahses/missing")
        .json(&json!({
            "productId": "p1",
            "product": { "_id": "p1", "name": "Mug", "price": 9.5, "available": 8 },
            "status": "paid",
            "transactionId": "tx_1"
        }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert!(app
        .store
        .find(Collection::Payments, None)
        .await
        .unwrap()
        .is_empty());
    assert!(app
        .store
        .find(Collection::Purchases, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_purchase_ownership() {
    let app = TestApp::new();
    let buyer = app.user("buyer@x.com").await;
    let other = app.user("other@x.com").await;
    let admin = app.admin("admin@x.com").await;
    let id = app.purchase_for("buyer@x.com").await;

    // Listing someone else's purchases
    bearer(app.server.get("/purcahses"), &other)
        .add_query_param("email", "buyer@x.com")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(app.server.get(&format!("/purcahses/{}", id)), &other)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(app.server.delete(&format!("/purcahses/{}", id)), &other)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(app.server.get(&format!("/purcahses/{}", id)), &admin)
        .await
        .assert_status_ok();

    let deleted = bearer(app.server.delete(&format!("/purcahses/{}", id)), &buyer)
        .await
        .json::<Value>();
    assert_eq!(deleted["deletedCount"], 1);

    bearer(app.server.get(&format!("/purcahses/{}", id)), &buyer)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_updates_purchase_status() {
    let app = TestApp::new();
    let admin = app.admin("admin@x.com").await;
    let id = app.purchase_for("buyer@x.com").await;

    let all = bearer(app.server.get("/purchases"), &admin)
        .await
        .json::<Value>();
    assert_eq!(all.as_array().unwrap().len(), 1);

    let updated = bearer(app.server.put(&format!("/purchases/{}", id)), &admin)
        .json(&json!({ "status": "shipped" }))
        .await
        .json::<Value>();
    assert_eq!(updated["modifiedCount"], 1);

    let purchase = bearer(app.server.get(&format!("/purcahses/{}", id)), &admin)
        .await
        .json::<Value>();
    assert_eq!(purchase["status"], "shipped");

    bearer(app.server.put("/purchases/missing"), &admin)
        .json(&json!({ "status": "shipped" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reviews_take_author_from_token() {
    let app = TestApp::new();
    let token = app.user("fan@x.com").await;

    app.server
        .post("/review")
        .json(&json!({ "comment": "Great", "rating": 5 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    bearer(app.server.post("/review"), &token)
        .json(&json!({ "name": "Fan", "comment": "Great", "rating": 5 }))
        .await
        .assert_status_ok();

    bearer(app.server.post("/review"), &token)
        .json(&json!({ "comment": "Too much", "rating": 6 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let reviews = app.server.get("/review").await.json::<Value>();
    let reviews = reviews.as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["email"], "fan@x.com");
    assert_eq!(reviews[0]["rating"], 5);
}

#[tokio::test]
async fn test_profiles() {
    let app = TestApp::new();
    let owner = app.user("me@x.com").await;
    let other = app.user("you@x.com").await;
    let admin = app.admin("admin@x.com").await;

    bearer(app.server.get("/userProfile/me@x.com"), &owner)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    bearer(app.server.put("/userProfile/me@x.com"), &owner)
        .json(&json!({ "name": "Me", "phone": "123" }))
        .await
        .assert_status_ok();

    bearer(app.server.put("/userProfile/me@x.com"), &other)
        .json(&json!({ "name": "Hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(app.server.put("/userProfile/me@x.com"), &admin)
        .json(&json!({ "name": "Me", "address": "Main St" }))
        .await
        .assert_status_ok();

    let profile = bearer(app.server.get("/userProfile/me@x.com"), &other)
        .await
        .json::<Value>();
    assert_eq!(profile["email"], "me@x.com");
    assert_eq!(profile["address"], "Main St");
    // Replaced wholesale
    assert!(profile["phone"].is_null());
}

#[tokio::test]
async fn test_payment_intent_rounds_to_cents() {
    let app = TestApp::new();
    let token = app.user("buyer@x.com").await;

    app.server
        .post("/create-payment-intent")
        .json(&json!({ "payPrice": 19.99 }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = bearer(app.server.post("/create-payment-intent"), &token)
        .json(&json!({ "payPrice": 19.99 }))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["clientSecret"],
        "pi_fake_secret_1999"
    );

    bearer(app.server.post("/create-payment-intent"), &token)
        .json(&json!({ "payPrice": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(app.gateway.amounts(), vec![1999]);
}
