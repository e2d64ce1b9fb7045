use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use invenhub_api::app::{AppServices, build_app};
use invenhub_api::config::AppConfig;
use invenhub_auth::{JwtClaims, Role, UserId};
use invenhub_core::AggregateId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, no background runner.
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            reorder_enabled: false,
            ..AppConfig::default()
        };
        let services = Arc::new(AppServices::build(&config).expect("failed to build services"));
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder, token: Option<&str>) -> (StatusCode, Value) {
        let req = match token {
            Some(t) => req.bearer_auth(t),
            None => req,
        };
        let res = req.send().await.unwrap();
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path)), Some(token)).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).json(&body), token).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(self.client.delete(self.url(path)), Some(token)).await
    }

    /// Register the bootstrap admin and log in.
    async fn admin_token(&self) -> String {
        let (status, _) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "email": "owner@shop.test", "name": "Owner", "password": "owner-password" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login("owner@shop.test", "owner-password").await
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post("/api/auth/login", None, json!({ "email": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn cashier_token(&self, admin: &str) -> String {
        let (status, _) = self
            .post(
                "/api/users",
                Some(admin),
                json!({ "email": "till@shop.test", "name": "Till", "password": "till-password", "role": "cashier" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login("till@shop.test", "till-password").await
    }

    async fn create_product(&self, token: &str, body: Value) -> Value {
        let (status, product) = self.post("/api/products", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        product
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, user_id: UserId, email: &str, role: Role) -> String {
    let claims = JwtClaims::new(user_id, email, role, Utc::now(), ChronoDuration::minutes(10));
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn product_body(sku: &str, initial_stock: i64) -> Value {
    json!({
        "sku": sku,
        "name": format!("{sku} item"),
        "category": "beverages",
        "price": 300,
        "cost": 120,
        "reorder_level": 3,
        "initial_stock": initial_stock,
    })
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn bootstrap_admin_then_registration_is_closed() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let (status, me) = srv.get("/api/auth/me", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["role"], "admin");
    assert_eq!(me["user"]["email"], "owner@shop.test");
    assert!(me["user"].get("password_hash").is_none());

    let (status, _) = srv
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "intruder@shop.test", "name": "X", "password": "whatever123" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_are_checked_against_secret_and_user_directory() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (_, me) = srv.get("/api/auth/me", &admin).await;
    let user_id: UserId = me["user"]["user_id"].as_str().unwrap().parse().unwrap();

    let minted = mint_jwt(JWT_SECRET, user_id, "owner@shop.test", Role::Admin);
    let (status, _) = srv.get("/api/auth/me", &minted).await;
    assert_eq!(status, StatusCode::OK);

    let forged = mint_jwt("other-secret", user_id, "owner@shop.test", Role::Admin);
    let (status, _) = srv.get("/api/auth/me", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stranger = mint_jwt(JWT_SECRET, UserId::generate(), "ghost@shop.test", Role::Admin);
    let (status, _) = srv.get("/api/auth/me", &stranger).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cashier_cannot_create_products_but_can_sell() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let cashier = srv.cashier_token(&admin).await;

    let (status, body) = srv.post("/api/products", Some(&cashier), product_body("TEA", 5)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let product = srv.create_product(&admin, product_body("TEA", 5)).await;
    let (status, sale) = srv
        .post(
            "/api/sales",
            Some(&cashier),
            json!({
                "lines": [{ "product_id": product["product_id"], "quantity": 2 }],
                "discount": 50,
                "payment_method": "mobile_money",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");
    assert_eq!(sale["subtotal"], 600);
    assert_eq!(sale["total"], 550);

    let (status, _) = srv
        .post(&format!("/api/sales/{}/void", sale["sale_id"].as_str().unwrap()), Some(&cashier), json!({ "reason": "oops" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn negative_initial_stock_is_rejected() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let (status, body) = srv.post("/api/products", Some(&admin), product_body("BAD", -3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv.post("/api/products", Some(&admin), json!({ "sku": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn failed_multi_line_sale_leaves_stock_unchanged() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let plenty = srv.create_product(&admin, product_body("RICE", 20)).await;
    let scarce = srv.create_product(&admin, product_body("SALT", 1)).await;

    let (status, body) = srv
        .post(
            "/api/sales",
            Some(&admin),
            json!({
                "lines": [
                    { "product_id": plenty["product_id"], "quantity": 5 },
                    { "product_id": scarce["product_id"], "quantity": 2 },
                ],
                "payment_method": "cash",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (_, rice) = srv
        .get(&format!("/api/products/{}", plenty["product_id"].as_str().unwrap()), &admin)
        .await;
    assert_eq!(rice["on_hand"], 20);

    let (_, sales) = srv.get("/api/sales", &admin).await;
    assert!(sales["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn low_stock_alert_is_raised_once_and_can_be_read() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let product = srv.create_product(&admin, product_body("SODA", 6)).await;
    let id = product["product_id"].as_str().unwrap();

    for delta in [-3, -1] {
        let (status, _) = srv
            .post(&format!("/api/products/{id}/stock"), Some(&admin), json!({ "delta": delta, "reason": "count" }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, notes) = srv.get("/api/notifications", &admin).await;
    let items = notes["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "low_stock");
    assert_eq!(items[0]["on_hand"], 2);
    assert_eq!(notes["unread"], 1);

    let alert_id = items[0]["alert_id"].as_str().unwrap();
    let (status, _) = srv.post(&format!("/api/notifications/{alert_id}/read"), Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, notes) = srv.get("/api/notifications", &admin).await;
    assert_eq!(notes["unread"], 0);
}

#[tokio::test]
async fn deleting_unknown_purchase_order_is_not_found() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let (status, body) = srv
        .delete(&format!("/api/purchase-orders/{}", AggregateId::new()), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = srv.delete("/api/purchase-orders/not-a-uuid", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auto_reorder_then_receive_restocks() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let (status, supplier) = srv
        .post("/api/suppliers", Some(&admin), json!({ "name": "Coast Wholesale", "lead_time_days": 3 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut body = product_body("MAIZE", 2);
    body["supplier_id"] = supplier["supplier_id"].clone();
    body["reorder_quantity"] = json!(24);
    let product = srv.create_product(&admin, body).await;
    let id = product["product_id"].as_str().unwrap();

    let (status, outcome) = srv.post("/api/reorder/run", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["orders"].as_array().unwrap().len(), 1);

    let (_, again) = srv.post("/api/reorder/run", Some(&admin), json!({})).await;
    assert!(again["orders"].as_array().unwrap().is_empty());

    let (_, orders) = srv.get("/api/purchase-orders?status=pending", &admin).await;
    let orders = orders["items"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["origin"], "auto_reorder");
    assert_eq!(orders[0]["lines"][0]["quantity"], 24);

    let order_id = orders[0]["order_id"].as_str().unwrap();
    let (status, received) = srv
        .post(&format!("/api/purchase-orders/{order_id}/receive"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{received}");
    assert_eq!(received["status"], "received");

    let (_, product) = srv.get(&format!("/api/products/{id}"), &admin).await;
    assert_eq!(product["on_hand"], 26);
    assert_eq!(product["stock_status"], "in_stock");

    let (_, summary) = srv.get("/api/analytics/inventory", &admin).await;
    assert_eq!(summary["units_on_hand"], 26);
    assert_eq!(summary["low_stock_count"], 0);
}
