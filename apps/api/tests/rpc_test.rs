//! RPC surface tests: every route driven through the router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tally_api::{router, AppState};
use tally_core::{Money, UserRole};
use tally_db::{Database, DbConfig, EngineConfig, NewProduct};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    db: Database,
    cashier: String,
}

async fn setup() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let cashier = db
        .users()
        .insert("kasir1", "Kasir Satu", UserRole::Cashier)
        .await
        .unwrap()
        .id;
    let state = Arc::new(AppState::new(db.clone(), EngineConfig::default()));

    TestApp {
        app: router(state),
        db,
        cashier,
    }
}

impl TestApp {
    async fn product(&self, name: &str, cents: i64, stock: i64) -> String {
        self.db
            .products()
            .insert(&NewProduct::new(name, Money::from_cents(cents), stock))
            .await
            .unwrap()
            .id
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn sale(&self, lines: Value) -> Value {
        json!({
            "user_id": self.cashier,
            "lines": lines,
            "transaction_discount": 3,
            "payment_method": "cash",
        })
    }
}

fn money(value: &Value) -> f64 {
    value.as_f64().unwrap()
}

#[tokio::test]
async fn health_reports_database() {
    let app = setup().await;
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn create_get_and_items() {
    let app = setup().await;
    let kopi = app.product("Kopi Susu", 1999, 10).await;
    let roti = app.product("Roti Tawar", 1899, 10).await;

    let (status, txn) = app
        .post(
            "/rpc/transactions.create",
            app.sale(json!([
                { "product_id": kopi, "quantity": 1 },
                { "product_id": roti, "quantity": 1, "discount": 0 },
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{txn}");
    assert_eq!(money(&txn["subtotal"]), 38.98);
    assert_eq!(money(&txn["discount_amount"]), 3.0);
    assert_eq!(money(&txn["total_amount"]), 35.98);
    assert_eq!(txn["status"], "completed");
    assert!(txn["code"].as_str().unwrap().starts_with("TRX-"));

    let id = txn["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/rpc/transactions.get?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["code"], txn["code"]);

    let (status, items) = app.get(&format!("/rpc/transactions.items?id={id}")).await;
    assert_eq!(status, StatusCode::OK);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["product_name"], "Kopi Susu");
    assert_eq!(money(&items[0]["unit_price"]), 19.99);
}

#[tokio::test]
async fn cancel_twice_is_invalid_state() {
    let app = setup().await;
    let teh = app.product("Teh Botol", 500, 5).await;

    let (_, txn) = app
        .post(
            "/rpc/transactions.create",
            app.sale(json!([{ "product_id": teh, "quantity": 2 }])),
        )
        .await;
    let id = txn["id"].clone();

    let (status, cancelled) = app
        .post("/rpc/transactions.cancel", json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, err) = app
        .post("/rpc/transactions.cancel", json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_STATE");
    assert!(err["message"].as_str().unwrap().contains("Cannot cancel"));

    let (status, err) = app
        .post("/rpc/transactions.refund", json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_STATE");

    let stock = app.db.products().get(&teh).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, 5);
}

#[tokio::test]
async fn refund_restores_stock() {
    let app = setup().await;
    let teh = app.product("Teh Botol", 500, 5).await;

    let (_, txn) = app
        .post(
            "/rpc/transactions.create",
            app.sale(json!([{ "product_id": teh, "quantity": 5 }])),
        )
        .await;

    let (status, refunded) = app
        .post("/rpc/transactions.refund", json!({ "id": txn["id"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refunded["status"], "refunded");

    let stock = app.db.products().get(&teh).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, 5);
}

#[tokio::test]
async fn insufficient_stock_is_conflict() {
    let app = setup().await;
    let beras = app.product("Beras 5kg", 7450, 2).await;

    let (status, err) = app
        .post(
            "/rpc/transactions.create",
            app.sale(json!([{ "product_id": beras, "quantity": 3 }])),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INSUFFICIENT_STOCK");
    assert!(err["message"].as_str().unwrap().contains("Beras 5kg"));
}

#[tokio::test]
async fn validation_errors_are_bad_request() {
    let app = setup().await;
    let teh = app.product("Teh Botol", 500, 5).await;

    let (status, err) = app.post("/rpc/transactions.create", app.sale(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, err) = app
        .post(
            "/rpc/transactions.create",
            app.sale(json!([{ "product_id": teh, "quantity": 0 }])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    // malformed body still gets the JSON error shape
    let (status, err) = app
        .post("/rpc/transactions.create", json!({ "lines": "nope" }))
        .await;
    assert!(status.is_client_error());
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = setup().await;
    let missing = "00000000-0000-4000-8000-000000000000";

    let (status, err) = app.get(&format!("/rpc/transactions.get?id={missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");

    let (status, _) = app
        .post("/rpc/transactions.refund", json!({ "id": missing }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, err) = app
        .post(
            "/rpc/inventory.adjust",
            json!({ "product_id": missing, "delta": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn list_returns_page_newest_first() {
    let app = setup().await;
    let teh = app.product("Teh Botol", 500, 50).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let (_, txn) = app
            .post(
                "/rpc/transactions.create",
                app.sale(json!([{ "product_id": teh, "quantity": 1 }])),
            )
            .await;
        ids.push(txn["id"].clone());
    }
    app.post("/rpc/transactions.cancel", json!({ "id": ids[1] }))
        .await;

    let (status, page) = app.get("/rpc/transactions.list?limit=2").await;
    assert_eq!(status, StatusCode::OK, "{page}");
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["id"], ids[2]);

    let (_, page) = app.get("/rpc/transactions.list?status=cancelled").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], ids[1]);

    // without a limit the page is every row and `limit` echoes its size
    let (_, page) = app.get("/rpc/transactions.list").await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 3);

    let (status, err) = app.get("/rpc/transactions.list?status=lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn adjust_and_low_stock() {
    let app = setup().await;
    let gula = app.product("Gula Pasir", 1700, 4).await;
    let kopi = app.product("Kopi Susu", 1999, 20).await;

    let (status, level) = app
        .post(
            "/rpc/inventory.adjust",
            json!({ "product_id": gula, "delta": -10 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(level["stock_quantity"], 0);

    let (status, low) = app.get("/rpc/inventory.lowStock").await;
    assert_eq!(status, StatusCode::OK);
    let low: Vec<&str> = low
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert!(low.contains(&gula.as_str()));
    assert!(!low.contains(&kopi.as_str()));

    let (_, level) = app
        .post(
            "/rpc/inventory.adjust",
            json!({ "product_id": gula, "delta": 6 }),
        )
        .await;
    assert_eq!(level["stock_quantity"], 6);
}

#[tokio::test]
async fn oversized_amounts_are_bad_request() {
    let app = setup().await;
    let teh = app.product("Teh Botol", 500, 5).await;

    let mut req = app.sale(json!([{ "product_id": teh, "quantity": 1 }]));
    req["transaction_discount"] = json!(5e28);
    let (status, err) = app.post("/rpc/transactions.create", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{err}");
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let req = app.sale(json!([
        { "product_id": teh, "quantity": 1, "discount": "1000000000000" }
    ]));
    let (status, err) = app.post("/rpc/transactions.create", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let stock = app.db.products().get(&teh).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, 5);
}

#[tokio::test]
async fn overflowing_adjustment_is_bad_request() {
    let app = setup().await;
    let gula = app.product("Gula Pasir", 1700, 4).await;

    let (status, err) = app
        .post(
            "/rpc/inventory.adjust",
            json!({ "product_id": gula, "delta": i64::MAX }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{err}");
    assert_eq!(err["code"], "VALIDATION_ERROR");
    assert!(err["message"].as_str().unwrap().starts_with("delta must be between"));

    let stock = app.db.products().get(&gula).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, 4);
}
