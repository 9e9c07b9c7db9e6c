use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over the in-memory store, on an ephemeral port.
        let app = storefront_api::app::build_in_memory_app();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

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

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        (status, value)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::DELETE, path, None).await
    }

    async fn create_item(&self, sku: &str, stock: i64, price: &str) -> String {
        let (status, body) = self
            .post(
                "/catalog/items",
                json!({ "name": sku, "sku": sku, "initial_stock": stock, "price": price }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_kit(&self, name: &str) -> String {
        let (status, body) = self.post("/kits", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "create kit: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn stock_of(&self, item_id: &str) -> i64 {
        let (_, body) = self.get(&format!("/catalog/items/{item_id}")).await;
        body["stock_quantity"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_the_store() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "in_memory");
}

#[tokio::test]
async fn kit_lifecycle_reserves_and_releases_stock() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("A", 100, "100.00").await;
    let kit = srv.create_kit("Pair").await;

    let (status, entry) = srv
        .post(
            &format!("/kits/{kit}/components"),
            json!({ "catalog_item_id": item, "quantity_per_kit": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "add component: {entry}");

    let (status, body) = srv
        .put(&format!("/kits/{kit}/stock"), json!({ "target_stock_quantity": 10 }))
        .await;
    assert_eq!(status, StatusCode::OK, "set stock: {body}");
    assert_eq!(srv.stock_of(&item).await, 80);

    let (status, overview) = srv.get(&format!("/kits/{kit}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["status"], "active");
    assert_eq!(overview["capacity"]["kit_surplus_capacity"], 40);
    assert_eq!(overview["capacity"]["max_possible_stock"], 50);
    assert_eq!(overview["kit"]["sell_price"], "200.00");

    let (_, view) = srv.get(&format!("/catalog/items/{item}")).await;
    assert_eq!(view["allocated_in_kits"], 20);

    let (status, body) = srv
        .put(&format!("/kits/{kit}/stock"), json!({ "target_stock_quantity": 60 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "capacity_exceeded");
    assert_eq!(body["details"]["available"], 80);

    let (status, _) = srv.delete(&format!("/kits/{kit}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(srv.stock_of(&item).await, 100);

    let (status, _) = srv.delete(&format!("/kits/{kit}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = srv.get(&format!("/kits/{kit}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn discount_drives_sell_price() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("A", 10, "100.00").await;
    let kit = srv.create_kit("Pair").await;
    srv.post(
        &format!("/kits/{kit}/components"),
        json!({ "catalog_item_id": item, "quantity_per_kit": 2 }),
    )
    .await;

    let (status, body) = srv
        .put(&format!("/kits/{kit}/discount"), json!({ "discount_percent": "20" }))
        .await;
    assert_eq!(status, StatusCode::OK, "discount: {body}");
    assert_eq!(body["sell_price"], "160.00");

    let (status, body) = srv
        .put(&format!("/kits/{kit}/discount"), json!({ "discount_percent": "120" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn validation_and_lookup_errors_map_to_status_codes() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("A", 5, "1.00").await;
    let kit = srv.create_kit("Kit").await;

    let (status, body) = srv
        .post(
            &format!("/kits/{kit}/components"),
            json!({ "catalog_item_id": item, "quantity_per_kit": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv.get("/kits/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let missing = "01890f3e-0000-7000-8000-000000000000";
    let (status, _) = srv.get(&format!("/kits/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv
        .put(&format!("/kits/{kit}/stock"), json!({ "target_stock_quantity": 1 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let (status, body) = srv
        .post("/catalog/items", json!({ "name": "B", "sku": "B", "price": "-1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv.post("/catalog/items", json!({ "name": "A2", "sku": "A", "price": "1" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn insufficient_stock_blocks_components_and_sales() {
    let srv = TestServer::spawn().await;
    let a = srv.create_item("A", 10, "1.00").await;
    let b = srv.create_item("B", 3, "1.00").await;
    let kit = srv.create_kit("Kit").await;
    srv.post(
        &format!("/kits/{kit}/components"),
        json!({ "catalog_item_id": a, "quantity_per_kit": 1 }),
    )
    .await;
    srv.put(&format!("/kits/{kit}/stock"), json!({ "target_stock_quantity": 5 }))
        .await;

    let (status, body) = srv
        .post(
            &format!("/kits/{kit}/components"),
            json!({ "catalog_item_id": b, "quantity_per_kit": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"]["requested"], 5);
    assert_eq!(body["details"]["available"], 3);

    let (status, body) = srv.post(&format!("/catalog/items/{a}/stock"), json!({ "delta": -6 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) = srv.post(&format!("/catalog/items/{a}/stock"), json!({ "delta": -5 })).await;
    assert_eq!(status, StatusCode::OK, "sale: {body}");
    assert_eq!(body["stock_quantity"], 0);
}

#[tokio::test]
async fn removing_a_component_twice_is_fine() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("A", 10, "2.50").await;
    let kit = srv.create_kit("Kit").await;
    let (_, entry) = srv
        .post(
            &format!("/kits/{kit}/components"),
            json!({ "catalog_item_id": item, "quantity_per_kit": 2 }),
        )
        .await;
    let entry_id = entry["id"].as_str().unwrap().to_string();
    srv.put(&format!("/kits/{kit}/stock"), json!({ "target_stock_quantity": 3 }))
        .await;
    assert_eq!(srv.stock_of(&item).await, 4);

    let (status, _) = srv.delete(&format!("/kits/components/{entry_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(srv.stock_of(&item).await, 10);

    let (status, _) = srv.delete(&format!("/kits/components/{entry_id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(srv.stock_of(&item).await, 10);

    let (_, kits) = srv.get("/kits").await;
    assert_eq!(kits[0]["status"], "draft");
    assert_eq!(kits[0]["component_count"], 0);
}

#[tokio::test]
async fn manual_pricing_and_refresh() {
    let srv = TestServer::spawn().await;
    let item = srv.create_item("A", 10, "10.00").await;
    let kit = srv.create_kit("Kit").await;
    srv.post(
        &format!("/kits/{kit}/components"),
        json!({ "catalog_item_id": item, "quantity_per_kit": 3 }),
    )
    .await;

    let (status, body) = srv
        .put(&format!("/kits/{kit}/pricing"), json!({ "sell_price": "25" }))
        .await;
    assert_eq!(status, StatusCode::OK, "override: {body}");
    assert_eq!(body["sell_price"], "25.00");
    assert_eq!(body["alt_sell_price"], "25.00");

    let (_, overview) = srv.get(&format!("/kits/{kit}")).await;
    assert_eq!(overview["pricing_in_sync"], false);
    assert_eq!(overview["suggested_pricing"]["sell_price"], "30.00");

    let (status, body) = srv.post(&format!("/kits/{kit}/pricing/refresh"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sell_price"], "30.00");
}
