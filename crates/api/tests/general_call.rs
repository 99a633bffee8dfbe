use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use kilim_infra::MemoryCatalogStore;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by the in-memory store, bound to an
        // ephemeral port.
        let store = Arc::new(MemoryCatalogStore::new());
        let app = kilim_api::app::build_app(store, Duration::from_secs(10));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn new_product_envelope(company_id: i64, design_code: &str) -> serde_json::Value {
    let payload = json!({
        "new_product": {
            "company_id": company_id,
            "company_name": "Kilim Works",
            "design_code": design_code,
            "description": "hand knotted",
            "sizes": ["6", "9"],
            "colors": ["red", "blue"],
        }
    });

    json!({
        "op_code": 1,
        "language": "en",
        "username": "weaver",
        "company_id": company_id,
        "company_name": "Kilim Works",
        "payload": payload.to_string(),
    })
}

/// Posts an envelope and returns the reply envelope. The transport always
/// answers 200 once the envelope decodes; outcomes live inside.
async fn call(
    client: &reqwest::Client,
    base_url: &str,
    body: &serde_json::Value,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/v1/call", base_url))
        .json(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_endpoint_answers() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn create_product_replies_with_the_company_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // First product
    let reply = call(&client, &srv.base_url, &new_product_envelope(7, "KL-100")).await;
    assert_eq!(reply["status_code"], 200);
    assert_eq!(reply["status_message"], "ok");

    let listing: serde_json::Value =
        serde_json::from_str(reply["payload"].as_str().unwrap()).unwrap();
    let products = listing["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["design_code"], "KL-100");
    assert_eq!(products[0]["company_id"], 7);
    assert_eq!(products[0]["sizes"], json!(["6", "9"]));
    assert_eq!(products[0]["colors"], json!(["red", "blue"]));

    // Second product; the reply carries the whole company listing.
    let reply = call(&client, &srv.base_url, &new_product_envelope(7, "KL-200")).await;
    assert_eq!(reply["status_code"], 200);

    let listing: serde_json::Value =
        serde_json::from_str(reply["payload"].as_str().unwrap()).unwrap();
    assert_eq!(listing["products"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unwired_opcode_reports_not_implemented() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let reply = call(
        &client,
        &srv.base_url,
        &json!({ "op_code": 99, "payload": "{}" }),
    )
    .await;
    assert_eq!(reply["status_code"], 501);
    assert_eq!(reply["status_message"], "not_implemented");
    assert_eq!(reply["payload"], "{}");

    // Missing op_code decodes to zero, which is not wired either.
    let reply = call(&client, &srv.base_url, &json!({ "payload": "{}" })).await;
    assert_eq!(reply["status_code"], 501);
    assert_eq!(reply["status_message"], "not_implemented");
}

#[tokio::test]
async fn malformed_payload_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let reply = call(
        &client,
        &srv.base_url,
        &json!({ "op_code": 1, "payload": "not json" }),
    )
    .await;
    assert_eq!(reply["status_code"], 400);
    assert_eq!(reply["status_message"], "bad_request");
    assert_eq!(reply["payload"], "{}");
}

#[tokio::test]
async fn validation_failures_travel_in_the_envelope() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Zero company id in the payload.
    let reply = call(&client, &srv.base_url, &new_product_envelope(0, "KL-100")).await;
    assert_eq!(reply["status_code"], 400);
    assert_eq!(reply["status_message"], "invalid_company");
    assert_eq!(reply["payload"], "{}");

    // Re-using a design code within the same company.
    let reply = call(&client, &srv.base_url, &new_product_envelope(7, "KL-100")).await;
    assert_eq!(reply["status_code"], 200);
    let reply = call(&client, &srv.base_url, &new_product_envelope(7, "KL-100")).await;
    assert_eq!(reply["status_code"], 409);
    assert_eq!(reply["status_message"], "duplicate_key");
}
