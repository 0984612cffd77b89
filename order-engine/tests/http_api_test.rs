//! HTTP 接口测试 - 通过 Router::oneshot 走完整的提取器/错误映射链路

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use order_engine::auth::Role;
use order_engine::{Config, OrderStorage, Server, ServerState};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    server: Server,
    state: ServerState,
    _dir: tempfile::TempDir,
}

fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0).unwrap();
    let storage = OrderStorage::open(config.db_path()).unwrap();
    let (state, tasks) = ServerState::with_storage(config.clone(), storage);
    let server = Server::with_state(config, state.clone(), tasks);
    TestApp {
        server,
        state,
        _dir: dir,
    }
}

impl TestApp {
    fn token(&self, uid: &str, role: Role) -> String {
        self.state
            .jwt_service()
            .generate_token(uid, Some("ann@example.com"), true, role)
            .unwrap()
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let req = req.body(Body::from(body.to_string())).unwrap();

        let resp = self.server.router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_order_lifecycle_over_http() {
    let app = app();
    let admin = app.token("admin-1", Role::Admin);
    let customer = app.token("user-1", Role::Customer);

    let (status, _) = app
        .call(
            "PUT",
            "/api/products/A",
            Some(&admin),
            json!({"name": "Widget", "price": "100", "stock": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // 客户端传入的价格被忽略
    let (status, body) = app
        .call(
            "POST",
            "/api/orders",
            Some(&customer),
            json!({"items": [{"product_id": "A", "quantity": 2, "price": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["total"], "200");

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/orders/{}/payments", order_id),
            Some(&admin),
            json!({"amount": "250"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 5007);

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/orders/{}/payments", order_id),
            Some(&admin),
            json!({"amount": "200"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, body) = app
        .call("GET", &format!("/api/orders/{}", order_id), Some(&customer), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], "0");
}

#[tokio::test]
async fn test_auth_rules_over_http() {
    let app = app();
    let customer = app.token("user-1", Role::Customer);

    let (status, _) = app.call("GET", "/api/orders", None, Value::Null).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call("GET", "/api/orders", Some(&customer), Value::Null).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2003);

    let (status, _) = app
        .call("GET", "/api/orders", Some("not-a-jwt"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 游客下单缺少联系方式
    let (status, body) = app
        .call(
            "POST",
            "/api/orders",
            None,
            json!({"items": [{"product_id": "A", "quantity": 1}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4011);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app();
    let (status, body) = app.call("GET", "/api/health", None, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "ok");
}
