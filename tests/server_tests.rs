//! HTTP-level tests against a real listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use mock_router::config::parse_config;
use mock_router::dispatch::HandlerResult;
use mock_router::{Dispatcher, Module, Payload, Registry, RequestContext, ResponseContext, Route};

mod common;

const ROUTES: &str = r#"
    [timeouts]
    request_ms = 100

    [response.headers]
    x-powered-by = "mock-router"

    [[sources]]
    name = "demo"

    [[sources.routes]]
    path = "GET /hello"
    body = "world"

    [[sources.routes]]
    path = "POST /search/{name}"
    body = { name = "{{name}}", limit = "{{limit}}" }

    [[sources.routes]]
    path = "GET /login"
    headers = { set-cookie = ["session=abc", "theme=dark"] }

    [[sources.routes]]
    path = "GET /slow"
    delay_ms = 400
    body = "eventually"
"#;

#[tokio::test]
async fn test_hello_and_search() {
    let server = common::start_server(ROUTES).await;
    let client = common::client();

    let res = client.get(server.url("/hello")).send().await.expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-powered-by"], "mock-router");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "world");

    let res = client
        .post(server.url("/search/abc"))
        .json(&json!({"limit": 10}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"name": "abc", "limit": 10}));
}

#[tokio::test]
async fn test_errors_are_json() {
    let server = common::start_server(ROUTES).await;
    let client = common::client();

    let res = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NotFound");

    let res = client
        .post(server.url("/search/abc"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_timeout_answers_before_delay() {
    let server = common::start_server(ROUTES).await;
    let start = Instant::now();

    let res = common::client().get(server.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 504);
    assert!(start.elapsed() < Duration::from_millis(400));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Timeout");
}

#[tokio::test]
async fn test_config_update_swaps_routes() {
    let server = common::start_server(ROUTES).await;
    let client = common::client();

    let updated = parse_config(
        r#"
        [[sources]]
        [[sources.routes]]
        path = "GET /fresh"
        body = { fresh = true }
        "#,
    )
    .unwrap();
    server.updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client.get(server.url("/fresh")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let server = common::start_server(ROUTES).await;
    let client = common::client();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let url = server.url(&format!("/search/user{i}"));
        tasks.push(tokio::spawn(async move {
            let mut ok = 0;
            for _ in 0..10 {
                let res = client.post(&url).send().await.unwrap();
                if res.status().is_success() {
                    let body: Value = res.json().await.unwrap();
                    assert_eq!(body["name"], format!("user{i}"));
                    ok += 1;
                }
            }
            ok
        }));
    }

    let mut total = 0;
    for task in tasks {
        total += task.await.unwrap();
    }
    assert_eq!(total, 100);
}

async fn echo_tags(req: RequestContext, res: ResponseContext) -> HandlerResult {
    for tag in req.headers().get_all("x-tag") {
        res.append_header("x-seen", tag);
    }
    Ok(Some(Payload::from(json!({ "tags": req.headers().get_all("x-tag") }))))
}

#[tokio::test]
async fn test_repeated_headers_round_trip() {
    let registry = Registry::default();
    registry.use_source(Module::new().route(Route::new("GET /tags", echo_tags)));
    let server = common::start_with_dispatcher(Dispatcher::new(Arc::new(registry))).await;

    let res = common::client()
        .get(server.url("/tags"))
        .header("x-tag", "a")
        .header("x-tag", "b")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let seen: Vec<&str> = res.headers().get_all("x-seen").iter().map(|v| v.to_str().unwrap()).collect();
    assert_eq!(seen, vec!["a", "b"]);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"tags": ["a", "b"]}));
}

#[tokio::test]
async fn test_configured_route_sends_every_cookie() {
    let server = common::start_server(ROUTES).await;

    let res = common::client().get(server.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let cookies: Vec<&str> = res
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies, vec!["session=abc", "theme=dark"]);
}
