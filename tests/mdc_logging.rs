//! End-to-end: requests over HTTP, log events captured with their context.

use http::{Method, StatusCode};
use indexmap::IndexMap;
use mdclog::middleware::mdc::{KEY_MDC_LOGGING, Operation, Param};
use mdclog::{Request, Response, Router};
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;

mod common;

use common::{Capture, spawn_server};

const CONTROLLER: &str = "HelloWorldController";

async fn hello(req: Request) -> Response {
    tracing::info!("testing get {}", req.path());
    let name = req.query("name").unwrap_or("null");
    Response::json(json!({ "content": format!("Hello, {name}!") }).to_string())
}

async fn hello_post(req: Request) -> Response {
    let greeting: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Response::status(StatusCode::BAD_REQUEST),
    };
    tracing::info!("testing post helloworld");
    let name = greeting["content"].as_str().unwrap_or("null");
    Response::json(json!({ "content": format!("Hello, {name}!") }).to_string())
}

async fn conflicting(_req: Request) -> Result<Response, StatusCode> {
    tracing::info!("about to fail");
    Err(StatusCode::CONFLICT)
}

fn app() -> Router {
    Router::new()
        .on(Method::GET, "/hello-world-noTag", Operation::new(CONTROLLER, "say_hello_no_tag")
            .param(Param::query("name"))
            .param(Param::query("test1"))
            .wrap(hello))
        .on(Method::GET, "/hello-world-1tag", Operation::new(CONTROLLER, "say_hello_one_tag")
            .param(Param::query("name").mdc("testKey"))
            .param(Param::query("test1"))
            .wrap(hello))
        .on(Method::GET, "/hello-world-2tag", Operation::new(CONTROLLER, "say_hello_two_tags")
            .param(Param::query("name").mdc("testKey"))
            .param(Param::query("title").mdc("AnotherKey"))
            .wrap(hello))
        .on(Method::POST, "/helloworld", Operation::new(CONTROLLER, "say_hello_post")
            .param(Param::json_body().mdc_path("testKey", "$.id"))
            .wrap(hello_post))
        .on(Method::GET, "/users/{id}/conflict", Operation::new("UserController", "conflict")
            .param(Param::path("id").mdc("userId"))
            .wrap(conflicting))
        .on(Method::GET, "/traced", Operation::new(CONTROLLER, "say_hello_traced")
            .param(Param::header("x-request-id").mdc("requestId"))
            .param(Param::query("name").mdc("testKey"))
            .wrap(hello))
        .on(Method::GET, "/plain", hello)
}

fn mdc(rendered: &str) -> Option<IndexMap<String, String>> {
    Some(IndexMap::from([(KEY_MDC_LOGGING.to_owned(), rendered.to_owned())]))
}

fn empty() -> Option<IndexMap<String, String>> {
    Some(IndexMap::new())
}

/// Runs `f` against a fresh server with events from this crate captured.
async fn with_server<F, Fut>(f: F) -> Capture
where
    F: FnOnce(String) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let capture = Capture::new(module_path!());
    let _guard = tracing::subscriber::set_default(
        tracing_subscriber::registry().with(capture.clone()),
    );
    let server = spawn_server(app()).await;
    f(server.base.clone()).await;
    capture
}

#[tokio::test]
async fn no_markers_log_with_empty_context() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/hello-world-noTag?name=Stranger")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["content"], "Hello, Stranger!");
    }).await;

    let events = capture.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].mdc, empty());
}

#[tokio::test]
async fn one_marker_publishes_its_value() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/hello-world-1tag?name=pepe")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    let events = capture.events();
    assert_eq!(events[0].message, "testing get /hello-world-1tag");
    assert_eq!(events[0].mdc, mdc("{testKey=pepe}"));
}

#[tokio::test]
async fn one_marker_without_value_publishes_nothing() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/hello-world-1tag")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    assert_eq!(capture.events()[0].mdc, empty());
}

#[tokio::test]
async fn two_markers_keep_declaration_order() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/hello-world-2tag?title=sr&name=pepe")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    assert_eq!(capture.events()[0].mdc, mdc("{testKey=pepe, AnotherKey=sr}"));
}

#[tokio::test]
async fn header_marker_publishes_header_value() {
    let capture = with_server(|base| async move {
        let client = reqwest::Client::new();
        let res = client
            .get(format!("{base}/traced?name=pepe"))
            .header("x-request-id", "abc-123")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = client.get(format!("{base}/traced?name=pepe")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    let events = capture.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].mdc, mdc("{requestId=abc-123, testKey=pepe}"));
    assert_eq!(events[1].mdc, mdc("{testKey=pepe}"));
}

#[tokio::test]
async fn json_path_selects_body_field() {
    let capture = with_server(|base| async move {
        let res = reqwest::Client::new()
            .post(format!("{base}/helloworld"))
            .json(&json!({ "id": 1, "content": "pepe" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["content"], "Hello, pepe!");
    }).await;

    assert_eq!(capture.events()[0].mdc, mdc("{testKey=1}"));
}

#[tokio::test]
async fn json_path_on_null_field_publishes_nothing() {
    let capture = with_server(|base| async move {
        let res = reqwest::Client::new()
            .post(format!("{base}/helloworld"))
            .json(&json!({ "id": null, "content": "pepe" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    assert_eq!(capture.events()[0].mdc, empty());
}

#[tokio::test]
async fn malformed_body_fails_the_request() {
    let capture = with_server(|base| async move {
        let res = reqwest::Client::new()
            .post(format!("{base}/helloworld"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = res.text().await.unwrap();
        assert!(text.starts_with("cannot extract `testKey`"), "{text}");
    }).await;

    // The handler never ran, so nothing from this crate was logged.
    assert!(capture.events().is_empty());
}

#[tokio::test]
async fn handler_failure_passes_through_and_context_does_not_leak() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/users/42/conflict")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = reqwest::get(format!("{base}/hello-world-noTag")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    let events = capture.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].mdc, mdc("{userId=42}"));
    assert_eq!(events[1].mdc, empty());
}

#[tokio::test]
async fn unwrapped_routes_still_get_a_request_scope() {
    let capture = with_server(|base| async move {
        let res = reqwest::get(format!("{base}/plain?name=pepe")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }).await;

    assert_eq!(capture.events()[0].mdc, empty());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    with_server(|base| async move {
        let res = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }).await;
}
