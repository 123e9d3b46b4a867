mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_with, send};

const OLD: &str = "access_token=old; refresh_token=r1";
const ROTATED: &str = "access_token=new; refresh_token=r1";

fn projects_request(cookie: &str) -> Request<Body> {
    Request::get("/api/project/projects")
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

/// Backend that accepts only the rotated token
async fn backend_accepting_rotated() -> MockServer {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .and(header("cookie", ROTATED))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": ["p-1"] })))
        .with_priority(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "token expired" })))
        .mount(&backend)
        .await;
    backend
}

fn refresh_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "success": true }))
        .append_header("set-cookie", "access_token=new; Path=/; HttpOnly")
}

#[tokio::test]
async fn expired_session_is_refreshed_and_replayed_once() {
    let backend = backend_accepting_rotated().await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("cookie", OLD))
        .respond_with(refresh_ok())
        .expect(1)
        .mount(&auth)
        .await;

    let app = app_with(
        &[("AUTH_SERVICE_URL", &auth.uri()), ("PROJECT_SERVICE_URL", &backend.uri())],
        false,
    );
    let res = send(&app, projects_request(OLD)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "items": ["p-1"] }));

    // The browser gets the rotated cookie too
    assert!(res.set_cookies().iter().any(|c| c.starts_with("access_token=new")));

    let backend_calls = backend.received_requests().await.unwrap();
    let auth_calls = auth.received_requests().await.unwrap();
    assert_eq!(backend_calls.len() + auth_calls.len(), 3);
    assert_eq!(
        backend_calls[1].headers.get("cookie").unwrap().to_str().unwrap(),
        ROTATED
    );
}

#[tokio::test]
async fn failed_refresh_returns_the_original_401() {
    let backend = backend_accepting_rotated().await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "refresh revoked" })))
        .expect(1)
        .mount(&auth)
        .await;

    let app = app_with(
        &[("AUTH_SERVICE_URL", &auth.uri()), ("PROJECT_SERVICE_URL", &backend.uri())],
        false,
    );
    let res = send(&app, projects_request(OLD)).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "token expired" }));
    assert!(res.set_cookies().is_empty());

    let calls = backend.received_requests().await.unwrap().len() + auth.received_requests().await.unwrap().len();
    assert_eq!(calls, 2);
}

#[tokio::test]
async fn refresh_timeout_returns_the_original_401() {
    let backend = backend_accepting_rotated().await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok().set_delay(Duration::from_secs(2)))
        .mount(&auth)
        .await;

    let mut config = common::config_with(&[
        ("AUTH_SERVICE_URL", &auth.uri()),
        ("PROJECT_SERVICE_URL", &backend.uri()),
    ]);
    config.proxy.refresh_timeout_ms = 300;
    let app = console_bff::app(common::state_with(config, false));

    let res = send(&app, projects_request(OLD)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "token expired" }));
    assert!(res.set_cookies().is_empty());
    assert_eq!(backend.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn replay_401_is_returned_without_a_second_refresh() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "still no" })))
        .expect(2)
        .mount(&backend)
        .await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok())
        .expect(1)
        .mount(&auth)
        .await;

    let app = app_with(
        &[("AUTH_SERVICE_URL", &auth.uri()), ("PROJECT_SERVICE_URL", &backend.uri())],
        false,
    );
    let res = send(&app, projects_request(OLD)).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "still no" }));
}

#[tokio::test]
async fn other_statuses_never_refresh() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/projects"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "forbidden" })))
        .expect(1)
        .mount(&backend)
        .await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(refresh_ok())
        .expect(0)
        .mount(&auth)
        .await;

    let app = app_with(
        &[("AUTH_SERVICE_URL", &auth.uri()), ("PROJECT_SERVICE_URL", &backend.uri())],
        false,
    );
    let res = send(&app, projects_request(OLD)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_401_is_not_a_refresh_trigger() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "bad credentials" })))
        .expect(1)
        .mount(&auth)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok())
        .expect(0)
        .mount(&auth)
        .await;

    let app = app_with(&[("AUTH_SERVICE_URL", &auth.uri())], false);
    let res = send(
        &app,
        common::post_json("/api/auth/login", &json!({ "email": "a@b.c", "password": "wrong" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "bad credentials" }));
}

#[tokio::test]
async fn without_auth_service_401_is_relayed() {
    let backend = backend_accepting_rotated().await;
    let app = app_with(&[("PROJECT_SERVICE_URL", &backend.uri())], false);

    let res = send(&app, projects_request(OLD)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(backend.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn streaming_uploads_are_not_replayed() {
    let storage = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/files"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&storage)
        .await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(refresh_ok())
        .expect(0)
        .mount(&auth)
        .await;

    let app = app_with(
        &[("AUTH_SERVICE_URL", &auth.uri()), ("STORAGE_SERVICE_URL", &storage.uri())],
        false,
    );
    let res = send(
        &app,
        Request::post("/api/storage/files")
            .header("cookie", OLD)
            .body(Body::from("file bytes"))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

async fn concurrent_expired_calls(single_flight: bool, expected_refreshes: u64) {
    let backend = backend_accepting_rotated().await;
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok().set_delay(Duration::from_millis(200)))
        .expect(expected_refreshes)
        .mount(&auth)
        .await;

    let mut config = common::config_with(&[
        ("AUTH_SERVICE_URL", &auth.uri()),
        ("PROJECT_SERVICE_URL", &backend.uri()),
    ]);
    config.session.single_flight = single_flight;
    let app = console_bff::app(common::state_with(config, false));

    let (a, b) = tokio::join!(send(&app, projects_request(OLD)), send(&app, projects_request(OLD)));
    assert_eq!(a.status, StatusCode::OK);
    assert_eq!(b.status, StatusCode::OK);
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_refreshes() {
    concurrent_expired_calls(true, 1).await;
}

#[tokio::test]
async fn without_single_flight_each_401_refreshes() {
    concurrent_expired_calls(false, 2).await;
}
