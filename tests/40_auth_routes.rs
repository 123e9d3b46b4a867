mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_with, get, send};

fn with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn token_info_reports_expiry() {
    let token = common::make_token("u-1", Some("acme"), 1800);
    let app = app_with(&[], false);

    let res = send(&app, with_cookie("GET", "/api/auth/token-info", &format!("access_token={}", token))).await;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json();
    assert_eq!(body["userId"], "u-1");
    assert_eq!(body["companyId"], "acme");
    assert_eq!(body["expired"], false);
    let expires_in = body["expiresIn"].as_i64().unwrap();
    assert!((1790..=1800).contains(&expires_in), "expiresIn = {}", expires_in);
    assert!(body["expiresAtIso"].as_str().is_some());
}

#[tokio::test]
async fn token_info_accepts_bearer_and_expired_tokens() {
    let token = common::make_token("u-2", None, -60);
    let app = app_with(&[], false);

    let res = send(
        &app,
        Request::get("/api/auth/token-info")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["expired"], true);
}

#[tokio::test]
async fn token_info_without_valid_token_is_401() {
    let app = app_with(&[], false);

    let res = send(&app, get("/api/auth/token-info")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "not authenticated" }));

    let res = send(&app, with_cookie("GET", "/api/auth/token-info", "access_token=garbage")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "not authenticated" }));
}

#[tokio::test]
async fn session_reflects_the_token() {
    let app = app_with(&[], false);

    let res = send(&app, get("/api/auth/session")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json(),
        json!({ "authenticated": false, "userId": null, "companyId": null })
    );

    let token = common::make_token("u-3", Some("globex"), 600);
    let res = send(&app, with_cookie("GET", "/api/auth/session", &format!("access_token={}", token))).await;
    assert_eq!(
        res.json(),
        json!({ "authenticated": true, "userId": "u-3", "companyId": "globex" })
    );
}

#[tokio::test]
async fn logout_forwards_and_clears_cookies() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("cookie", "access_token=a; refresh_token=r"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&auth)
        .await;

    let app = app_with(&[("AUTH_SERVICE_URL", &auth.uri())], false);
    let res = send(&app, with_cookie("POST", "/api/auth/logout", "access_token=a; refresh_token=r")).await;

    assert_eq!(res.status, StatusCode::OK);
    let cookies = res.set_cookies();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=;") && c.contains("Max-Age=0")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn logout_clears_cookies_even_when_backend_is_down() {
    let port = portpicker::pick_unused_port().unwrap();
    let app = app_with(&[("AUTH_SERVICE_URL", &format!("http://127.0.0.1:{}", port))], false);

    let res = send(&app, with_cookie("POST", "/api/auth/logout", "access_token=a")).await;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.set_cookies().len(), 2);
}

#[tokio::test]
async fn login_mock_sets_session_cookies() {
    let app = app_with(&[], true);

    let res = send(
        &app,
        common::post_json("/api/auth/login", &json!({ "email": "jane@example.com", "password": "x" })),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    let cookies = res.set_cookies();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=mock-access-token")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=mock-refresh-token")));
}

#[tokio::test]
async fn refresh_route_relays_rotated_cookies() {
    let auth = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .append_header("set-cookie", "access_token=fresh; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&auth)
        .await;

    let app = app_with(&[("AUTH_SERVICE_URL", &auth.uri())], false);
    let res = send(&app, with_cookie("POST", "/api/auth/refresh", "refresh_token=r")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.set_cookies(), vec!["access_token=fresh; Path=/; HttpOnly".to_string()]);
}
