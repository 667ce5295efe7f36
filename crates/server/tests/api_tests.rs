//! HTTP API tests: auth flows, the response envelope, and endpoint gates.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{multipart_body, register_user, request_json, request_raw, test_app};
use serde_json::json;

#[tokio::test]
async fn health_is_unauthenticated() {
    let (_dir, _state, app) = test_app().await;

    let (status, body) = request_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let (_dir, _state, app) = test_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "alice@x.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["user"]["email"], "alice@x.com");
    // The first registered user is the admin.
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert_eq!(body["data"]["user"]["storage_used"], 0);

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "alice@x.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = request_json(&app, "GET", "/api/user/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@x.com");

    // Subsequent users are plain users.
    let (_, body) = request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "bob@x.com", "password": "password123"})),
    )
    .await;
    assert_eq!(body["data"]["user"]["role"], "user");
}

#[tokio::test]
async fn register_validates_input() {
    let (_dir, _state, app) = test_app().await;

    for (email, password) in [
        ("not-an-email", "password123"),
        ("a@x.com", "short1"),
        ("a@x.com", "lettersonly"),
        ("a@x.com", "12345678"),
    ] {
        let (status, body) = request_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{email}/{password}: {body}");
        assert_eq!(body["code"], 400);
    }

    // Duplicate email.
    register_user(&app, "carol@x.com").await;
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"email": "carol@x.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let (_dir, _state, app) = test_app().await;
    register_user(&app, "dave@x.com").await;

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "dave@x.com", "password": "wrongpass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@x.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let (_dir, _state, app) = test_app().await;

    for (method, uri) in [
        ("GET", "/api/user/me"),
        ("GET", "/api/files"),
        ("POST", "/api/files/check"),
        ("GET", "/api/shares"),
    ] {
        let body = if method == "POST" {
            Some(json!({"hash": "00"}))
        } else {
            None
        };
        let (status, _) = request_json(&app, method, uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    // A garbage token is no better than none.
    let (status, _) =
        request_json(&app, "GET", "/api/user/me", Some("not-a-real-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn multipart_upload_and_instant_check() {
    let (_dir, _state, app) = test_app().await;
    let token = register_user(&app, "erin@x.com").await;

    let content = b"Hello, World!";
    let expected_hash = coffre_core::ContentHash::compute(content).to_hex();

    // Before the upload the probe misses.
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/files/check",
        Some(&token),
        Some(json!({"hash": expected_hash})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exists"], false);

    let (content_type, payload) = multipart_body("a.txt", content);
    let request = Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(payload))
        .unwrap();
    let (status, _, body) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["data"]["hash"], expected_hash.as_str());
    assert_eq!(parsed["data"]["size"], 13);

    // Now the probe hits.
    let (_, body) = request_json(
        &app,
        "POST",
        "/api/files/check",
        Some(&token),
        Some(json!({"hash": expected_hash})),
    )
    .await;
    assert_eq!(body["data"]["exists"], true);
    assert_eq!(body["data"]["size"], 13);

    // A malformed hash is rejected before touching anything.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/files/check",
        Some(&token),
        Some(json!({"hash": "UPPERCASE-NOT-OK"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_supports_ranges() {
    let (_dir, _state, app) = test_app().await;
    let token = register_user(&app, "frank@x.com").await;

    let content = b"0123456789";
    let (content_type, payload) = multipart_body("digits.txt", content);
    let request = Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(payload))
        .unwrap();
    let (status, _, body) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let file_id = parsed["data"]["file_id"].as_str().unwrap().to_string();

    // Full download.
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/files/{file_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCEPT_RANGES.as_str()], "bytes");
    assert_eq!(&body[..], content);

    // bytes=2-5
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/files/{file_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::RANGE, "bytes=2-5")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers["content-range"], "bytes 2-5/10");
    assert_eq!(&body[..], b"2345");

    // bytes=-3 (suffix)
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/files/{file_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::RANGE, "bytes=-3")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers["content-range"], "bytes 7-9/10");
    assert_eq!(&body[..], b"789");

    // Unsatisfiable.
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/files/{file_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::RANGE, "bytes=50-")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(headers["content-range"], "bytes */10");

    // Another user cannot download it.
    let other = register_user(&app, "grace@x.com").await;
    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/files/{file_id}/download"))
        .header(header::AUTHORIZATION, format!("Bearer {other}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = request_raw(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
