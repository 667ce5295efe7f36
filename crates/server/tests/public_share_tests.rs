//! Anonymous pickup-code endpoints over HTTP.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{multipart_body, register_user, request_json, request_raw, test_app};
use serde_json::json;
use std::time::Duration;

async fn upload_via_api(app: &axum::Router, token: &str, filename: &str, data: &[u8]) -> String {
    let (content_type, payload) = multipart_body(filename, data);
    let request = Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(payload))
        .unwrap();
    let (status, _, body) = request_raw(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    parsed["data"]["file_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn anonymous_pickup_flow_with_password_and_cap() {
    let (_dir, state, app) = test_app().await;
    let token = register_user(&app, "alice@x.com").await;

    let content = b"Hello, World!";
    let file_id = upload_via_api(&app, &token, "a.txt", content).await;

    // Share with a password and a cap of two downloads.
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/shares",
        Some(&token),
        Some(json!({
            "file_ids": [file_id],
            "expires_in": 3600,
            "max_downloads": 2,
            "password": "secret",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let code = body["data"]["pickup_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);
    assert_eq!(body["data"]["has_password"], true);

    // Anonymous retrieval: wrong password is forbidden, missing password
    // asks for one.
    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({"password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "invalid_password");

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "password_required");

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({"password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["files"][0]["filename"], "a.txt");

    // Two anonymous downloads, then the counter gates the third probe.
    for _ in 0..2 {
        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/public/download/{code}?password=secret"))
            .body(Body::empty())
            .unwrap();
        let (status, _, bytes) = request_raw(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..], content);
    }

    // The increment is fire-and-forget; wait for it to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let share = state.metadata.get_share_by_code(&code).await.unwrap().unwrap();
        if share.current_downloads >= 2 {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("download counter did not advance");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({"password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "exhausted");
}

#[tokio::test]
async fn unknown_and_malformed_codes() {
    let (_dir, _state, app) = test_app().await;

    // Well-formed but unknown.
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/public/shares/ABCD2345",
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");

    // Malformed (wrong length, forbidden characters).
    for code in ["SHORT", "ABCD234O", "abcd2345"] {
        let (status, body) = request_json(
            &app,
            "POST",
            &format!("/api/public/shares/{code}"),
            None,
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(body["error"], "invalid_code");
    }
}

#[tokio::test]
async fn save_to_vault_over_http() {
    let (_dir, state, app) = test_app().await;
    let alice = register_user(&app, "alice@x.com").await;
    let bob = register_user(&app, "bob@x.com").await;

    let content = b"shared bytes";
    let file_id = upload_via_api(&app, &alice, "gift.bin", content).await;

    let (_, body) = request_json(
        &app,
        "POST",
        "/api/shares",
        Some(&alice),
        Some(json!({"file_ids": [file_id], "expires_in": 3600, "max_downloads": 0})),
    )
    .await;
    let code = body["data"]["pickup_code"].as_str().unwrap().to_string();

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/shares/{code}/save"),
        Some(&bob),
        Some(json!({"file_ids": [file_id]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["saved_ids"].as_array().unwrap().len(), 1);

    // Bob's listing shows the copy; the blob is shared, not duplicated.
    let (status, body) = request_json(&app, "GET", "/api/files", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["files"][0]["filename"], "gift.bin");

    let hash = coffre_core::ContentHash::compute(content).to_hex();
    assert_eq!(state.metadata.get_blob(&hash).await.unwrap().unwrap().ref_count, 2);
}

#[tokio::test]
async fn stopped_share_is_gone_for_recipients() {
    let (_dir, _state, app) = test_app().await;
    let token = register_user(&app, "alice@x.com").await;

    let file_id = upload_via_api(&app, &token, "a.txt", b"soon gone").await;
    let (_, body) = request_json(
        &app,
        "POST",
        "/api/shares",
        Some(&token),
        Some(json!({"file_ids": [file_id], "expires_in": 3600, "max_downloads": 0})),
    )
    .await;
    let code = body["data"]["pickup_code"].as_str().unwrap().to_string();
    let share_id = body["data"]["share_id"].as_str().unwrap().to_string();

    let (status, _) = request_json(
        &app,
        "DELETE",
        &format!("/api/shares/{share_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "stopped");
}

#[tokio::test]
async fn deleted_files_drop_out_of_shares() {
    let (_dir, _state, app) = test_app().await;
    let token = register_user(&app, "alice@x.com").await;

    let keep_id = upload_via_api(&app, &token, "keep.txt", b"keep me").await;
    let drop_id = upload_via_api(&app, &token, "drop.txt", b"drop me").await;

    let (_, body) = request_json(
        &app,
        "POST",
        "/api/shares",
        Some(&token),
        Some(json!({"file_ids": [keep_id, drop_id], "expires_in": 3600, "max_downloads": 0})),
    )
    .await;
    let code = body["data"]["pickup_code"].as_str().unwrap().to_string();

    let (status, _) = request_json(
        &app,
        "DELETE",
        &format!("/api/files/{drop_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The share survives with the surviving subset.
    let (status, body) = request_json(
        &app,
        "POST",
        &format!("/api/public/shares/{code}"),
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let files = body["data"]["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "keep.txt");
}
