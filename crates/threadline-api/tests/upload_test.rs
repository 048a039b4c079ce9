mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use threadline_api::auth::DEV_USER_HEADER;

use common::*;

const BOUNDARY: &str = "threadline-test-boundary";

/// `(field, file name, content type, bytes)`
type Part<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

fn part<'a>(field: &'a str, name: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Part<'a> {
    (field, name, content_type, bytes)
}

fn multipart_request(user: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (field, file_name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(user) = user {
        builder = builder.header(DEV_USER_HEADER, user);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_upload_stores_each_file() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            Some(USER),
            &[
                part("files", "cat photo.png", "image/png", b"png-bytes"),
                part("files[]", "dog.jpg", "image/jpeg", b"jpg-bytes"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);

    assert_eq!(files[0]["name"], "cat photo.png");
    assert_eq!(files[0]["size"], 9);
    assert_eq!(files[0]["type"], "image/png");
    let key = files[0]["key"].as_str().unwrap();
    assert!(key.starts_with("uploads/user_1/"));
    assert!(key.ends_with("-cat_photo.png"));
    assert_eq!(files[0]["url"], format!("memory://{}", key));

    let stored = app.storage.get(key).await.unwrap();
    assert_eq!(&stored.bytes[..], b"png-bytes");
    assert_eq!(app.storage.keys().await.len(), 2);
}

#[tokio::test]
async fn test_too_many_files_rejects_whole_batch() {
    let app = TestApp::new();
    let parts: Vec<Part<'_>> = (0..6)
        .map(|_| part("files", "a.png", "image/png", b"x"))
        .collect();

    let response = app.send(multipart_request(Some(USER), &parts)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "VALIDATION");
    assert!(app.storage.keys().await.is_empty());
}

#[tokio::test]
async fn test_disallowed_type_rejects_whole_batch() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            Some(USER),
            &[
                part("files", "ok.png", "image/png", b"png"),
                part("files", "notes.pdf", "application/pdf", b"%PDF"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "VALIDATION");
    assert!(body["message"].as_str().unwrap().contains("notes.pdf"));
    assert!(app.storage.keys().await.is_empty());
}

#[tokio::test]
async fn test_oversized_file_is_rejected() {
    let app = TestApp::new();
    let big = vec![0u8; 2048];

    let response = app
        .send(multipart_request(
            Some(USER),
            &[part("files", "big.png", "image/png", &big)],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"]
        .as_str()
        .unwrap()
        .contains("big.png"));
    assert!(app.storage.keys().await.is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(
            Some(USER),
            &[part("avatar", "a.png", "image/png", b"png")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_a_user() {
    let app = TestApp::new();

    let response = app
        .send(multipart_request(None, &[part("files", "a.png", "image/png", b"png")]))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.storage.keys().await.is_empty());
}
