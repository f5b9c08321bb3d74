use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use ragqa::models::{DistanceMetric, IndexingConfig};
use ragqa::server::{AppState, router};
use ragqa::services::{
    ExtractiveGenerator, FileLoader, FlatIndex, HashingEmbedder, RagPipeline, TextChunker,
};

const BOUNDARY: &str = "ragqa-test-boundary";

fn app_with(indexing: IndexingConfig) -> Router {
    let pipeline = RagPipeline::new(
        FileLoader::new(&indexing),
        TextChunker::new(&indexing),
        Arc::new(HashingEmbedder::new(256)),
        Arc::new(FlatIndex::new(256, DistanceMetric::Cosine)),
        Arc::new(ExtractiveGenerator::default()),
        5,
    );
    router(AppState::new(pipeline), indexing.max_file_size as usize)
}

fn app() -> Router {
    app_with(IndexingConfig::default())
}

fn multipart(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn query(question: &str) -> Request<Body> {
    let encoded: String = question
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '?' => "%3F".to_string(),
            c => c.to_string(),
        })
        .collect();
    Request::builder()
        .method("POST")
        .uri(format!("/query?question={}", encoded))
        .body(Body::empty())
        .unwrap()
}

fn health() -> Request<Body> {
    Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn upload_then_query_sky() {
    let app = app();

    let (status, body) = send(&app, multipart("file", "sky.txt", b"The sky is blue.")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File ingested");
    assert_eq!(body["details"]["chunks_added"], 1);

    let (status, body) = send(&app, query("What color is the sky?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "What color is the sky?");
    assert!(body["answer"].as_str().unwrap().contains("blue"));
}

#[tokio::test]
async fn query_echoes_untrimmed_question() {
    let app = app();
    send(&app, multipart("file", "sky.txt", b"The sky is blue.")).await;

    let (status, body) = send(&app, query("  What color is the sky?  ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["question"], "  What color is the sky?  ");
}

#[tokio::test]
async fn empty_upload_adds_nothing() {
    let app = app();

    let (status, body) = send(&app, multipart("file", "empty.txt", b"")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["chunks_added"], 0);

    let (status, body) = send(&app, health()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["entries"], 0);
}

#[tokio::test]
async fn health_counts_entries() {
    let app = app();
    send(&app, multipart("file", "a.md", b"Rust has ownership.")).await;
    send(&app, multipart("file", "b.md", b"Borrowing is checked.")).await;

    let (_, body) = send(&app, health()).await;
    assert_eq!(body["entries"], 2);
    assert_eq!(body["backend"], "flat");
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let app = app();
    let (status, body) = send(&app, multipart("document", "sky.txt", b"The sky is blue.")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn blank_question_is_bad_request() {
    let app = app();
    let (status, _) = send(&app, query("   ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/query")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_uploads() {
    let app = app_with(IndexingConfig {
        max_file_size: 16,
        ..Default::default()
    });

    let (status, _) = send(&app, multipart("file", "photo.png", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = send(&app, multipart("file", "bad.txt", &[0xff, 0xfe, 0x41])).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = send(
        &app,
        multipart("file", "long.txt", b"this text is longer than sixteen bytes"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn query_on_empty_index_returns_fallback() {
    let app = app();
    let (status, body) = send(&app, query("What color is the sky?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], ragqa::services::NO_ANSWER);
}
