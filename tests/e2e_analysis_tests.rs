//! End-to-end tests for uploads and song analysis

mod common;

use common::{
    fake_mp3_bytes, RecordingIdentifier, TestClient, TestServer, IDENTIFIED_ALBUM,
    IDENTIFIED_ARTIST, IDENTIFIED_TITLE, TEST_MAX_UPLOAD_BYTES, TEXT_SONG_ARTIST, TEXT_SONG_TITLE,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

async fn upload_mp3(client: &TestClient) -> String {
    let response = client.upload("take one.mp3", "audio/mpeg", fake_mp3_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    body["file"]["filename"].as_str().unwrap().to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_status_and_uptime() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.health().await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["message"].is_string());
    assert!(body["uptime"].is_string());
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_stores_audio_under_generated_name() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.upload("take one.mp3", "audio/mpeg", fake_mp3_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["file"]["mimetype"], "audio/mpeg");
    assert_eq!(body["file"]["size"], fake_mp3_bytes().len());

    let filename = body["file"]["filename"].as_str().unwrap();
    assert!(filename.starts_with("audio-"));
    assert!(filename.ends_with(".mp3"));
    assert!(server.uploads_dir.join(filename).is_file());

    let served = client.get_upload(filename).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().to_vec(), fake_mp3_bytes());
}

#[tokio::test]
async fn test_untyped_upload_is_sniffed() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload("recording", "application/octet-stream", fake_mp3_bytes())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["file"]["mimetype"], "audio/mpeg");
}

#[tokio::test]
async fn test_non_audio_upload_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload("notes.txt", "text/plain", b"just some text".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UnsupportedMediaType");
    assert_eq!(std::fs::read_dir(&server.uploads_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut data = fake_mp3_bytes();
    data.resize(TEST_MAX_UPLOAD_BYTES as usize + 1, 0);

    let response = client.upload("long.mp3", "audio/mpeg", data).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upload_without_audio_field_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let form = reqwest::multipart::Form::new().text("comment", "no file here");
    let response = client
        .client
        .post(format!("{}/upload", server.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Text analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_by_title_and_artist() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.analyze_text(TEXT_SONG_TITLE, TEXT_SONG_ARTIST).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["title"], TEXT_SONG_TITLE);
    assert_eq!(data["artist"], TEXT_SONG_ARTIST);
    assert_eq!(data["chords"].as_array().unwrap().len(), 4);
    assert!(!data["tabDocument"].as_str().unwrap().is_empty());
    assert!(data["audioUrl"].is_null());
    assert!(data["youtubeUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://www.youtube.com/results?search_query="));
}

#[tokio::test]
async fn test_analyze_requires_filename_or_title_and_artist() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for body in [
        json!({}),
        json!({ "title": TEXT_SONG_TITLE }),
        json!({ "artist": TEXT_SONG_ARTIST }),
        json!({ "title": "  ", "artist": TEXT_SONG_ARTIST }),
    ] {
        let response = client.analyze(body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"], "ValidationError");
    }
}

#[tokio::test]
async fn test_analyze_rejects_malformed_json() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/analyze", server.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Audio analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_uploaded_file_uses_identification() {
    let identifier = RecordingIdentifier::matching();
    let server = TestServer::spawn_with_identifier(Arc::new(identifier.clone())).await;
    let client = TestClient::new(server.base_url.clone());

    let filename = upload_mp3(&client).await;
    let response = client.analyze_file(&filename).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["title"], IDENTIFIED_TITLE);
    assert_eq!(data["artist"], IDENTIFIED_ARTIST);
    assert_eq!(data["album"], IDENTIFIED_ALBUM);
    assert_eq!(data["audioUrl"], format!("/uploads/{}", filename));
    assert_eq!(data["chords"].as_array().unwrap().len(), 4);

    let calls = identifier.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].ends_with(&filename));
}

#[tokio::test]
async fn test_unidentified_file_falls_back_to_supplied_title() {
    let server =
        TestServer::spawn_with_identifier(Arc::new(RecordingIdentifier::never_matching())).await;
    let client = TestClient::new(server.base_url.clone());

    let filename = upload_mp3(&client).await;
    let response = client
        .analyze(json!({
            "filename": filename,
            "title": TEXT_SONG_TITLE,
            "artist": TEXT_SONG_ARTIST,
        }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["title"], TEXT_SONG_TITLE);
    assert_eq!(body["data"]["audioUrl"], format!("/uploads/{}", filename));
}

#[tokio::test]
async fn test_unidentified_file_without_fallback_is_rejected() {
    let server =
        TestServer::spawn_with_identifier(Arc::new(RecordingIdentifier::never_matching())).await;
    let client = TestClient::new(server.base_url.clone());

    let filename = upload_mp3(&client).await;
    let response = client.analyze_file(&filename).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_path_traversal_is_rejected_before_identification() {
    let identifier = RecordingIdentifier::matching();
    let server = TestServer::spawn_with_identifier(Arc::new(identifier.clone())).await;
    let client = TestClient::new(server.base_url.clone());

    for reference in ["../../etc/passwd", "..\\..\\boot.ini", "/etc/passwd", "sub/track.mp3"] {
        let response = client.analyze_file(reference).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", reference);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "SecurityError");
        assert_eq!(body["message"], "Invalid file reference");
    }

    assert!(identifier.calls().is_empty());
}

#[tokio::test]
async fn test_missing_upload_returns_404() {
    let identifier = RecordingIdentifier::matching();
    let server = TestServer::spawn_with_identifier(Arc::new(identifier.clone())).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.analyze_file("audio-1-2.mp3").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(identifier.calls().is_empty());
}
