//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When API routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Response {
        self.client
            .get(self.url("/health"))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Uploads and analysis
    // ========================================================================

    /// Uploads `data` in the `audio` field.
    pub async fn upload(&self, file_name: &str, mime_type: &str, data: Vec<u8>) -> Response {
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .expect("Invalid mime type");
        let form = Form::new().part("audio", part);

        self.client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    pub async fn get_upload(&self, filename: &str) -> Response {
        self.client
            .get(self.url(&format!("/uploads/{}", filename)))
            .send()
            .await
            .expect("Get upload request failed")
    }

    pub async fn analyze_text(&self, title: &str, artist: &str) -> Response {
        self.analyze(json!({ "title": title, "artist": artist })).await
    }

    pub async fn analyze_file(&self, filename: &str) -> Response {
        self.analyze(json!({ "filename": filename })).await
    }

    pub async fn analyze(&self, body: Value) -> Response {
        self.client
            .post(self.url("/analyze"))
            .json(&body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    // ========================================================================
    // Library
    // ========================================================================

    pub async fn list_library(&self, owner: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/library"));
        if let Some(owner) = owner {
            request = request.query(&[("ownerId", owner)]);
        }
        request.send().await.expect("List library request failed")
    }

    pub async fn get_song(&self, id: &str) -> Response {
        self.client
            .get(self.url(&format!("/library/{}", id)))
            .send()
            .await
            .expect("Get song request failed")
    }

    pub async fn save_song(&self, body: Value) -> Response {
        self.client
            .post(self.url("/library"))
            .json(&body)
            .send()
            .await
            .expect("Save song request failed")
    }

    pub async fn update_song(&self, id: &str, patch: Value) -> Response {
        self.client
            .put(self.url(&format!("/library/{}", id)))
            .json(&patch)
            .send()
            .await
            .expect("Update song request failed")
    }

    pub async fn delete_song(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/library/{}", id)))
            .send()
            .await
            .expect("Delete song request failed")
    }
}
