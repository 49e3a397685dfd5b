use anyhow::{Context, Result};
use reqwest::Client;

use super::ObjectStore;

/// Uploads objects with `PUT {endpoint}/{key}`.
///
/// If the response body is JSON with a string `url` field, that is the
/// returned URL; otherwise the object's own URL is.
pub struct HttpStore {
    endpoint: String,
    token: String,
    client: Client,
}

impl HttpStore {
    pub fn new(endpoint: String, token: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn store(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let url = self.object_url(key);

        let mut req = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes.to_vec());
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let resp = req.send().await.context("Upload request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read upload response")?;

        if !status.is_success() {
            anyhow::bail!("Upload failed ({}): {}", status, text);
        }

        let download_url = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|json| json["url"].as_str().map(str::to_string));

        Ok(download_url.unwrap_or(url))
    }
}
