use super::types::ListModelsResponse;
use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST transport shared by every candidate model.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Turn a non-success response into [`Error::Upstream`], keeping the
    /// status so callers can classify it.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!("Gemini API error (status {}): {}", status, error_text);
        Err(Error::Upstream {
            status: status.as_u16(),
            message: error_text,
        })
    }

    /// Calls `generateContent` for `model` and returns the raw response body.
    ///
    /// `model` may be a bare ID or carry the `models/` prefix.
    pub async fn generate_content<Req: Serialize>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<String> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini ({}): {}", model, e);
                e
            })?;

        Ok(Self::check_status(response).await?.text().await?)
    }

    /// Fetches one page of `models.list`.
    pub async fn list_models(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut query = vec![("pageSize", "1000".to_string())];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .query(&query)
            .send()
            .await?;

        let body = Self::check_status(response).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini model list: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Gemini model list: {}", e))
        })
    }
}
