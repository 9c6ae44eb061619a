use super::client::GeminiHttpClient;
use super::types::GenerateContentRequest;
use crate::ai::{GenerationOutput, GenerativeService};
use crate::models::GenerationRequest;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Upper bound on `models.list` pages fetched for diagnostics.
const MAX_MODEL_PAGES: usize = 5;

pub struct GeminiClient {
    http: GeminiHttpClient,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput> {
        tracing::debug!(
            "Sending generateContent to {} (image attached: {})",
            model,
            request.has_image()
        );

        let payload = GenerateContentRequest::from(request);
        let body = self.http.generate_content(model, &payload).await?;
        Ok(GenerationOutput::from_body(&body))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let page = self.http.list_models(page_token.as_deref()).await?;
            models.extend(
                page.models
                    .iter()
                    .filter(|m| m.supports_generate_content())
                    .map(|m| m.id().to_string()),
            );
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use crate::models::UploadedImage;
    use crate::Error;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key".to_string(), Duration::from_secs(5))
            .with_base_url(server.uri())
    }

    fn png_request() -> GenerationRequest {
        GenerationRequest::multimodal(&UploadedImage {
            bytes: vec![0x89, 0x50, 0x4E, 0x47],
            mime_type: "image/png".to_string(),
        })
    }

    #[tokio::test]
    async fn test_generate_sends_image_and_safety_settings() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_string_contains("\"inlineData\""))
            .and(body_string_contains("\"BLOCK_NONE\""))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_support::text_response("1. Visual Observations")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let output = make_client(&server)
            .generate("models/gemini-2.0-flash", &png_request())
            .await
            .unwrap();
        assert_eq!(output.extract_text(), "1. Visual Observations");
    }

    #[tokio::test]
    async fn test_generate_keeps_upstream_status() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": { "code": 404, "message": "models/gemini-x is not found", "status": "NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate("gemini-x", &png_request())
            .await
            .unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("is not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_tolerates_unexpected_body() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_string("plain words"))
            .mount(&server)
            .await;

        let output = make_client(&server)
            .generate("gemini-a", &png_request())
            .await
            .unwrap();
        assert_eq!(output.extract_text(), "plain words");
    }

    #[tokio::test]
    async fn test_list_models_filters_and_follows_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(test_support::LIST_MODELS_PATH))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    { "name": "models/gemini-b", "supportedGenerationMethods": ["generateContent"] }
                ]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(test_support::LIST_MODELS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    { "name": "models/gemini-a", "supportedGenerationMethods": ["generateContent"] },
                    { "name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"] }
                ],
                "nextPageToken": "next"
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let models = make_client(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["gemini-a", "gemini-b"]);
    }
}
