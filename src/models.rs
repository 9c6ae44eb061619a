//! Data models and structures
//!
//! Defines the request/response shapes for the analysis endpoint, the
//! per-attempt generation request, usage records, and environment
//! configuration.

use crate::ai::gemini::client::DEFAULT_BASE_URL;
use crate::prompts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of characters of generated text kept in a usage record.
pub const PREVIEW_CHARS: usize = 100;

/// Image bytes exactly as uploaded, plus the MIME type sent upstream.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

/// One attempt's worth of prompt content, built fresh per candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<PromptPart>,
}

impl GenerationRequest {
    /// Instruction, image intro, the image itself, closing instruction.
    pub fn multimodal(image: &UploadedImage) -> Self {
        Self {
            parts: vec![
                PromptPart::Text(prompts::SYSTEM.to_string()),
                PromptPart::Text(prompts::IMAGE_INTRO.to_string()),
                PromptPart::Image {
                    mime_type: image.mime_type.clone(),
                    data: image.bytes.clone(),
                },
                PromptPart::Text(prompts::CLOSING.to_string()),
            ],
        }
    }

    /// Degraded request for candidates that refuse image input.
    pub fn text_only(model: &str) -> Self {
        Self {
            parts: vec![
                PromptPart::Text(prompts::SYSTEM.to_string()),
                PromptPart::Text(prompts::render(prompts::TEXT_ONLY_NOTE, &[("model", model)])),
                PromptPart::Text(prompts::CLOSING.to_string()),
            ],
        }
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PromptPart::Image { .. }))
    }
}

/// Successful outcome of the fallback loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub text: String,
    pub model_used: String,
    /// Set when the text came from the text-only degraded request.
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub analysis: String,
    pub model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<Analysis> for AnalysisResponse {
    fn from(analysis: Analysis) -> Self {
        let note = analysis.degraded.then(|| {
            format!(
                "The model {} could not accept the image; this response is general guidance and the image was not analysed.",
                analysis.model_used
            )
        });
        Self {
            analysis: analysis.text,
            model_used: analysis.model_used,
            note,
        }
    }
}

/// Lightweight telemetry written to the usage store per successful analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub model_used: String,
    pub status: String,
    pub preview: String,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        Self {
            model_used: analysis.model_used.clone(),
            status: "success".to_string(),
            preview: analysis.text.chars().take(PREVIEW_CHARS).collect(),
            degraded: analysis.degraded,
            created_at: Utc::now(),
        }
    }
}

// Configuration
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-pro-vision",
];
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UsageStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub prefix: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub candidate_models: Vec<String>,
    pub attempt_timeout: Duration,
    pub max_upload_bytes: usize,
    pub usage_store: Option<UsageStoreConfig>,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            var(key).ok_or_else(|| crate::Error::Config(format!("{} not set", key)))
        };

        let gemini_api_key = required("GEMINI_API_KEY")?;

        let candidate_models = match var("GEMINI_MODELS") {
            Some(raw) => parse_candidates(&raw),
            None => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        if candidate_models.is_empty() {
            return Err(crate::Error::Config(
                "GEMINI_MODELS must name at least one model".to_string(),
            ));
        }

        let timeout_secs: u64 = match var("GEMINI_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid GEMINI_TIMEOUT_SECS '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(crate::Error::Config(
                "GEMINI_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        let attempt_timeout = Duration::from_secs(timeout_secs);

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse().map_err(|_| {
                crate::Error::Config(format!("Invalid MAX_UPLOAD_BYTES '{}'", raw))
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let usage_store = match var("USAGE_STORE_BUCKET") {
            Some(bucket) => Some(UsageStoreConfig {
                endpoint: var("USAGE_STORE_ENDPOINT")
                    .unwrap_or_else(|| "https://s3.amazonaws.com".to_string()),
                bucket,
                region: var("USAGE_STORE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: required("USAGE_STORE_ACCESS_KEY_ID")?,
                secret_access_key: required("USAGE_STORE_SECRET_ACCESS_KEY")?,
                prefix: var("USAGE_STORE_PREFIX").unwrap_or_else(|| "usage".to_string()),
            }),
            None => None,
        };

        Ok(Self {
            gemini_api_key,
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            candidate_models,
            attempt_timeout,
            max_upload_bytes,
            usage_store,
        })
    }
}

/// Split a comma-separated model list, keeping first occurrence order.
pub fn parse_candidates(raw: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        let item = item.strip_prefix("models/").unwrap_or(item);
        if !item.is_empty() && !models.iter().any(|m| m == item) {
            models.push(item.to_string());
        }
    }
    models
}
