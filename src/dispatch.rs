//! Sequential model fallback
//!
//! Tries each configured candidate model in order with one multimodal
//! request. Failures that look specific to one model move on to the next
//! candidate; failures that look account-wide (credentials, upstream outage)
//! end the request immediately.

use crate::ai::GenerativeService;
use crate::models::{Analysis, GenerationRequest, UploadedImage};
use crate::Error;
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Classified failure of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CandidateUnsupported,
    RequestShapeRejected,
    AuthFailure,
    ServiceUnavailable,
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::CandidateUnsupported => "candidate unsupported",
            FailureKind::RequestShapeRejected => "request shape rejected",
            FailureKind::AuthFailure => "authentication failure",
            FailureKind::ServiceUnavailable => "service unavailable",
            FailureKind::Unexpected => "unexpected error",
        };
        f.write_str(label)
    }
}

/// Map an error from the generative service onto a [`FailureKind`].
pub fn classify(err: &Error) -> FailureKind {
    match err {
        Error::Upstream { status, message } => classify_status(*status, message),
        _ => FailureKind::Unexpected,
    }
}

fn classify_status(status: u16, message: &str) -> FailureKind {
    let message = message.to_ascii_lowercase();
    match status {
        401 | 403 => FailureKind::AuthFailure,
        400 if mentions_bad_credential(&message) => FailureKind::AuthFailure,
        404 => FailureKind::CandidateUnsupported,
        400 if mentions_unknown_model(&message) => FailureKind::CandidateUnsupported,
        400 if mentions_account_precondition(&message) => FailureKind::ServiceUnavailable,
        400 => FailureKind::RequestShapeRejected,
        429 | 500 | 502 | 503 | 504 => FailureKind::ServiceUnavailable,
        _ => FailureKind::Unexpected,
    }
}

// Gemini reports a bad key as 400 INVALID_ARGUMENT.
fn mentions_bad_credential(message: &str) -> bool {
    ["api key not valid", "api_key_invalid", "api key expired"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn mentions_unknown_model(message: &str) -> bool {
    ["not found", "not supported for generatecontent", "unknown model"]
        .iter()
        .any(|needle| message.contains(needle))
}

// FAILED_PRECONDITION applies to the whole account, e.g. an unsupported region.
fn mentions_account_precondition(message: &str) -> bool {
    ["failed_precondition", "location is not supported"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// What the loop does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Retry the same candidate once with a text-only request.
    Degrade,
    NextCandidate,
    Abort,
}

/// Decision function for one failed attempt on a candidate.
pub fn next_step(kind: FailureKind, degraded: bool) -> Step {
    match kind {
        FailureKind::AuthFailure | FailureKind::ServiceUnavailable => Step::Abort,
        FailureKind::RequestShapeRejected if !degraded => Step::Degrade,
        FailureKind::RequestShapeRejected
        | FailureKind::CandidateUnsupported
        | FailureKind::Unexpected => Step::NextCandidate,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFailure {
    pub model: String,
    /// Why the full multimodal request failed on this candidate.
    pub reason: FailureKind,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Credential rejected by the generative service (model {model})")]
    AuthFailure { model: String, details: String },

    #[error("Generative service unavailable (model {model})")]
    ServiceUnavailable { model: String, details: String },

    #[error("All candidate models failed")]
    Exhausted {
        failures: Vec<CandidateFailure>,
        available_models: Option<Vec<String>>,
    },
}

impl DispatchError {
    /// Candidate identifiers in the order they were tried.
    pub fn attempted_models(&self) -> Vec<String> {
        match self {
            DispatchError::AuthFailure { model, .. }
            | DispatchError::ServiceUnavailable { model, .. } => vec![model.clone()],
            DispatchError::Exhausted { failures, .. } => {
                failures.iter().map(|f| f.model.clone()).collect()
            }
        }
    }

    /// True when every candidate refused the request format.
    pub fn all_shape_rejected(&self) -> bool {
        match self {
            DispatchError::Exhausted { failures, .. } => {
                !failures.is_empty()
                    && failures
                        .iter()
                        .all(|f| f.reason == FailureKind::RequestShapeRejected)
            }
            _ => false,
        }
    }
}

/// Caller-safe summary of an error; upstream bodies stay in the logs.
fn safe_summary(err: &Error) -> String {
    match err {
        Error::Upstream { status, .. } => {
            let reason = StatusCode::from_u16(*status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown");
            format!("Upstream returned status {} {}", status, reason)
        }
        _ => "Unexpected upstream failure".to_string(),
    }
}

enum CandidateOutcome {
    Success(Analysis),
    Next(FailureKind),
    Abort(DispatchError),
}

/// Owns the ordered candidate list and drives the fallback loop.
pub struct FallbackDispatcher {
    service: Arc<dyn GenerativeService>,
    candidates: Vec<String>,
}

impl FallbackDispatcher {
    pub fn new(service: Arc<dyn GenerativeService>, candidates: Vec<String>) -> Self {
        Self {
            service,
            candidates,
        }
    }

    /// Return the first candidate's successful analysis of `image`.
    pub async fn analyze(&self, image: &UploadedImage) -> Result<Analysis, DispatchError> {
        let mut failures = Vec::with_capacity(self.candidates.len());

        for (index, model) in self.candidates.iter().enumerate() {
            info!(
                "Trying candidate model {} ({}/{})",
                model,
                index + 1,
                self.candidates.len()
            );

            match self.try_candidate(model, image).await {
                CandidateOutcome::Success(analysis) => {
                    info!(
                        "Analysis produced by {} (degraded: {})",
                        model, analysis.degraded
                    );
                    return Ok(analysis);
                }
                CandidateOutcome::Next(reason) => failures.push(CandidateFailure {
                    model: model.clone(),
                    reason,
                }),
                CandidateOutcome::Abort(err) => {
                    error!("Aborting fallback loop: {}", err);
                    return Err(err);
                }
            }
        }

        error!(
            "All {} candidate models failed: {:?}",
            failures.len(),
            failures
        );

        let available_models = match self.service.list_models().await {
            Ok(models) => Some(models),
            Err(e) => {
                warn!("Could not list available models: {}", e);
                None
            }
        };

        Err(DispatchError::Exhausted {
            failures,
            available_models,
        })
    }

    async fn try_candidate(&self, model: &str, image: &UploadedImage) -> CandidateOutcome {
        let mut request = GenerationRequest::multimodal(image);
        let mut degraded = false;
        let mut first_failure: Option<FailureKind> = None;

        loop {
            let err = match self.service.generate(model, &request).await {
                Ok(output) => {
                    return CandidateOutcome::Success(Analysis {
                        text: output.extract_text(),
                        model_used: model.to_string(),
                        degraded,
                    })
                }
                Err(err) => err,
            };

            let kind = classify(&err);
            warn!(
                "Candidate {} failed ({}, degraded: {}): {}",
                model, kind, degraded, err
            );
            let reason = *first_failure.get_or_insert(kind);

            match next_step(kind, degraded) {
                Step::Degrade => {
                    info!("Retrying {} with a text-only request", model);
                    request = GenerationRequest::text_only(model);
                    degraded = true;
                }
                Step::NextCandidate => return CandidateOutcome::Next(reason),
                Step::Abort => {
                    let details = safe_summary(&err);
                    let model = model.to_string();
                    return CandidateOutcome::Abort(match kind {
                        FailureKind::AuthFailure => DispatchError::AuthFailure { model, details },
                        _ => DispatchError::ServiceUnavailable { model, details },
                    });
                }
            }
        }
    }
}
