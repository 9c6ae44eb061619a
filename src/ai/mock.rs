use super::{GenerationOutput, GenerativeService};
use crate::models::GenerationRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted outcome for one mocked `generate` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Output(GenerationOutput),
    /// Upstream HTTP status with a response body.
    Status(u16, String),
    /// Error that carries no upstream status.
    Failure(String),
}

impl MockReply {
    fn into_result(self) -> Result<GenerationOutput> {
        match self {
            MockReply::Text(text) => Ok(GenerationOutput::Text(text)),
            MockReply::Output(output) => Ok(output),
            MockReply::Status(status, message) => Err(Error::Upstream { status, message }),
            MockReply::Failure(message) => Err(Error::AiProvider(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub model: String,
    pub with_image: bool,
}

#[derive(Clone)]
pub struct MockGenerativeClient {
    replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    default_reply: MockReply,
    available_models: Option<Vec<String>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl MockGenerativeClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(HashMap::new())),
            default_reply: MockReply::Text("Mock educational analysis".to_string()),
            available_models: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a reply for `model`. Replies are consumed in order; once a
    /// model's queue is empty the default reply is used.
    pub fn with_reply(self, model: &str, reply: MockReply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Models returned by `list_models`; without this, listing fails.
    pub fn with_available_models(mut self, models: Vec<String>) -> Self {
        self.available_models = Some(models);
        self
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_models_called(&self) -> Vec<String> {
        self.get_calls().into_iter().map(|c| c.model).collect()
    }

    pub fn get_list_models_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

impl Default for MockGenerativeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeService for MockGenerativeClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput> {
        self.calls.lock().unwrap().push(MockCall {
            model: model.to_string(),
            with_image: request.has_image(),
        });

        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(model)
            .and_then(|queue| queue.pop_front());

        scripted
            .unwrap_or_else(|| self.default_reply.clone())
            .into_result()
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        *self.list_calls.lock().unwrap() += 1;
        self.available_models
            .clone()
            .ok_or_else(|| Error::AiProvider("Model listing unavailable".to_string()))
    }
}
