//! Shared test helpers: scripted providers.

use responder_core::error::ProviderError;
use responder_core::message::ChatMessage;
use responder_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A provider that plays back a fixed sequence of outcomes.
///
/// Once the script runs out, the last outcome repeats.
pub struct ScriptedProvider {
    script: Vec<Result<String, ProviderError>>,
    call_count: Mutex<usize>,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script,
            call_count: Mutex::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always answers `text`.
    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Always fails with a network error.
    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::Network("connection refused".into()))])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = {
            let mut count = self.call_count.lock().unwrap();
            let index = (*count).min(self.script.len().saturating_sub(1));
            *count += 1;
            index
        };
        let model = request.model.clone();
        *self.last_request.lock().unwrap() = Some(request);

        match &self.script[index] {
            Ok(text) => Ok(make_text_response(text, &model)),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: ChatMessage::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.to_string(),
    }
}
