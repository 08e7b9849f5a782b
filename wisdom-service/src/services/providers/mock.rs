//! Mock provider implementations for testing.

use super::{
    EmbeddingProvider, FinishReason, GenerationParams, ProviderError, ProviderResponse,
    QueryRequest, TextProvider, VectorIndex,
};
use crate::models::Match;
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock embedding provider returning a fixed vector.
pub struct MockEmbeddingProvider {
    enabled: bool,
    inputs: Mutex<Vec<String>>,
}

impl MockEmbeddingProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Texts passed to `embed`, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NetworkError(
                "Mock embedding provider not enabled".to_string(),
            ));
        }

        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(text.to_string());
        }

        Ok(vec![0.25, 0.5, 0.75])
    }
}

/// Mock vector index serving a fixed, ranked list of matches.
pub struct MockVectorIndex {
    matches: Vec<Match>,
    enabled: bool,
    requests: Mutex<Vec<QueryRequest>>,
}

impl MockVectorIndex {
    pub fn new(matches: Vec<Match>) -> Self {
        Self {
            matches,
            enabled: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            enabled: false,
            ..Self::new(Vec::new())
        }
    }

    /// Queries received, in call order.
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Match>, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::ApiError(
                "Mock vector index not enabled".to_string(),
            ));
        }

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        Ok(self
            .matches
            .iter()
            .take(request.top_k as usize)
            .cloned()
            .collect())
    }
}

/// How the mock text provider answers.
pub enum MockReply {
    /// Echo a fixed string.
    Fixed(String),
    /// Succeed with no text.
    Empty,
    /// Fail every call.
    Fail,
}

/// Mock text provider recording every prompt and parameter set it receives.
pub struct MockTextProvider {
    reply: MockReply,
    prompts: Mutex<Vec<String>>,
    params: Mutex<Vec<GenerationParams>>,
}

impl MockTextProvider {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
            params: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::Fixed(text.into()))
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Generation parameters received, in call order.
    pub fn params(&self) -> Vec<GenerationParams> {
        self.params.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Ok(mut seen) = self.params.lock() {
            seen.push(*params);
        }

        let text = match &self.reply {
            MockReply::Fixed(text) => Some(text.clone()),
            MockReply::Empty => None,
            MockReply::Fail => {
                return Err(ProviderError::ApiError(
                    "Mock text provider failure".to_string(),
                ))
            }
        };

        Ok(ProviderResponse {
            text,
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: 10,
            finish_reason: FinishReason::Complete,
        })
    }

    fn model(&self) -> &str {
        "mock-text"
    }
}
