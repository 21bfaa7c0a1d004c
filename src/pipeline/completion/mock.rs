use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::types::{CompletionClient, CompletionRequest, CompletionResponse, WireMessage};
use super::CompletionError;
use crate::models::TokenUsage;

/// Mock completion client for testing: replays a scripted list of replies.
///
/// Every call pops the next scripted reply and records the request it was
/// given. Usage is synthetic: 10 prompt tokens per message, 5 completion tokens.
pub struct MockCompletionClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Client whose calls all succeed with the given texts, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(text.into()));
        }
    }

    pub fn push_error(&self, error: CompletionError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error));
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionClient for MockCompletionClient {
    fn get_completion(
        &self,
        system_prompt: &str,
        history: &[WireMessage],
    ) -> Result<CompletionResponse, CompletionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(CompletionRequest {
                system_prompt: system_prompt.to_string(),
                messages: history.to_vec(),
            });
        }

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| {
                Err(CompletionError::Provider {
                    status: 500,
                    body: "mock script exhausted".into(),
                })
            });

        let text = next?;
        let prompt_tokens = 10 * history.len() as u64;
        let completion_tokens = 5;
        Ok(CompletionResponse {
            text,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }
}
