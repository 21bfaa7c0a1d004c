use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::types::{CompletionClient, CompletionResponse, WireMessage};
use super::CompletionError;
use crate::config::ProviderConfig;
use crate::models::{CallPurpose, TokenUsage};

/// Path fragment that marks an Azure OpenAI deployment URL.
const AZURE_DEPLOYMENT_MARKER: &str = "/openai/deployments/";

const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";

const PROBE_SYSTEM_PROMPT: &str = "You are a connection test helper.";
const PROBE_USER_PROMPT: &str = "Reply with the word PONG.";
const PROBE_MAX_TOKENS: u32 = 16;

/// Where chat completion requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// OpenAI-compatible API: bearer auth, model named in the body.
    OpenAi { base_url: String },
    /// Azure deployment: `api-key` header, `api-version` query parameter.
    Azure {
        base_url: String,
        api_version: String,
    },
}

impl Endpoint {
    /// Resolve an endpoint from a configured base URL.
    ///
    /// Query strings and a trailing `/chat/completions` are stripped; an
    /// `api-version` in the query is used when none is configured.
    pub fn resolve(raw_url: &str, api_version: Option<&str>) -> Result<Self, CompletionError> {
        let (base_url, version_from_url) = normalize_base_url(raw_url)?;
        let api_version = api_version
            .map(str::to_string)
            .filter(|v| !v.trim().is_empty())
            .or(version_from_url);

        if base_url.contains(AZURE_DEPLOYMENT_MARKER) {
            let api_version = api_version.ok_or_else(|| {
                CompletionError::Config(
                    "base URL points to an Azure deployment but no api_version was provided"
                        .into(),
                )
            })?;
            Ok(Self::Azure {
                base_url,
                api_version,
            })
        } else {
            Ok(Self::OpenAi { base_url })
        }
    }

    pub fn chat_url(&self) -> String {
        match self {
            Self::OpenAi { base_url } => format!("{base_url}{CHAT_COMPLETIONS_SUFFIX}"),
            Self::Azure {
                base_url,
                api_version,
            } => format!("{base_url}{CHAT_COMPLETIONS_SUFFIX}?api-version={api_version}"),
        }
    }

    fn base_url(&self) -> &str {
        match self {
            Self::OpenAi { base_url } | Self::Azure { base_url, .. } => base_url,
        }
    }
}

/// Strip query, fragment and a `/chat/completions` suffix from a base URL.
/// Returns the cleaned URL and any `api-version` found in the query.
pub fn normalize_base_url(raw_url: &str) -> Result<(String, Option<String>), CompletionError> {
    let mut url = Url::parse(raw_url.trim())
        .map_err(|e| CompletionError::Config(format!("invalid base URL {raw_url:?}: {e}")))?;

    let api_version = url
        .query_pairs()
        .find(|(key, _)| key == "api-version")
        .map(|(_, value)| value.into_owned());

    let path = url.path().trim_end_matches('/').to_string();
    let path = path
        .strip_suffix(CHAT_COMPLETIONS_SUFFIX)
        .unwrap_or(&path)
        .to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok((url.as_str().trim_end_matches('/').to_string(), api_version))
}

/// HTTP client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiClient {
    endpoint: Endpoint,
    api_key: String,
    model_name: String,
    temperature: f32,
    enable_thinking: bool,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    /// Create a client from provider settings.
    pub fn new(config: &ProviderConfig) -> Result<Self, CompletionError> {
        let endpoint = Endpoint::resolve(&config.base_url, config.api_version.as_deref())?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            temperature: config.temperature,
            enable_thinking: config.enable_thinking,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Send a minimal request to verify endpoint, key and model.
    /// Returns the model's reply text.
    pub fn check_connection(&self) -> Result<String, CompletionError> {
        let messages = [WireMessage::user(PROBE_USER_PROMPT)];
        let response = self.send(PROBE_SYSTEM_PROMPT, &messages, Some(PROBE_MAX_TOKENS))?;
        tracing::info!(
            purpose = CallPurpose::Probe.as_str(),
            endpoint = %self.endpoint.base_url(),
            model = %self.model_name,
            reply = %response.text,
            "Completion endpoint reachable"
        );
        Ok(response.text)
    }

    fn build_request<'a>(
        &'a self,
        system_prompt: &'a str,
        history: &'a [WireMessage],
        max_completion_tokens: Option<u32>,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(history.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        ChatRequest {
            model: &self.model_name,
            messages,
            temperature: self.temperature,
            max_completion_tokens,
            chat_template_kwargs: TemplateKwargs {
                enable_thinking: self.enable_thinking,
            },
        }
    }

    fn send(
        &self,
        system_prompt: &str,
        history: &[WireMessage],
        max_completion_tokens: Option<u32>,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = self.build_request(system_prompt, history, max_completion_tokens);
        let request = self.client.post(self.endpoint.chat_url()).json(&body);
        let request = match &self.endpoint {
            Endpoint::OpenAi { .. } => request.bearer_auth(&self.api_key),
            Endpoint::Azure { .. } => request.header("api-key", &self.api_key),
        };

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                CompletionError::Connection(self.endpoint.base_url().to_string())
            } else if e.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CompletionError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Http(e.to_string())
            }
        })?;

        decode_response(&raw)
    }
}

impl CompletionClient for OpenAiClient {
    fn get_completion(
        &self,
        system_prompt: &str,
        history: &[WireMessage],
    ) -> Result<CompletionResponse, CompletionError> {
        let _span = tracing::debug_span!(
            "get_completion",
            model = %self.model_name,
            messages = history.len()
        )
        .entered();
        self.send(system_prompt, history, None)
    }
}

/// Request body for `POST /chat/completions`
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    chat_template_kwargs: TemplateKwargs,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct TemplateKwargs {
    enable_thinking: bool,
}

/// Response body from `POST /chat/completions`
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a chat completion body into text + usage.
fn decode_response(raw: &str) -> Result<CompletionResponse, CompletionError> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".into()))?;

    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    Ok(CompletionResponse {
        text,
        usage: parsed.usage.unwrap_or_default(),
    })
}
