//! Gemini `generateContent` backend with function calling.

use crate::backend::{
    LlmBackend, LlmMessage, LlmProvider, LlmRequest, LlmResponse, TokenUsage, ToolCall,
};
use crate::error::LlmError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use ulid::Ulid;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini backend configuration.
#[derive(Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL up to and including `/models`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sampling temperature used when the request does not set one.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    /// Creates a configuration with default model and endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// [`LlmBackend`] for the Gemini API.
pub struct GeminiBackend {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    /// Creates a backend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the API key is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "Gemini API key is empty".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Builds the JSON request body.
    ///
    /// Consecutive tool results are folded into a single `user` content so
    /// each `functionResponse` batch answers exactly one `functionCall` batch.
    pub(crate) fn build_request_body(&self, request: &LlmRequest) -> JsonValue {
        let mut contents: Vec<JsonValue> = Vec::new();
        let mut pending_responses: Vec<JsonValue> = Vec::new();

        for message in &request.messages {
            if let LlmMessage::Tool { name, content, .. } = message {
                pending_responses.push(json!({
                    "functionResponse": {
                        "name": name,
                        "response": tool_response_object(content),
                    }
                }));
                continue;
            }

            if !pending_responses.is_empty() {
                contents.push(json!({
                    "role": "user",
                    "parts": std::mem::take(&mut pending_responses),
                }));
            }

            match message {
                LlmMessage::User { content } => contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": content }],
                })),
                LlmMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut parts = Vec::new();
                    if !content.is_empty() {
                        parts.push(json!({ "text": content }));
                    }
                    parts.extend(tool_calls.iter().map(|call| {
                        json!({
                            "functionCall": { "name": call.name, "args": call.arguments }
                        })
                    }));
                    // Gemini rejects empty text parts.
                    if !parts.is_empty() {
                        contents.push(json!({ "role": "model", "parts": parts }));
                    }
                }
                LlmMessage::Tool { .. } => {}
            }
        }

        if !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": pending_responses }));
        }

        let mut body = json!({ "contents": contents });

        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<JsonValue> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        if let Some(temperature) = request.temperature.or(self.config.temperature) {
            body["generationConfig"] = json!({ "temperature": temperature });
        }

        body
    }

    /// Parses a `generateContent` response body.
    pub(crate) fn parse_response(&self, body: &JsonValue) -> Result<LlmResponse, LlmError> {
        let candidate = body["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response contained no candidates".to_string(),
            })?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate["content"]["parts"].as_array().into_iter().flatten() {
            if let Some(text) = part["text"].as_str() {
                content.push_str(text);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call["name"]
                    .as_str()
                    .ok_or_else(|| LlmError::ResponseParseFailed {
                        reason: "functionCall without a name".to_string(),
                    })?;
                let id = call["id"]
                    .as_str()
                    .map_or_else(|| format!("call_{}", Ulid::new()), str::to_string);
                let arguments = match &call["args"] {
                    JsonValue::Null => json!({}),
                    args => args.clone(),
                };
                tool_calls.push(ToolCall::new(id, name, arguments));
            }
        }

        if content.is_empty() && tool_calls.is_empty() {
            return Err(LlmError::ResponseParseFailed {
                reason: format!(
                    "candidate has no text or function calls (finishReason: {})",
                    candidate["finishReason"].as_str().unwrap_or("unknown")
                ),
            });
        }

        let usage = TokenUsage {
            input_tokens: token_count(&body["usageMetadata"]["promptTokenCount"]),
            output_tokens: token_count(&body["usageMetadata"]["candidatesTokenCount"]),
        };

        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
            model: body["modelVersion"]
                .as_str()
                .unwrap_or(&self.config.model)
                .to_string(),
        })
    }
}

fn token_count(value: &JsonValue) -> u32 {
    value
        .as_u64()
        .and_then(|count| u32::try_from(count).ok())
        .unwrap_or(0)
}

/// Gemini requires `functionResponse.response` to be an object.
fn tool_response_object(content: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(content) {
        Ok(value @ JsonValue::Object(_)) => value,
        _ => json!({ "result": content }),
    }
}

fn map_transport_error(error: &reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout
    } else if error.is_connect() {
        LlmError::ProviderUnavailable {
            provider: "gemini".to_string(),
            reason: error.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            status: None,
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    #[instrument(
        skip(self, request),
        fields(model = %self.config.model, messages = request.messages.len())
    )]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_request_body(request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok());
            warn!(?retry_after_secs, "Gemini rate limit hit");
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                status: Some(status.as_u16()),
                reason,
            });
        }

        let json: JsonValue = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;

        let parsed = self.parse_response(&json)?;
        debug!(
            tool_calls = parsed.tool_calls.len(),
            tokens = parsed.usage.total(),
            "Gemini response received"
        );
        Ok(parsed)
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToolSchema;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(GeminiConfig::new("test-key")).expect("backend")
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = GeminiBackend::new(GeminiConfig::new("  "));
        assert!(matches!(result, Err(LlmError::InvalidConfig { .. })));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", GeminiConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn endpoint_uses_model_and_base_url() {
        let backend = GeminiBackend::new(
            GeminiConfig::new("k")
                .with_model("gemini-test")
                .with_base_url("http://localhost:9999/models/"),
        )
        .expect("backend");
        assert_eq!(
            backend.endpoint(),
            "http://localhost:9999/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn request_body_maps_history_and_tools() {
        let request = LlmRequest::new(vec![
            LlmMessage::User {
                content: "add milk and eggs".to_string(),
            },
            LlmMessage::Assistant {
                content: String::new(),
                tool_calls: vec![
                    ToolCall::new("c1", "create_task", json!({"title": "milk"})),
                    ToolCall::new("c2", "create_task", json!({"title": "eggs"})),
                ],
            },
            LlmMessage::Tool {
                tool_call_id: "c1".to_string(),
                name: "create_task".to_string(),
                content: r#"{"status":"success"}"#.to_string(),
            },
            LlmMessage::Tool {
                tool_call_id: "c2".to_string(),
                name: "create_task".to_string(),
                content: "not json".to_string(),
            },
        ])
        .with_system("be brief")
        .with_tools(vec![ToolSchema {
            name: "create_task".to_string(),
            description: "Create".to_string(),
            parameters: json!({"type": "object"}),
        }]);

        let body = backend().build_request_body(&request);
        let contents = body["contents"].as_array().expect("contents");

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "create_task");

        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["response"]["status"], "success");
        assert_eq!(responses[1]["functionResponse"]["response"]["result"], "not json");

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "create_task"
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn parse_response_extracts_text() {
        let body = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "All done." }] } }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3 }
        });

        let response = backend().parse_response(&body).expect("parse");

        assert_eq!(response.content, "All done.");
        assert!(!response.requests_tools());
        assert_eq!(response.usage.total(), 15);
        assert_eq!(response.model, "gemini-2.5-pro");
    }

    #[test]
    fn parse_response_extracts_function_calls_in_order() {
        let body = json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "create_task", "args": { "title": "buy milk" } } },
                { "functionCall": { "id": "given", "name": "list_tasks" } }
            ] } }]
        });

        let response = backend().parse_response(&body).expect("parse");

        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].name, "create_task");
        assert!(response.tool_calls[0].id.starts_with("call_"));
        assert_eq!(response.tool_calls[0].arguments["title"], "buy milk");
        assert_eq!(response.tool_calls[1].id, "given");
        assert_eq!(response.tool_calls[1].arguments, json!({}));
    }

    #[test]
    fn parse_response_without_candidates_fails() {
        let err = backend()
            .parse_response(&json!({ "promptFeedback": {} }))
            .unwrap_err();
        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }

    #[test]
    fn parse_response_with_empty_candidate_fails() {
        let body = json!({
            "candidates": [{ "finishReason": "SAFETY", "content": { "role": "model" } }]
        });

        let err = backend().parse_response(&body).unwrap_err();

        assert!(matches!(
            &err,
            LlmError::ResponseParseFailed { reason } if reason.contains("SAFETY")
        ));
    }

    #[test]
    fn request_body_omits_empty_model_messages() {
        let request = LlmRequest::new(vec![
            LlmMessage::User {
                content: "hi".to_string(),
            },
            LlmMessage::Assistant {
                content: String::new(),
                tool_calls: Vec::new(),
            },
            LlmMessage::User {
                content: "hello?".to_string(),
            },
        ]);

        let body = backend().build_request_body(&request);
        let contents = body["contents"].as_array().expect("contents");

        assert_eq!(contents.len(), 2);
        assert!(contents.iter().all(|content| content["role"] == "user"));
        assert!(!body.to_string().contains(r#""text":"""#));
    }
}
