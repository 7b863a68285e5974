// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! OpenAI vision client for waste classification
//!
//! Sends the system prompt plus a user message carrying the image as a data URL
//! to the chat completions API and asks for a JSON object back. The answer is
//! returned as a [`RawClassification`] without any trust placed in its shape.

use std::time::{Duration, Instant};

use reqwest::{
    Client, ClientBuilder,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::{Span, debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    classifier::{ClassificationRequest, Classifier},
    config::OpenAiConfig,
    error::{ClassifierError, ClassifierResult, ErrorContext},
    prompt::{USER_INSTRUCTION, system_prompt},
    raw::RawClassification,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";

/// OpenAI Chat Completion API request
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    max_completion_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

/// OpenAI Chat Completion API response
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Deserialize)]
struct TokenUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// OpenAI API error response
#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiError {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

/// OpenAI-backed [`Classifier`]
#[derive(Debug, Clone)]
pub struct OpenAiVisionClient {
    client: Client,
    base_url: Url,
    model: String,
    timeout: Duration,
    max_completion_tokens: u32,
}

impl OpenAiVisionClient {
    /// Create a client from a validated configuration
    pub fn new(config: &OpenAiConfig) -> ClassifierResult<Self> {
        config.validate()?;

        let mut base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_API_URL)
                .map_err(|e| ClassifierError::config(format!("Invalid default URL: {e}")))?,
        };
        // Url::join drops the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let timeout = Duration::from_secs(config.timeout_seconds);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| ClassifierError::config(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(org_id) = &config.organization_id {
            headers.insert(
                "OpenAI-Organization",
                HeaderValue::from_str(org_id).map_err(|e| {
                    ClassifierError::config(format!("Invalid organization ID: {e}"))
                })?,
            );
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("waste-classifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClassifierError::http(format!("Failed to create HTTP client: {e}")))?;

        info!(
            base_url = %base_url,
            model = %config.model,
            timeout_seconds = config.timeout_seconds,
            "Created OpenAI vision client"
        );

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            timeout,
            max_completion_tokens: config.max_completion_tokens,
        })
    }

    /// Model this client calls
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> ClassifierResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClassifierError::config(format!("Invalid base URL: {e}")))
    }

    fn build_request(&self, request: &ClassificationRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(system_prompt(&request.region)),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: USER_INSTRUCTION.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: request.image.data_url(),
                            },
                        },
                    ]),
                },
            ],
            response_format: ResponseFormat {
                r#type: "json_object",
            },
            max_completion_tokens: self.max_completion_tokens,
        }
    }

    /// Send the completion request, retrying transient failures with exponential backoff
    async fn send_with_retry(
        &self,
        url: &Url,
        body: &ChatCompletionRequest,
        request_id: Uuid,
    ) -> ClassifierResult<String> {
        // 100ms, 200ms, 400ms with jitter: 3 retries after the first attempt
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor(50)
            .max_delay(Duration::from_secs(10))
            .take(3)
            .map(jitter);

        RetryIf::spawn(
            retry_strategy,
            || self.attempt(url, body, request_id),
            |err: &ClassifierError| {
                let retry = err.is_retryable();
                if retry {
                    warn!(request_id = %request_id, error = %err, "Retryable OpenAI failure");
                }
                retry
            },
        )
        .await
    }

    async fn attempt(
        &self,
        url: &Url,
        body: &ChatCompletionRequest,
        request_id: Uuid,
    ) -> ClassifierResult<String> {
        debug!(request_id = %request_id, url = %url, model = %body.model, "Making API request attempt");

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if (200..300).contains(&status) {
            return Ok(text);
        }

        let context = ErrorContext::new()
            .with_request_id(request_id.to_string())
            .with_operation("openai_chat_completion".to_string())
            .with_metadata("status_code".to_string(), status.to_string())
            .with_metadata("url".to_string(), url.to_string());

        Err(Self::error_from_status(status, &text, &context))
    }

    fn transport_error(&self, err: reqwest::Error) -> ClassifierError {
        if err.is_timeout() {
            ClassifierError::timeout(self.timeout.as_secs())
        } else {
            err.into()
        }
    }

    /// Map a non-success status and body to the error taxonomy
    fn error_from_status(status: u16, body: &str, context: &ErrorContext) -> ClassifierError {
        let message = match serde_json::from_str::<OpenAiErrorResponse>(body) {
            Ok(parsed) => format!(
                "OpenAI API error ({status}): {} (type: {:?}, code: {:?})",
                parsed.error.message, parsed.error.r#type, parsed.error.code
            ),
            Err(_) => format!("HTTP {status} error: {body}"),
        };

        error!("{message}");

        match status {
            401 | 403 => ClassifierError::authentication(message),
            408 => ClassifierError::http_with_context(message, context),
            429 => ClassifierError::rate_limit(60),
            500..=599 => ClassifierError::service_unavailable(message),
            _ => ClassifierError::openai_with_context(message, context),
        }
    }

    /// Extract the raw payload from a completion body
    fn parse_completion(body: &str, request_id: Uuid) -> ClassifierResult<RawClassification> {
        let completion: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
            ClassifierError::invalid_response(format!("Failed to parse response: {e}"))
        })?;

        if let Some(usage) = &completion.usage {
            debug!(
                request_id = %request_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Token usage statistics"
            );
        }

        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            ClassifierError::invalid_response("No choices in completion response")
        })?;

        let content = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ClassifierError::invalid_response(format!(
                    "No content in completion response (finish_reason: {:?})",
                    choice.finish_reason
                ))
            })?;

        match RawClassification::try_from_json_str(&content) {
            Ok(raw) => {
                debug!(
                    request_id = %request_id,
                    model = completion.model.as_deref().unwrap_or("unknown"),
                    "Received classification payload"
                );
                Ok(raw)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    error = %e,
                    content_length = content.len(),
                    "Model returned non-JSON content, treating as empty payload"
                );
                Ok(RawClassification::empty())
            }
        }
    }
}

impl Classifier for OpenAiVisionClient {
    #[instrument(skip(self, request), fields(model = %self.model, region = %request.region, request_id))]
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> ClassifierResult<RawClassification> {
        let request_id = Uuid::new_v4();
        Span::current().record("request_id", request_id.to_string());

        info!(
            request_id = %request_id,
            mime_type = request.image.mime_type(),
            image_bytes = request.image.base64_data().len(),
            "Starting classification request"
        );

        let url = self.endpoint("chat/completions")?;
        let body = self.build_request(request);

        let start_time = Instant::now();
        let response_text = self.send_with_retry(&url, &body, request_id).await?;
        debug!(
            request_id = %request_id,
            duration_ms = start_time.elapsed().as_millis(),
            "API request completed"
        );

        Self::parse_completion(&response_text, request_id)
    }

    async fn health_check(&self) -> ClassifierResult<bool> {
        debug!("Performing OpenAI API health check");

        let url = self.endpoint("models")?;
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("OpenAI API health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!(status = %response.status(), "OpenAI API health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "OpenAI API health check failed");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}
