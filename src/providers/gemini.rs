use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{TranslationBackend, TranslationRequest};
use crate::translation::prompts::SystemInstructionBuilder;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Gemini client for the Generative Language API
pub struct GeminiBackend {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
    /// Model name
    model: String,
}

// Keeps the key out of debug output
impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// System prompt to guide the model
    pub system_instruction: GeminiContent,

    /// Conversation turns
    pub contents: Vec<GeminiContent>,

    pub generation_config: GenerationConfig,
}

/// One turn of content
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

/// Generation parameters
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
    pub temperature: f32,
}

/// generateContent response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: GeminiContent,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GeminiRequest {
    /// Build the request for a batch of texts
    pub fn for_batch(texts: &[String], request: &TranslationRequest) -> Result<Self, ProviderError> {
        let payload = serde_json::to_string(texts)
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to encode batch: {}", e)))?;

        Ok(Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SystemInstructionBuilder::from_request(request).build(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: payload }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "An array of translated strings corresponding exactly to the input strings."
                }),
                temperature: DEFAULT_TEMPERATURE,
            },
        })
    }
}

impl GeminiBackend {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// URL of the generateContent call for the configured model
    pub fn api_url(&self) -> Result<Url, ProviderError> {
        let base = format!("{}/", self.endpoint.trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|url| url.join(&format!("v1beta/models/{}:generateContent", self.model)))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini endpoint '{}': {}", self.endpoint, e)))
    }

    /// Send a generateContent request
    pub async fn complete(&self, request: &GeminiRequest) -> Result<GeminiResponse, ProviderError> {
        let api_url = self.api_url()?;

        let response = self
            .client
            .post(api_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(format!("Failed to reach Gemini API: {}", e))
                } else {
                    ProviderError::RequestFailed(format!("Failed to send request to Gemini API: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e)))
    }

    /// Extract the text of the first candidate
    pub fn extract_text_from_response(response: &GeminiResponse) -> Option<String> {
        let candidate = response.candidates.first()?;
        let text: String = candidate.content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn status_error(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

/// Parse the model output into a list of strings.
///
/// The answer must be a JSON array whose elements are all strings. A
/// surrounding markdown code fence is tolerated.
pub fn parse_translation_array(text: &str) -> Result<Vec<String>, ProviderError> {
    let body = strip_code_fence(text.trim());

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::ParseError(format!("Response is not valid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::ParseError("API returned invalid format (not an array)".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ProviderError::ParseError(format!("Element {} is not a string", idx)))
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    async fn translate(
        &self,
        texts: &[String],
        request: &TranslationRequest,
    ) -> Result<Vec<String>, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::AuthenticationError("Missing API Key".to_string()));
        }

        let body = GeminiRequest::for_batch(texts, request)?;
        debug!("Sending {} line(s) to Gemini model {}", texts.len(), self.model);

        let response = self.complete(&body).await?;

        let text = Self::extract_text_from_response(&response).ok_or_else(|| {
            let reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            ProviderError::ParseError(format!("Empty response from Gemini ({})", reason))
        })?;

        parse_translation_array(&text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
