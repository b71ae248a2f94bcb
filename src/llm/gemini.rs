// ABOUTME: Google Gemini client for text and inline-image generation
// ABOUTME: Wraps the generateContent endpoint with typed request/response DTOs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! # Gemini Client
//!
//! Thin authenticated transport over the Generative Language API. The
//! vision recognizer sends a fixed instruction plus an inline JPEG payload;
//! the advisory path sends text only. Both go through [`GeminiClient`].
//!
//! Set the `GEMINI_API_KEY` environment variable with a key from Google AI
//! Studio. Without it the client is never constructed and the callers that
//! depend on it report themselves unavailable.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::ServerConfig;
use crate::errors::{AppError, ErrorCode};
use crate::http_client::shared_client;

/// Base URL for the Generative Language API
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// MIME type of the inline vision payload
const INLINE_IMAGE_MIME: &str = "image/jpeg";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ContentPart>,
}

/// Part of content (text or inline binary data)
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

// ============================================================================
// Client Implementation
// ============================================================================

/// Google Gemini generative model client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new client with an API key and model name
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE_URL.to_owned(),
            client: shared_client().clone(),
        }
    }

    /// Build a client from configuration; `None` when no API key is set
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Option<Self> {
        config
            .gemini_api_key
            .as_ref()
            .map(|key| Self::new(key.clone(), config.gemini_model.clone()))
    }

    /// Override the API base URL (test servers)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Model name this client sends requests to
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate free text from a text-only prompt
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP call fails, the API reports an error,
    /// or the response carries no content.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate_text(
        &self,
        prompt: &str,
        max_output_tokens: Option<u32>,
    ) -> Result<String, AppError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![ContentPart::Text {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: max_output_tokens.map(|max| GenerationConfig {
                temperature: None,
                max_output_tokens: Some(max),
            }),
        };
        self.dispatch(&request).await
    }

    /// Generate free text from an instruction plus an inline base64 JPEG
    ///
    /// # Errors
    ///
    /// Same failure cases as [`Self::generate_text`].
    #[instrument(skip(self, prompt, jpeg_base64), fields(model = %self.model))]
    pub async fn generate_with_image(
        &self,
        prompt: &str,
        jpeg_base64: &str,
    ) -> Result<String, AppError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![
                    ContentPart::Text {
                        text: prompt.to_owned(),
                    },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: INLINE_IMAGE_MIME.to_owned(),
                            data: jpeg_base64.to_owned(),
                        },
                    },
                ],
            }],
            generation_config: None,
        };
        self.dispatch(&request).await
    }

    async fn dispatch(&self, request: &GeminiRequest) -> Result<String, AppError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!("sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                AppError::external_service("gemini", format!("HTTP request failed: {e}"))
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            AppError::external_service("gemini", format!("failed to read response: {e}"))
        })?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &response_text));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                error!(error = %e, "failed to parse Gemini response envelope");
                AppError::new(
                    ErrorCode::SerializationError,
                    format!("failed to parse Gemini response: {e}"),
                )
            })?;

        if let Some(api_error) = gemini_response.error {
            return Err(AppError::external_service("gemini", api_error.message));
        }

        Self::extract_content(&gemini_response)
    }

    /// Extract the first text part from the response
    fn extract_content(response: &GeminiResponse) -> Result<String, AppError> {
        let part = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .ok_or_else(|| AppError::external_service("gemini", "no content in response"))?;

        match part {
            ContentPart::Text { text } => Ok(text.clone()),
            ContentPart::InlineData { .. } => Err(AppError::external_service(
                "gemini",
                "unexpected inline data in model output",
            )),
        }
    }

    /// Map API error status to an appropriate error type
    ///
    /// Rate limit (429) responses surface the quota retry hint from the API
    /// as a user-facing message.
    fn map_api_error(status: u16, response_text: &str) -> AppError {
        let message = serde_json::from_str::<GeminiResponse>(response_text)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| response_text.to_owned(), |e| e.message);

        match status {
            429 => AppError::new(
                ErrorCode::ExternalRateLimited,
                Self::extract_quota_message(&message),
            ),
            _ => AppError::external_service("gemini", format!("API error ({status}): {message}")),
        }
    }

    /// Extract a user-friendly quota message from a 429 error body
    fn extract_quota_message(message: &str) -> String {
        // Example: "Please retry in 6.406453963s."
        if let Some(retry_pos) = message.find("Please retry in ") {
            let after_prefix = &message[retry_pos + 16..];
            if let Some(s_pos) = after_prefix.find('s') {
                if let Ok(seconds) = after_prefix[..s_pos].parse::<f64>() {
                    let seconds_int = seconds.ceil() as u64;
                    return format!(
                        "AI service quota exceeded. Please try again in {seconds_int} seconds."
                    );
                }
            }
        }
        "AI service quota exceeded. Please wait a moment and try again.".to_owned()
    }
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_message_extracts_retry_seconds() {
        let message = "Resource exhausted. Please retry in 6.406453963s.";
        let friendly = GeminiClient::extract_quota_message(message);
        assert!(friendly.contains("7 seconds"));
    }

    #[test]
    fn quota_message_falls_back_when_unparsable() {
        let friendly = GeminiClient::extract_quota_message("quota exceeded");
        assert!(friendly.contains("quota exceeded"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = GeminiClient::new("secret-key", "gemini-2.0-flash-001");
        let output = format!("{client:?}");
        assert!(!output.contains("secret-key"));
        assert!(output.contains("REDACTED"));
    }

    #[test]
    fn inline_data_serializes_camel_case() {
        let part = ContentPart::InlineData {
            inline_data: InlineData {
                mime_type: "image/jpeg".to_owned(),
                data: "AAAA".to_owned(),
            },
        };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("inlineData"));
        assert!(json.contains("mimeType"));
    }
}
