// ABOUTME: Vision-model product identification via the Gemini client
// ABOUTME: Single-product identify plus detailed multi-product scan with weights
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Vision recognizer
//!
//! Sends the re-encoded upload inline to the hosted model with a fixed
//! instruction demanding a small JSON object. Model output is hostile by
//! default: fences are stripped before parsing and a parse failure is a
//! recoverable `Malformed` outcome that retains the raw text. Acceptance
//! thresholding on the returned confidence is pipeline policy, not handled
//! here.

use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AttemptOutcome, Recognizer, ScanInput};
use crate::errors::{AppError, AppResult};
use crate::imaging::encode_jpeg_base64;
use crate::llm::{strip_code_fences, GeminiClient};
use crate::models::{NormalizedProduct, SourceMethod};

/// Fixed instruction for single-product identification
const IDENTIFY_PROMPT: &str = "\
Analyze this image and identify the main food product. Return ONLY valid JSON:
{
  \"product_name\": \"Product Name\",
  \"brand\": \"Brand Name or null\",
  \"category\": \"food category\",
  \"confidence\": 0.85
}";

/// Fixed instruction for the detailed multi-product scan
const DETAILED_PROMPT: &str = "\
Find and identify all the food products in the image. Return ONLY valid JSON in this format:
{
  \"total_products\": 2,
  \"analysis_confidence\": 0.85,
  \"products\": [
    {
      \"name\": \"product name\",
      \"brand\": \"brand or null\",
      \"category\": \"category\",
      \"estimated_weight_grams\": 100,
      \"confidence\": 0.9,
      \"is_food\": true
    }
  ],
  \"total_estimated_weight\": 100
}";

#[derive(Debug, Deserialize)]
struct VisionIdentification {
    product_name: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    confidence: Option<f64>,
}

/// One product from the detailed multi-product scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedProduct {
    /// Identified product name
    #[serde(default)]
    pub name: String,
    /// Brand, if visible
    #[serde(default)]
    pub brand: Option<String>,
    /// Food category
    #[serde(default)]
    pub category: Option<String>,
    /// Model's weight estimate for this item, in grams
    #[serde(default)]
    pub estimated_weight_grams: Option<f64>,
    /// Per-item confidence
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Whether the model judged the item to be food
    #[serde(default = "default_is_food")]
    pub is_food: bool,
}

fn default_is_food() -> bool {
    true
}

/// Result of the detailed multi-product scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedScan {
    /// Number of products the model reported
    #[serde(default)]
    pub total_products: u32,
    /// Overall analysis confidence
    #[serde(default)]
    pub analysis_confidence: Option<f64>,
    /// Identified products with weight estimates
    #[serde(default)]
    pub products: Vec<DetailedProduct>,
    /// Sum of estimated weights, in grams
    #[serde(default)]
    pub total_estimated_weight: Option<f64>,
    /// Set when truncated model JSON had to be repaired before parsing
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub json_repaired: bool,
}

/// Recognizer backed by the hosted vision-capable generative model
#[derive(Debug, Clone)]
pub struct VisionModelIdentify {
    client: Option<Arc<GeminiClient>>,
}

impl VisionModelIdentify {
    /// Create the vision recognizer; `None` means no API key is configured
    #[must_use]
    pub fn new(client: Option<Arc<GeminiClient>>) -> Self {
        Self { client }
    }

    /// Detailed multi-product analysis with per-item weight estimates
    ///
    /// Truncated model JSON is repaired by appending the missing closing
    /// delimiters before the parse is abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error when no client is configured, the remote call
    /// fails, or the response cannot be parsed even after repair.
    pub async fn analyze_products_with_weights(
        &self,
        image: &DynamicImage,
    ) -> AppResult<DetailedScan> {
        let client = self.client.as_ref().ok_or_else(|| {
            AppError::config("vision model not configured; set GEMINI_API_KEY")
        })?;

        let payload = encode_jpeg_base64(image)?;
        let content = client.generate_with_image(DETAILED_PROMPT, &payload).await?;
        let content = strip_code_fences(&content);

        match serde_json::from_str::<DetailedScan>(content) {
            Ok(scan) => {
                info!(products = scan.total_products, "detailed vision scan complete");
                Ok(scan)
            }
            Err(parse_err) => match repair_truncated_json(content) {
                Some(repaired) => {
                    let mut scan: DetailedScan =
                        serde_json::from_str(&repaired).map_err(|e| {
                            AppError::external_service(
                                "vision",
                                format!("unparsable detailed response: {e}"),
                            )
                        })?;
                    warn!("repaired truncated JSON from vision model");
                    scan.json_repaired = true;
                    Ok(scan)
                }
                None => Err(AppError::external_service(
                    "vision",
                    format!("unparsable detailed response: {parse_err}"),
                )),
            },
        }
    }
}

#[async_trait]
impl Recognizer for VisionModelIdentify {
    fn method(&self) -> SourceMethod {
        SourceMethod::VisionModel
    }

    async fn attempt(&self, input: &ScanInput<'_>) -> AttemptOutcome {
        let ScanInput::Image { image, .. } = input else {
            return AttemptOutcome::Miss {
                message: "vision identification requires an image".to_owned(),
            };
        };

        let Some(client) = self.client.as_ref() else {
            return AttemptOutcome::Unavailable {
                message: "no vision API key configured".to_owned(),
            };
        };

        let payload = match encode_jpeg_base64(image) {
            Ok(payload) => payload,
            Err(e) => {
                return AttemptOutcome::Miss {
                    message: format!("could not prepare vision payload: {e}"),
                }
            }
        };

        let raw = match client.generate_with_image(IDENTIFY_PROMPT, &payload).await {
            Ok(raw) => raw,
            Err(e) => {
                return AttemptOutcome::Miss {
                    message: format!("vision request failed: {e}"),
                }
            }
        };

        let content = strip_code_fences(&raw);
        let identification: VisionIdentification = match serde_json::from_str(content) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "vision response was not the requested JSON");
                return AttemptOutcome::Malformed {
                    message: format!("vision response JSON parse failed: {e}"),
                    raw: raw.clone(),
                };
            }
        };

        let product = NormalizedProduct::new(
            identification.product_name.unwrap_or_default(),
            identification.confidence,
            SourceMethod::VisionModel,
        )
        .with_brand(identification.brand.filter(|b| b != "null"))
        .with_category(identification.category)
        .with_raw_attribute(
            "model",
            serde_json::Value::String(client.model().to_owned()),
        );

        AttemptOutcome::Product(product)
    }
}

/// Close unbalanced braces in truncated model output
///
/// Returns `None` when the text has no unclosed braces or brackets (repair
/// would not change anything). Delimiters inside string literals are ignored.
fn repair_truncated_json(content: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in content.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    if stack.is_empty() {
        return None;
    }

    let mut repaired = content.to_owned();
    // A cut mid-string leaves the literal unterminated as well.
    if in_string {
        repaired.push('"');
    }
    while let Some(closer) = stack.pop() {
        repaired.push(closer);
    }
    Some(repaired)
}
