// ABOUTME: Recognizer trait and the shared attempt-outcome contract
// ABOUTME: All recognition strategies converge on NormalizedProduct or a typed failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! # Recognition Strategies
//!
//! Every strategy that can identify a food/product implements [`Recognizer`]
//! and returns an [`AttemptOutcome`]. The pipeline consumes outcomes
//! uniformly: per-method errors are never raised as `Err` across this seam;
//! they are values the pipeline records and steps past.
//!
//! `Unavailable` is kept distinct from `Miss` on purpose: when a capability
//! is structurally absent (no decode backend compiled in, no API key) the
//! pipeline can skip ahead without burning a remote call, whereas a miss is
//! a runtime outcome of a real attempt.

/// Visual barcode symbology decoding
pub mod barcode;
/// Remote product catalog lookup and search
pub mod catalog;
/// Vocabulary fallback of last resort
pub mod heuristic;
/// Vision-model product identification
pub mod vision;

pub use barcode::BarcodeDecode;
pub use catalog::{CatalogClient, RemoteCatalogLookup};
pub use heuristic::HeuristicFallback;
pub use vision::VisionModelIdentify;

use async_trait::async_trait;
use image::DynamicImage;

use crate::models::{AttemptLog, NormalizedProduct, SourceMethod};

/// Input handed to a recognizer attempt
#[derive(Clone, Copy)]
pub enum ScanInput<'a> {
    /// A decoded bitmap with an optional filename-stem hint
    Image {
        /// Decoded upload
        image: &'a DynamicImage,
        /// Filename stem, if the caller had one
        hint: Option<&'a str>,
    },
    /// A bare barcode string supplied directly by the caller
    Barcode(&'a str),
}

/// Result of a single recognizer attempt
///
/// The tagged variants replace the original system's duck-typed result
/// dictionaries: every strategy resolves to exactly one of these at its
/// boundary.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// A normalized product was identified
    Product(NormalizedProduct),
    /// A barcode symbol was decoded; the product itself is not yet known
    Barcode(String),
    /// The method ran and found nothing
    Miss {
        /// What the method looked for and why it came up empty
        message: String,
    },
    /// The capability is structurally absent (missing backend or credential)
    Unavailable {
        /// What is missing
        message: String,
    },
    /// The method produced output that could not be parsed
    Malformed {
        /// Parse failure description
        message: String,
        /// Raw text retained for diagnostics
        raw: String,
    },
}

impl AttemptOutcome {
    /// Whether this outcome carries a usable result
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Product(_) | Self::Barcode(_))
    }

    /// Convert this outcome into a diagnostic log entry for `method`
    #[must_use]
    pub fn to_log(&self, method: SourceMethod) -> AttemptLog {
        match self {
            Self::Product(product) => AttemptLog {
                method,
                success: true,
                message: format!(
                    "identified {} (confidence {:.2})",
                    product.name, product.confidence
                ),
                data: serde_json::to_value(product).ok(),
            },
            Self::Barcode(code) => AttemptLog {
                method,
                success: true,
                message: format!("decoded barcode {code}"),
                data: Some(serde_json::json!({ "barcode": code })),
            },
            Self::Miss { message } => AttemptLog {
                method,
                success: false,
                message: message.clone(),
                data: None,
            },
            Self::Unavailable { message } => AttemptLog {
                method,
                success: false,
                message: format!("capability unavailable: {message}"),
                data: None,
            },
            Self::Malformed { message, raw } => AttemptLog {
                method,
                success: false,
                message: message.clone(),
                data: Some(serde_json::json!({ "raw": truncate(raw, 1000) })),
            },
        }
    }
}

/// A strategy that attempts to identify a food/product and may fail gracefully
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Which method this recognizer implements
    fn method(&self) -> SourceMethod;

    /// Attempt recognition on the given input
    ///
    /// Never returns `Err`: timeouts, transport failures, and malformed
    /// responses are all absorbed into the outcome value.
    async fn attempt(&self, input: &ScanInput<'_>) -> AttemptOutcome;
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_CONFIDENCE;

    #[test]
    fn success_outcomes_log_as_success() {
        let product = NormalizedProduct::unknown(SourceMethod::HeuristicFallback);
        let log = AttemptOutcome::Product(product).to_log(SourceMethod::HeuristicFallback);
        assert!(log.success);
        assert!(log.message.contains(&format!("{DEFAULT_CONFIDENCE:.2}")));
    }

    #[test]
    fn unavailable_is_flagged_distinctly() {
        let outcome = AttemptOutcome::Unavailable {
            message: "no decode backend".to_owned(),
        };
        let log = outcome.to_log(SourceMethod::BarcodeDecode);
        assert!(!log.success);
        assert!(log.message.starts_with("capability unavailable"));
    }

    #[test]
    fn malformed_retains_raw_text() {
        let outcome = AttemptOutcome::Malformed {
            message: "invalid JSON".to_owned(),
            raw: "```json {broken".to_owned(),
        };
        let log = outcome.to_log(SourceMethod::VisionModel);
        let raw = log.data.unwrap()["raw"].as_str().unwrap().to_owned();
        assert!(raw.contains("{broken"));
    }
}
