// ABOUTME: Vocabulary fallback recognizer of last resort
// ABOUTME: Always succeeds, degrading to the unknown_product sentinel at 0.1
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Heuristic fallback
//!
//! Matches the caller-supplied filename stem against the food vocabulary by
//! substring containment in either direction. The vocabulary is the
//! nutrition table's name column, so anything this recognizer names can
//! also be resolved to per-100g values. This recognizer never truly fails:
//! when nothing matches it emits the sentinel product at minimum
//! confidence, guaranteeing the pipeline always terminates with a result.

use async_trait::async_trait;
use tracing::debug;

use super::{AttemptOutcome, Recognizer, ScanInput};
use crate::intelligence::nutrition::food_table_entries;
use crate::models::{NormalizedProduct, SourceMethod};

/// Confidence assigned to a vocabulary match
const MATCHED_CONFIDENCE: f64 = 0.7;

/// Fallback recognizer that is guaranteed to produce a result
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicFallback;

impl HeuristicFallback {
    /// Create the fallback recognizer
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn match_vocabulary(hint: &str) -> Option<NormalizedProduct> {
        let needle = hint.trim().to_lowercase().replace(['_', '-'], " ");
        if needle.is_empty() {
            return None;
        }

        for (name, entry) in food_table_entries() {
            if name.contains(&needle) || needle.contains(name) {
                debug!(food = name, %needle, "heuristic vocabulary match");
                return Some(
                    NormalizedProduct::new(
                        (*name).to_owned(),
                        Some(MATCHED_CONFIDENCE),
                        SourceMethod::HeuristicFallback,
                    )
                    .with_category(Some(entry.category.to_owned())),
                );
            }
        }
        None
    }
}

#[async_trait]
impl Recognizer for HeuristicFallback {
    fn method(&self) -> SourceMethod {
        SourceMethod::HeuristicFallback
    }

    async fn attempt(&self, input: &ScanInput<'_>) -> AttemptOutcome {
        let matched = match input {
            ScanInput::Image {
                hint: Some(hint), ..
            } => Self::match_vocabulary(hint),
            // No filename and no vocabulary means nothing to match against.
            ScanInput::Image { hint: None, .. } | ScanInput::Barcode(_) => None,
        };

        AttemptOutcome::Product(matched.unwrap_or_else(|| {
            NormalizedProduct::unknown(SourceMethod::HeuristicFallback)
                .with_category(Some("unknown".to_owned()))
        }))
    }
}
