// ABOUTME: Multi-source recognition pipeline orchestrating the recognizer chain
// ABOUTME: Barcode, catalog, vision, and heuristic stages with transparent attempt logs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! # Recognition Pipeline
//!
//! Orders the recognition strategies by reliability and runs them until one
//! yields an acceptable product: barcode decode feeds the catalog lookup,
//! the vision model runs when the catalog path produced nothing, and the
//! heuristic fallback is terminal and cannot miss. Every attempt, successful
//! or not, is logged into the outcome for caller-visible transparency.
//!
//! The only fatal error on the image path is an undecodable upload; every
//! per-method failure is absorbed into the attempt log and the chain moves
//! on.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::imaging::decode_image;
use crate::intelligence::{AdvisoryScorer, NutritionResolver};
use crate::llm::GeminiClient;
use crate::models::{AttemptLog, NormalizedProduct, ScanRecord, UserGoals};
use crate::recognizers::catalog::{is_valid_barcode, CatalogClient};
use crate::recognizers::vision::DetailedScan;
use crate::recognizers::{
    AttemptOutcome, BarcodeDecode, HeuristicFallback, Recognizer, RemoteCatalogLookup, ScanInput,
    VisionModelIdentify,
};

/// Vision identifications at or below this confidence are recorded as misses
pub const VISION_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Complete result of one pipeline run
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanOutcome {
    /// The accepted product
    pub product: NormalizedProduct,
    /// Every recognition attempt made, in execution order
    pub attempts: Vec<AttemptLog>,
    /// Immutable scan payload for the caller's storage layer
    pub record: ScanRecord,
}

impl ScanOutcome {
    /// Nutrition totals the scan resolved to
    #[must_use]
    pub fn nutrition(&self) -> &crate::models::NutritionTotals {
        &self.record.nutrition
    }

    /// Health score on the 1-10 scale
    #[must_use]
    pub fn health_score(&self) -> f64 {
        self.record.health_score
    }

    /// Dietary advice text
    #[must_use]
    pub fn advice(&self) -> &str {
        &self.record.advice
    }
}

/// Orders and runs the recognition strategies, then derives the scan payload
pub struct RecognitionPipeline {
    barcode: Box<dyn Recognizer>,
    catalog: Box<dyn Recognizer>,
    vision: Box<dyn Recognizer>,
    heuristic: Box<dyn Recognizer>,
    detailed_vision: VisionModelIdentify,
    resolver: NutritionResolver,
    scorer: AdvisoryScorer,
    default_weight_grams: f64,
}

impl std::fmt::Debug for RecognitionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionPipeline")
            .field("default_weight_grams", &self.default_weight_grams)
            .finish_non_exhaustive()
    }
}

impl RecognitionPipeline {
    /// Build the standard pipeline from configuration
    ///
    /// A missing vision API key degrades the vision stage to `Unavailable`
    /// rather than failing construction.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        crate::http_client::initialize_shared_client(
            config.http_timeout_secs,
            config.connect_timeout_secs,
        );
        let gemini = GeminiClient::from_config(config).map(Arc::new);
        let vision = VisionModelIdentify::new(gemini.clone());
        Self {
            barcode: Box::new(BarcodeDecode::new()),
            catalog: Box::new(RemoteCatalogLookup::new(CatalogClient::new(config))),
            vision: Box::new(vision.clone()),
            heuristic: Box::new(HeuristicFallback::new()),
            detailed_vision: vision,
            resolver: NutritionResolver::new(),
            scorer: AdvisoryScorer::with_client(gemini),
            default_weight_grams: config.default_weight_grams,
        }
    }

    /// Assemble a pipeline from explicit stages
    ///
    /// Exists for tests that substitute scripted recognizers; production
    /// callers go through [`Self::from_config`].
    #[must_use]
    pub fn with_stages(
        barcode: Box<dyn Recognizer>,
        catalog: Box<dyn Recognizer>,
        vision: Box<dyn Recognizer>,
        heuristic: Box<dyn Recognizer>,
        default_weight_grams: f64,
    ) -> Self {
        Self {
            barcode,
            catalog,
            vision,
            heuristic,
            detailed_vision: VisionModelIdentify::new(None),
            resolver: NutritionResolver::new(),
            scorer: AdvisoryScorer::new(),
            default_weight_grams,
        }
    }

    /// Run the full chain over an uploaded image
    ///
    /// `hint` is typically the upload's filename stem and only feeds the
    /// heuristic fallback. `weight_grams` overrides the configured default
    /// serving weight.
    ///
    /// # Errors
    ///
    /// Fails when the image bytes cannot be decoded or when an explicit
    /// `weight_grams` is not a positive number. Recognizer failures are not
    /// errors; they appear in the attempt log.
    #[instrument(skip(self, bytes, goals), fields(len = bytes.len()))]
    pub async fn run_image(
        &self,
        bytes: &[u8],
        hint: Option<&str>,
        weight_grams: Option<f64>,
        goals: Option<&UserGoals>,
    ) -> AppResult<ScanOutcome> {
        let weight = self.effective_weight(weight_grams)?;
        let image = decode_image(bytes)?;
        let input = ScanInput::Image {
            image: &image,
            hint,
        };

        let mut attempts = Vec::new();
        let mut selected: Option<NormalizedProduct> = None;

        let barcode_outcome = self.barcode.attempt(&input).await;
        attempts.push(barcode_outcome.to_log(self.barcode.method()));
        if let AttemptOutcome::Barcode(code) = barcode_outcome {
            let lookup_input = ScanInput::Barcode(&code);
            let catalog_outcome = self.catalog.attempt(&lookup_input).await;
            attempts.push(catalog_outcome.to_log(self.catalog.method()));
            if let AttemptOutcome::Product(product) = catalog_outcome {
                selected = Some(product);
            }
        }

        if selected.is_none() {
            let vision_outcome = self.vision.attempt(&input).await;
            match vision_outcome {
                AttemptOutcome::Product(product)
                    if product.confidence > VISION_CONFIDENCE_THRESHOLD =>
                {
                    attempts
                        .push(AttemptOutcome::Product(product.clone()).to_log(self.vision.method()));
                    selected = Some(product);
                }
                AttemptOutcome::Product(product) => {
                    debug!(
                        confidence = product.confidence,
                        "vision identification below threshold"
                    );
                    attempts.push(AttemptLog {
                        method: self.vision.method(),
                        success: false,
                        message: format!(
                            "identified {} but confidence {:.2} is not above {:.2}",
                            product.name, product.confidence, VISION_CONFIDENCE_THRESHOLD
                        ),
                        data: serde_json::to_value(&product).ok(),
                    });
                }
                other => attempts.push(other.to_log(self.vision.method())),
            }
        }

        let product = match selected {
            Some(product) => product,
            None => self.terminal_fallback(&input, &mut attempts).await,
        };

        self.finalize(product, attempts, weight, goals).await
    }

    /// Run the chain for a caller-supplied barcode string
    ///
    /// There is no image, so the visual stages are skipped: the catalog is
    /// queried directly and the heuristic fallback closes the chain.
    ///
    /// # Errors
    ///
    /// A syntactically invalid barcode is an input error, rejected before
    /// any recognizer runs. An explicit non-positive `weight_grams` is also
    /// rejected.
    #[instrument(skip(self, goals))]
    pub async fn run_barcode(
        &self,
        barcode: &str,
        weight_grams: Option<f64>,
        goals: Option<&UserGoals>,
    ) -> AppResult<ScanOutcome> {
        let weight = self.effective_weight(weight_grams)?;
        let barcode = barcode.trim();
        if !is_valid_barcode(barcode) {
            return Err(AppError::invalid_input(format!(
                "barcode must be 8-13 numeric digits, got {barcode:?}"
            )));
        }

        let input = ScanInput::Barcode(barcode);
        let mut attempts = Vec::new();

        let catalog_outcome = self.catalog.attempt(&input).await;
        attempts.push(catalog_outcome.to_log(self.catalog.method()));

        let product = match catalog_outcome {
            AttemptOutcome::Product(product) => product,
            _ => self.terminal_fallback(&input, &mut attempts).await,
        };

        self.finalize(product, attempts, weight, goals).await
    }

    /// Detailed multi-product vision scan of an uploaded image
    ///
    /// # Errors
    ///
    /// Fails when the image cannot be decoded, no vision model is
    /// configured, or the model response is unusable even after repair.
    pub async fn run_detailed(&self, bytes: &[u8]) -> AppResult<DetailedScan> {
        let image = decode_image(bytes)?;
        self.detailed_vision.analyze_products_with_weights(&image).await
    }

    /// The heuristic stage, which always yields a product
    async fn terminal_fallback(
        &self,
        input: &ScanInput<'_>,
        attempts: &mut Vec<AttemptLog>,
    ) -> NormalizedProduct {
        let outcome = self.heuristic.attempt(input).await;
        attempts.push(outcome.to_log(self.heuristic.method()));
        match outcome {
            AttemptOutcome::Product(product) => product,
            // The fallback contract says this cannot happen; keep the scan
            // alive with the sentinel if a substitute stage breaks it.
            _ => NormalizedProduct::unknown(self.heuristic.method()),
        }
    }

    fn effective_weight(&self, requested: Option<f64>) -> AppResult<f64> {
        match requested {
            Some(weight) if weight.is_finite() && weight > 0.0 => Ok(weight),
            Some(weight) => Err(AppError::invalid_input(format!(
                "weight must be a positive number of grams, got {weight}"
            ))),
            None => Ok(self.default_weight_grams),
        }
    }

    async fn finalize(
        &self,
        product: NormalizedProduct,
        attempts: Vec<AttemptLog>,
        weight_grams: f64,
        goals: Option<&UserGoals>,
    ) -> AppResult<ScanOutcome> {
        let nutrition = self.resolver.resolve(&product.name, weight_grams)?;
        let health_score = self.scorer.health_score(&nutrition);
        let advice = self.scorer.advise(&product.name, &nutrition, goals).await;

        info!(
            product = %product.name,
            method = product.source_method.as_str(),
            confidence = product.confidence,
            health_score,
            "scan complete"
        );

        let record = ScanRecord {
            id: Uuid::new_v4(),
            product_name: product.name.clone(),
            confidence: product.confidence,
            estimated_weight_grams: weight_grams,
            nutrition,
            health_score,
            advice,
            timestamp: Utc::now(),
        };

        Ok(ScanOutcome {
            product,
            attempts,
            record,
        })
    }
}
