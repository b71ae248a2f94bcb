// ABOUTME: Main library entry point for the nutriscan recognition backend
// ABOUTME: Exposes the recognition pipeline, nutrition resolver, and advisory scorer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

#![deny(unsafe_code)]

//! # Nutriscan
//!
//! Food recognition and nutrition analysis backend. An uploaded image or a
//! bare barcode runs through a chain of recognition strategies ordered by
//! reliability, and the accepted identification is turned into nutrition
//! totals, a health score, and dietary advice.
//!
//! ## Recognition chain
//!
//! 1. **Barcode decode** over the image (optional `barcode-rxing` backend)
//! 2. **Remote catalog lookup** for any decoded or supplied barcode
//! 3. **Vision model** identification, accepted above a confidence floor
//! 4. **Heuristic fallback** over a fixed food vocabulary, which never misses
//!
//! Per-method failures are values, not errors: each attempt is logged into
//! the scan outcome and the chain moves on. The only fatal input failure on
//! the image path is an undecodable upload.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nutriscan::config::ServerConfig;
//! use nutriscan::errors::AppResult;
//! use nutriscan::pipeline::RecognitionPipeline;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let pipeline = RecognitionPipeline::from_config(&config);
//!
//!     let bytes = std::fs::read("meal.jpg")
//!         .map_err(|e| nutriscan::errors::AppError::invalid_input(e.to_string()))?;
//!     let outcome = pipeline.run_image(&bytes, Some("meal"), None, None).await?;
//!     println!("{} scored {}", outcome.product.name, outcome.record.health_score);
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;
/// Error types and error codes
pub mod errors;
/// Shared HTTP client management
pub mod http_client;
/// Image decoding and vision-payload encoding
pub mod imaging;
/// Nutrition resolution and advisory scoring
pub mod intelligence;
/// Generative model client
pub mod llm;
/// Tracing initialization
pub mod logging;
/// Core domain models
pub mod models;
/// The recognition pipeline orchestrator
pub mod pipeline;
/// Recognition strategies
pub mod recognizers;

pub use errors::{AppError, AppResult, ErrorCode};
pub use intelligence::{AdvisoryScorer, NutritionResolver};
pub use models::{NormalizedProduct, NutritionTotals, ScanRecord, SourceMethod, UserGoals};
pub use pipeline::{RecognitionPipeline, ScanOutcome};
