// ABOUTME: Domain models for food recognition and nutrition estimation
// ABOUTME: NormalizedProduct, nutrition shapes, ScanRecord, AttemptLog, UserGoals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name used whenever recognition cannot produce a real product name
pub const UNKNOWN_PRODUCT: &str = "unknown_product";

/// Confidence assigned when a method could not assess its own confidence
pub const DEFAULT_CONFIDENCE: f64 = 0.1;

/// Which recognition strategy produced a result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    /// Visual barcode symbology decoded from the image
    BarcodeDecode,
    /// Product looked up by barcode in the remote catalog
    RemoteCatalog,
    /// Vision-capable generative model identification
    VisionModel,
    /// Vocabulary/filename heuristic of last resort
    HeuristicFallback,
}

impl SourceMethod {
    /// Stable wire/log name for this method
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BarcodeDecode => "barcode_decode",
            Self::RemoteCatalog => "remote_catalog",
            Self::VisionModel => "vision_model",
            Self::HeuristicFallback => "heuristic_fallback",
        }
    }
}

impl std::fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical shape all recognition strategies converge to
///
/// Invariants: `name` is never empty (unresolved recognition uses
/// [`UNKNOWN_PRODUCT`]) and `confidence` is always populated
/// ([`DEFAULT_CONFIDENCE`] when the method could not assess it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProduct {
    /// Canonical identified product/food name
    pub name: String,
    /// Brand name (if known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Food category (e.g. "fruit", "protein", "unknown")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Strategy that produced this result
    pub source_method: SourceMethod,
    /// Pass-through fields from the source, kept for diagnostics only
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub raw_attributes: serde_json::Map<String, serde_json::Value>,
}

impl NormalizedProduct {
    /// Build a product while enforcing the name/confidence invariants
    #[must_use]
    pub fn new(name: impl Into<String>, confidence: Option<f64>, source_method: SourceMethod) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            UNKNOWN_PRODUCT.to_owned()
        } else {
            name
        };
        Self {
            name,
            brand: None,
            category: None,
            confidence: confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
            source_method,
            raw_attributes: serde_json::Map::new(),
        }
    }

    /// The sentinel result used when nothing could be identified
    #[must_use]
    pub fn unknown(source_method: SourceMethod) -> Self {
        Self::new(UNKNOWN_PRODUCT, Some(DEFAULT_CONFIDENCE), source_method)
    }

    /// Attach a brand
    #[must_use]
    pub fn with_brand(mut self, brand: Option<String>) -> Self {
        self.brand = brand.filter(|b| !b.trim().is_empty());
        self
    }

    /// Attach a category
    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.trim().is_empty());
        self
    }

    /// Attach a raw diagnostic attribute
    #[must_use]
    pub fn with_raw_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.raw_attributes.insert(key.into(), value);
        self
    }
}

/// Nutrition totals derived from a per-100g reference row at a given weight
///
/// Totals are a pure function of the table entry and the weight. They are
/// recomputed per request and never cached across different weights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionTotals {
    /// Energy in kcal at the estimated weight
    pub calories: f64,
    /// Protein in grams
    pub protein_g: f64,
    /// Carbohydrates in grams
    pub carbohydrates_g: f64,
    /// Fat in grams
    pub fat_g: f64,
    /// Fiber in grams
    pub fiber_g: f64,
    /// Food category of the matched table row
    pub category: String,
    /// Weight the totals were computed at, in grams
    pub weight_grams: f64,
}

/// Optional user goals passed into the advisory path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGoals {
    /// Daily calorie target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_calories: Option<f64>,
    /// Daily protein target in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_protein_g: Option<f64>,
    /// Diet type (e.g. "vegetarian", "keto")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet_type: Option<String>,
}

/// Outcome entry for one recognizer attempt, returned for transparency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptLog {
    /// Recognition method attempted
    pub method: SourceMethod,
    /// Whether the attempt produced a usable result
    pub success: bool,
    /// Short human-readable outcome description
    pub message: String,
    /// Optional structured data (raw model text, decoded symbol, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Persistable payload of one completed pipeline run
///
/// Storage, querying, and the favorite flag live outside this crate; the
/// pipeline only produces the payload. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Unique identifier for this scan
    pub id: Uuid,
    /// Identified product name
    pub product_name: String,
    /// Recognition confidence in [0, 1]
    pub confidence: f64,
    /// Estimated weight in grams the totals were computed at
    pub estimated_weight_grams: f64,
    /// Derived nutrition totals
    pub nutrition: NutritionTotals,
    /// Advisory health score in [1, 10]
    pub health_score: f64,
    /// Short advisory text
    pub advice: String,
    /// When the scan completed
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_becomes_sentinel() {
        let product = NormalizedProduct::new("   ", None, SourceMethod::VisionModel);
        assert_eq!(product.name, UNKNOWN_PRODUCT);
        assert!((product.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_is_clamped() {
        let product = NormalizedProduct::new("apple", Some(1.7), SourceMethod::RemoteCatalog);
        assert!((product.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn source_method_serializes_snake_case() {
        let json = serde_json::to_string(&SourceMethod::HeuristicFallback).unwrap();
        assert_eq!(json, "\"heuristic_fallback\"");
    }

    #[test]
    fn blank_brand_is_dropped() {
        let product = NormalizedProduct::new("apple", Some(0.9), SourceMethod::RemoteCatalog)
            .with_brand(Some("  ".to_owned()));
        assert!(product.brand.is_none());
    }
}
