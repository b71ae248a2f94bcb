// ABOUTME: OpenFoodFacts catalog client and the barcode lookup recognizer
// ABOUTME: Maps remote nutriments into the internal per-100g shape, never fabricating fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Remote product catalog access
//!
//! [`CatalogClient`] wraps the OpenFoodFacts v2 API: exact lookup by
//! barcode and free-text product search. [`RemoteCatalogLookup`] adapts the
//! lookup into the recognizer contract. The catalog's status flag separates
//! "barcode unknown" (a normal miss) from transport errors; both are
//! recoverable at the pipeline level.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{AttemptOutcome, Recognizer, ScanInput};
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::http_client::shared_client;
use crate::models::{NormalizedProduct, SourceMethod};

/// Confidence assigned to an exact barcode match in the catalog
const CATALOG_MATCH_CONFIDENCE: f64 = 0.95;

/// Maximum page size accepted for catalog search
const MAX_SEARCH_PAGE_SIZE: u32 = 50;

/// Default page size for catalog search
const DEFAULT_SEARCH_PAGE_SIZE: u32 = 10;

/// Check the barcode syntax rule: 8 to 13 digits, numeric only
#[must_use]
pub fn is_valid_barcode(code: &str) -> bool {
    (8..=13).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Wire types (OpenFoodFacts v2)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    status: Option<i64>,
    product: Option<RawProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProduct {
    product_name: Option<String>,
    brands: Option<String>,
    categories: Option<String>,
    ingredients_text: Option<String>,
    image_url: Option<String>,
    nutriscore_grade: Option<String>,
    allergens: Option<String>,
    #[serde(default)]
    additives_tags: Vec<String>,
    #[serde(default)]
    nutriments: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    count: Option<u64>,
    #[serde(default)]
    products: Vec<RawSearchHit>,
}

#[derive(Debug, Deserialize)]
struct RawSearchHit {
    code: Option<String>,
    product_name: Option<String>,
    brands: Option<String>,
    image_url: Option<String>,
    nutriscore_grade: Option<String>,
}

// ============================================================================
// Public result shapes
// ============================================================================

/// Completeness assessment of a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuality {
    /// Points earned out of [`DataQuality::MAX_SCORE`]
    pub score: u8,
    /// Fields the catalog entry was missing
    pub missing_fields: Vec<String>,
    /// Quality bucket: excellent, good, fair, or poor
    pub level: &'static str,
}

impl DataQuality {
    /// Maximum attainable score
    pub const MAX_SCORE: u8 = 10;
}

/// A product found in the remote catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogProduct {
    /// Barcode the product was looked up by
    pub barcode: String,
    /// Product name ("Product <barcode>" when the catalog has none)
    pub name: String,
    /// Brand name
    pub brand: Option<String>,
    /// Cleaned category list
    pub categories: Vec<String>,
    /// Ingredients text
    pub ingredients: Option<String>,
    /// Declared allergens
    pub allergens: Vec<String>,
    /// Additives, with the taxonomy prefix stripped and names humanized
    pub additives: Vec<String>,
    /// Per-100g nutrition fields actually present in the catalog entry
    pub nutrition_per_100g: serde_json::Map<String, Value>,
    /// Nutri-Score grade (uppercased)
    pub nutriscore_grade: Option<String>,
    /// Main product image URL
    pub image_url: Option<String>,
    /// Completeness assessment
    pub data_quality: DataQuality,
}

/// Result of an exact barcode lookup
#[derive(Debug)]
pub enum CatalogLookup {
    /// The catalog knows this barcode
    Found(Box<CatalogProduct>),
    /// The catalog reports the barcode as unknown (a normal miss)
    NotFound,
}

/// One page of catalog search results
#[derive(Debug, Clone, Serialize)]
pub struct ProductSearchPage {
    /// Query that was searched
    pub query: String,
    /// 1-based page number
    pub page: u32,
    /// Page size actually used
    pub page_size: u32,
    /// Total matching products reported by the catalog
    pub total: u64,
    /// Hits on this page
    pub products: Vec<ProductSearchHit>,
}

/// Summarized search hit
#[derive(Debug, Clone, Serialize)]
pub struct ProductSearchHit {
    /// Product barcode
    pub barcode: String,
    /// Product name
    pub name: String,
    /// Brand name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Main image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Nutri-Score grade
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutriscore_grade: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// OpenFoodFacts catalog client
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    client: Client,
}

impl CatalogClient {
    /// Create a client from configuration
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            base_url: config.catalog_base_url.clone(),
            client: shared_client().clone(),
        }
    }

    /// Override the base URL (test servers)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Look a product up by exact barcode
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success HTTP status;
    /// a barcode the catalog does not know is `Ok(CatalogLookup::NotFound)`,
    /// not an error.
    pub async fn product_by_barcode(&self, barcode: &str) -> AppResult<CatalogLookup> {
        let url = format!("{}/product/{barcode}.json", self.base_url);
        debug!(%barcode, "querying product catalog");

        let response = self.client.get(&url).send().await.map_err(|e| {
            AppError::external_service("catalog", format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "catalog",
                format!("HTTP {status} for barcode {barcode}"),
            ));
        }

        let envelope: ProductEnvelope = response.json().await.map_err(|e| {
            AppError::external_service("catalog", format!("malformed response body: {e}"))
        })?;

        if envelope.status != Some(1) {
            info!(%barcode, "barcode not known to catalog");
            return Ok(CatalogLookup::NotFound);
        }

        let raw = envelope.product.unwrap_or_default();
        let product = Self::normalize_product(barcode, raw);
        info!(%barcode, name = %product.name, quality = product.data_quality.level, "catalog hit");
        Ok(CatalogLookup::Found(Box::new(product)))
    }

    /// Search the catalog by free text
    ///
    /// Page is 1-based and clamped to at least 1; page size is clamped to
    /// 1..=50 with a default of 10.
    ///
    /// # Errors
    ///
    /// Rejects queries shorter than 2 characters; otherwise errors only on
    /// transport failure or a non-success HTTP status.
    pub async fn search_products(
        &self,
        query: &str,
        page: u32,
        page_size: Option<u32>,
    ) -> AppResult<ProductSearchPage> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Err(AppError::invalid_input(
                "search query must be at least 2 characters long",
            ));
        }

        let page = page.max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_SEARCH_PAGE_SIZE)
            .clamp(1, MAX_SEARCH_PAGE_SIZE);

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("page", &page.to_string()),
                ("page_size", &page_size.to_string()),
                ("json", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::external_service("catalog", format!("search failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::external_service(
                "catalog",
                format!("search HTTP {status}"),
            ));
        }

        let envelope: SearchEnvelope = response.json().await.map_err(|e| {
            AppError::external_service("catalog", format!("malformed search body: {e}"))
        })?;

        let products = envelope
            .products
            .into_iter()
            .filter_map(|hit| {
                Some(ProductSearchHit {
                    barcode: hit.code?,
                    name: hit.product_name.unwrap_or_default(),
                    brand: hit.brands.filter(|b| !b.is_empty()),
                    image_url: hit.image_url.filter(|u| !u.is_empty()),
                    nutriscore_grade: hit
                        .nutriscore_grade
                        .filter(|g| !g.is_empty())
                        .map(|g| g.to_uppercase()),
                })
            })
            .collect();

        Ok(ProductSearchPage {
            query: query.to_owned(),
            page,
            page_size,
            total: envelope.count.unwrap_or(0),
            products,
        })
    }

    fn normalize_product(barcode: &str, raw: RawProduct) -> CatalogProduct {
        let data_quality = Self::assess_data_quality(&raw);

        let name = raw
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("Product {barcode}"), ToOwned::to_owned);

        CatalogProduct {
            barcode: barcode.to_owned(),
            name,
            brand: raw
                .brands
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(ToOwned::to_owned),
            categories: Self::clean_categories(raw.categories.as_deref()),
            ingredients: raw
                .ingredients_text
                .as_deref()
                .map(str::trim)
                .filter(|i| !i.is_empty())
                .map(ToOwned::to_owned),
            allergens: Self::split_allergens(raw.allergens.as_deref()),
            additives: Self::extract_additives(&raw.additives_tags),
            nutrition_per_100g: Self::extract_nutrition(&raw.nutriments),
            nutriscore_grade: raw
                .nutriscore_grade
                .filter(|g| !g.is_empty())
                .map(|g| g.to_uppercase()),
            image_url: raw.image_url.filter(|u| !u.is_empty()),
            data_quality,
        }
    }

    /// Map catalog nutriment keys into the internal per-100g field names
    ///
    /// Only fields the catalog actually carries are emitted; nothing is
    /// fabricated for absent ones.
    fn extract_nutrition(nutriments: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
        const MAPPING: &[(&str, &str)] = &[
            ("energy-kcal_100g", "calories"),
            ("proteins_100g", "protein_g"),
            ("carbohydrates_100g", "carbohydrates_g"),
            ("fat_100g", "fat_g"),
            ("fiber_100g", "fiber_g"),
            ("sugars_100g", "sugar_g"),
            ("sodium_100g", "sodium_g"),
            ("salt_100g", "salt_g"),
            ("saturated-fat_100g", "saturated_fat_g"),
        ];

        let mut nutrition = serde_json::Map::new();
        for (catalog_key, our_key) in MAPPING {
            if let Some(number) = nutriments.get(*catalog_key).and_then(numeric_value) {
                if let Some(json_number) = serde_json::Number::from_f64(number) {
                    nutrition.insert((*our_key).to_owned(), Value::Number(json_number));
                }
            }
        }
        nutrition
    }

    fn split_allergens(allergens: Option<&str>) -> Vec<String> {
        allergens
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Humanize `en:` taxonomy tags; tags from other taxonomies are dropped
    fn extract_additives(tags: &[String]) -> Vec<String> {
        tags.iter()
            .filter_map(|tag| tag.strip_prefix("en:"))
            .map(|name| title_case(&name.replace('-', " ")))
            .collect()
    }

    fn clean_categories(categories: Option<&str>) -> Vec<String> {
        categories
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Score catalog entry completeness the way the scan history UI expects
    fn assess_data_quality(raw: &RawProduct) -> DataQuality {
        let mut score = 0u8;
        let mut missing_fields = Vec::new();

        let fields: [(&str, u8, bool); 6] = [
            ("product_name", 2, non_empty(raw.product_name.as_deref())),
            ("brands", 1, non_empty(raw.brands.as_deref())),
            (
                "ingredients_text",
                2,
                non_empty(raw.ingredients_text.as_deref()),
            ),
            ("image_url", 1, non_empty(raw.image_url.as_deref())),
            ("nutriments", 3, !raw.nutriments.is_empty()),
            ("categories", 1, non_empty(raw.categories.as_deref())),
        ];

        for (field, points, present) in fields {
            if present {
                score += points;
            } else {
                missing_fields.push(field.to_owned());
            }
        }

        let level = match score {
            8..=10 => "excellent",
            6..=7 => "good",
            4..=5 => "fair",
            _ => "poor",
        };

        DataQuality {
            score,
            missing_fields,
            level,
        }
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Some catalog entries carry numbers as strings; accept both.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(s: Option<&str>) -> bool {
    s.is_some_and(|v| !v.trim().is_empty())
}

// ============================================================================
// Recognizer adapter
// ============================================================================

/// Recognizer that resolves a decoded barcode through the remote catalog
#[derive(Debug, Clone)]
pub struct RemoteCatalogLookup {
    client: CatalogClient,
}

impl RemoteCatalogLookup {
    /// Wrap a catalog client in the recognizer contract
    #[must_use]
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Recognizer for RemoteCatalogLookup {
    fn method(&self) -> SourceMethod {
        SourceMethod::RemoteCatalog
    }

    async fn attempt(&self, input: &ScanInput<'_>) -> AttemptOutcome {
        let ScanInput::Barcode(barcode) = input else {
            return AttemptOutcome::Miss {
                message: "remote catalog lookup requires a decoded barcode".to_owned(),
            };
        };

        // Syntax gate: invalid codes are rejected before any dispatch.
        if !is_valid_barcode(barcode) {
            return AttemptOutcome::Miss {
                message: format!("barcode '{barcode}' is not 8-13 numeric digits; lookup skipped"),
            };
        }

        match self.client.product_by_barcode(barcode).await {
            Ok(CatalogLookup::Found(product)) => {
                let category = product
                    .categories
                    .first()
                    .map(|c| c.to_lowercase());
                let normalized = NormalizedProduct::new(
                    product.name.clone(),
                    Some(CATALOG_MATCH_CONFIDENCE),
                    SourceMethod::RemoteCatalog,
                )
                .with_brand(product.brand.clone())
                .with_category(category)
                .with_raw_attribute("barcode", Value::String(product.barcode.clone()))
                .with_raw_attribute(
                    "nutrition_per_100g",
                    Value::Object(product.nutrition_per_100g.clone()),
                )
                .with_raw_attribute(
                    "allergens",
                    serde_json::to_value(&product.allergens).unwrap_or(Value::Null),
                )
                .with_raw_attribute(
                    "additives",
                    serde_json::to_value(&product.additives).unwrap_or(Value::Null),
                )
                .with_raw_attribute(
                    "data_quality",
                    serde_json::to_value(&product.data_quality).unwrap_or(Value::Null),
                )
                .with_raw_attribute(
                    "nutriscore_grade",
                    product
                        .nutriscore_grade
                        .clone()
                        .map_or(Value::Null, Value::String),
                );
                AttemptOutcome::Product(normalized)
            }
            Ok(CatalogLookup::NotFound) => AttemptOutcome::Miss {
                message: format!("product with barcode {barcode} not found in catalog"),
            },
            Err(e) => {
                warn!(%barcode, error = %e, "catalog lookup failed");
                AttemptOutcome::Miss {
                    message: format!("catalog lookup failed: {e}"),
                }
            }
        }
    }
}
