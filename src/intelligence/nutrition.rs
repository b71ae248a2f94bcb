// ABOUTME: Fixed per-100g nutrition reference table and the resolver over it
// ABOUTME: Case-insensitive substring match with a documented precedence order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Nutrition resolution
//!
//! The resolver is a pure function over a fixed reference table: identical
//! `(name, weight)` inputs always yield identical totals, and totals are
//! recomputed per call rather than cached. Matching is case-insensitive
//! substring containment in either direction; the first matching row wins.

use crate::errors::{AppError, AppResult};
use crate::models::NutritionTotals;

/// One reference row: per-100g values plus the food category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry {
    /// Energy in kcal per 100 g
    pub calories: f64,
    /// Protein grams per 100 g
    pub protein_g: f64,
    /// Carbohydrate grams per 100 g
    pub carbohydrates_g: f64,
    /// Fat grams per 100 g
    pub fat_g: f64,
    /// Fiber grams per 100 g
    pub fiber_g: f64,
    /// Food category used by the advisory scorer
    pub category: &'static str,
}

const fn entry(
    calories: f64,
    protein_g: f64,
    carbohydrates_g: f64,
    fat_g: f64,
    fiber_g: f64,
    category: &'static str,
) -> TableEntry {
    TableEntry {
        calories,
        protein_g,
        carbohydrates_g,
        fat_g,
        fiber_g,
        category,
    }
}

/// Reference nutrition table, per 100 g
///
/// Iteration order is load-bearing and fixed: the first matching row wins,
/// and multi-word names are listed before their single-word substrings so
/// the effective policy is most-specific-first ("chicken breast" beats
/// "chicken"). Rows are otherwise grouped by category.
const FOOD_TABLE: &[(&str, TableEntry)] = &[
    // Multi-word entries first.
    ("chicken breast", entry(165.0, 31.0, 0.0, 3.6, 0.0, "protein")),
    // Fruit
    ("apple", entry(52.0, 0.3, 14.0, 0.2, 2.4, "fruit")),
    ("banana", entry(89.0, 1.1, 23.0, 0.3, 2.6, "fruit")),
    ("orange", entry(47.0, 0.9, 12.0, 0.1, 2.4, "fruit")),
    // Vegetable
    ("tomato", entry(18.0, 0.9, 3.9, 0.2, 1.2, "vegetable")),
    ("potato", entry(77.0, 2.0, 17.0, 0.1, 2.2, "vegetable")),
    ("carrot", entry(41.0, 0.9, 10.0, 0.2, 2.8, "vegetable")),
    ("broccoli", entry(34.0, 2.8, 7.0, 0.4, 2.6, "vegetable")),
    // Grain
    ("bread", entry(265.0, 9.0, 49.0, 3.2, 2.7, "grain")),
    ("rice", entry(130.0, 2.7, 28.0, 0.3, 0.4, "grain")),
    ("pasta", entry(131.0, 5.0, 25.0, 1.1, 1.8, "grain")),
    ("pizza", entry(266.0, 11.0, 33.0, 10.0, 2.3, "grain")),
    // Protein
    ("chicken", entry(239.0, 27.0, 0.0, 14.0, 0.0, "protein")),
    ("beef", entry(250.0, 26.0, 0.0, 15.0, 0.0, "protein")),
    ("fish", entry(206.0, 22.0, 0.0, 12.0, 0.0, "protein")),
    ("burger", entry(295.0, 17.0, 24.0, 14.0, 1.1, "protein")),
    // Dairy
    ("milk", entry(42.0, 3.4, 5.0, 1.0, 0.0, "dairy")),
    ("cheese", entry(402.0, 25.0, 1.3, 33.0, 0.0, "dairy")),
    ("yogurt", entry(59.0, 10.0, 3.6, 0.4, 0.0, "dairy")),
];

/// Generic fallback row used when no table entry matches
const GENERIC_FALLBACK: TableEntry = entry(200.0, 5.0, 30.0, 8.0, 3.0, "unknown");

/// The reference table, exposed for the heuristic recognizer's vocabulary
#[must_use]
pub fn food_table_entries() -> &'static [(&'static str, TableEntry)] {
    FOOD_TABLE
}

/// Resolves an identified food name into nutrition totals at a weight
#[derive(Debug, Default, Clone, Copy)]
pub struct NutritionResolver;

impl NutritionResolver {
    /// Create a resolver
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Find the table row for a food name, falling back to the generic row
    #[must_use]
    pub fn lookup(product_name: &str) -> &'static TableEntry {
        let needle = product_name.trim().to_lowercase();
        if needle.is_empty() {
            return &GENERIC_FALLBACK;
        }
        for (name, row) in FOOD_TABLE {
            if name.contains(&needle) || needle.contains(name) {
                return row;
            }
        }
        &GENERIC_FALLBACK
    }

    /// Compute nutrition totals for a food at the given weight
    ///
    /// Totals are linear in the weight and rounded to one decimal place.
    ///
    /// # Errors
    ///
    /// Rejects non-positive or non-finite weights.
    pub fn resolve(&self, product_name: &str, weight_grams: f64) -> AppResult<NutritionTotals> {
        if !weight_grams.is_finite() || weight_grams <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "weight must be a positive number of grams, got {weight_grams}"
            )));
        }

        let row = Self::lookup(product_name);
        let multiplier = weight_grams / 100.0;

        Ok(NutritionTotals {
            calories: round1(row.calories * multiplier),
            protein_g: round1(row.protein_g * multiplier),
            carbohydrates_g: round1(row.carbohydrates_g * multiplier),
            fat_g: round1(row.fat_g * multiplier),
            fiber_g: round1(row.fiber_g * multiplier),
            category: row.category.to_owned(),
            weight_grams,
        })
    }
}

/// Round to one decimal place
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
