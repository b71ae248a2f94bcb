// ABOUTME: Nutrition resolution and advisory scoring engine
// ABOUTME: Pure reference-table lookups plus the optional goal-aware AI advice path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Intelligence layer
//!
//! [`nutrition::NutritionResolver`] turns an identified food name and a
//! weight into per-nutrient totals from a fixed per-100g reference table.
//! [`advisory::AdvisoryScorer`] derives a 1-10 health score and a short
//! advisory sentence from those totals.

/// Goal-aware health scoring and advice text
pub mod advisory;
/// Per-100g reference table and resolver
pub mod nutrition;

pub use advisory::AdvisoryScorer;
pub use nutrition::NutritionResolver;
