// ABOUTME: Health scoring and dietary advice generation over nutrition totals
// ABOUTME: Deterministic rule-based score plus templated or model-backed advice
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

//! Advisory scoring
//!
//! The health score is a deterministic rule evaluation over nutrition totals:
//! a category base adjusted by nutrient thresholds, clamped to `[1.0, 10.0]`.
//! Advice is templated per category; when a model client is available and the
//! caller supplies goals, a goal-aware advice path asks the model instead and
//! silently falls back to the template on any failure.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::intelligence::nutrition::round1;
use crate::llm::GeminiClient;
use crate::models::{NutritionTotals, UserGoals};

/// Lowest possible health score
pub const MIN_HEALTH_SCORE: f64 = 1.0;
/// Highest possible health score
pub const MAX_HEALTH_SCORE: f64 = 10.0;

/// Token cap for the goal-aware advice request
const ADVICE_MAX_TOKENS: u32 = 200;

/// Produces health scores and dietary advice for scanned foods
#[derive(Debug, Default, Clone)]
pub struct AdvisoryScorer {
    client: Option<Arc<GeminiClient>>,
}

impl AdvisoryScorer {
    /// Create a scorer without a model client; advice is always templated
    #[must_use]
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Create a scorer that can generate goal-aware advice through a model
    #[must_use]
    pub fn with_client(client: Option<Arc<GeminiClient>>) -> Self {
        Self { client }
    }

    /// Score nutrition totals on a 1-10 scale
    ///
    /// The score starts from a category base and moves by fixed adjustments:
    /// fiber above 3 g and protein above 10 g each add 0.5, calories above
    /// 400 subtract 1.0, fat above 15 g subtracts 0.5. The result is clamped
    /// to `[1.0, 10.0]` and rounded to one decimal.
    #[must_use]
    pub fn health_score(&self, totals: &NutritionTotals) -> f64 {
        let base: f64 = match totals.category.as_str() {
            "fruit" => 8.5,
            "vegetable" => 9.0,
            "protein" => 7.5,
            "grain" => 6.5,
            "dairy" => 6.0,
            _ => 5.0,
        };

        let mut score = base;
        if totals.fiber_g > 3.0 {
            score += 0.5;
        }
        if totals.protein_g > 10.0 {
            score += 0.5;
        }
        if totals.calories > 400.0 {
            score -= 1.0;
        }
        if totals.fat_g > 15.0 {
            score -= 0.5;
        }

        round1(score.clamp(MIN_HEALTH_SCORE, MAX_HEALTH_SCORE))
    }

    /// Health score and templated advice in one call
    ///
    /// The non-personalized pair; callers with goals and a model client use
    /// [`Self::health_score`] plus [`Self::advise`] instead.
    #[must_use]
    pub fn score(&self, product_name: &str, totals: &NutritionTotals) -> (f64, String) {
        (
            self.health_score(totals),
            self.template_advice(product_name, totals),
        )
    }

    /// Templated advice for a food, keyed on its category
    #[must_use]
    pub fn template_advice(&self, product_name: &str, totals: &NutritionTotals) -> String {
        match totals.category.as_str() {
            "fruit" => format!(
                "Great choice! {product_name} is rich in vitamins and fiber. \
                 Perfect for a healthy snack."
            ),
            "vegetable" => format!(
                "Excellent! {product_name} is packed with nutrients and low in \
                 calories. Keep it up!"
            ),
            "protein" => format!(
                "Good protein source! {product_name} provides {:.0}g of protein \
                 for muscle maintenance.",
                totals.protein_g
            ),
            "grain" => format!(
                "{product_name} provides energy through carbohydrates. Consider \
                 pairing with protein or vegetables."
            ),
            "dairy" => format!(
                "{product_name} offers calcium and protein. Choose low-fat \
                 options when possible."
            ),
            _ => format!(
                "{product_name} logged. Watch your portion size and balance it \
                 with whole foods through the day."
            ),
        }
    }

    /// Advice for a food, goal-aware when a model client and goals are present
    ///
    /// Never fails: any model error is logged and the templated advice is
    /// returned instead.
    pub async fn advise(
        &self,
        product_name: &str,
        totals: &NutritionTotals,
        goals: Option<&UserGoals>,
    ) -> String {
        let Some(client) = &self.client else {
            return self.template_advice(product_name, totals);
        };
        let Some(goals) = goals else {
            return self.template_advice(product_name, totals);
        };

        let prompt = build_goal_prompt(product_name, totals, goals);
        match client.generate_text(&prompt, Some(ADVICE_MAX_TOKENS)).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!("model returned empty advice; using template");
                    self.template_advice(product_name, totals)
                } else {
                    text.to_owned()
                }
            }
            Err(err) => {
                warn!(error = %err, "goal-aware advice failed; using template");
                self.template_advice(product_name, totals)
            }
        }
    }
}

fn build_goal_prompt(product_name: &str, totals: &NutritionTotals, goals: &UserGoals) -> String {
    let mut goal_lines = Vec::new();
    if let Some(calories) = goals.daily_calories {
        goal_lines.push(format!("- Daily calorie target: {calories:.0} kcal"));
    }
    if let Some(protein) = goals.daily_protein_g {
        goal_lines.push(format!("- Daily protein target: {protein:.0} g"));
    }
    if let Some(diet) = &goals.diet_type {
        goal_lines.push(format!("- Diet type: {diet}"));
    }
    let goals_block = if goal_lines.is_empty() {
        "- No specific targets provided".to_owned()
    } else {
        goal_lines.join("\n")
    };

    format!(
        "You are a nutrition assistant. A user just logged this food:\n\
         Food: {product_name}\n\
         Serving: {:.0} g\n\
         Calories: {:.1} kcal, protein {:.1} g, carbohydrates {:.1} g, \
         fat {:.1} g, fiber {:.1} g\n\
         \n\
         User goals:\n{goals_block}\n\
         \n\
         Give practical, encouraging dietary advice for this food in the \
         context of the user's goals. Maximum 100 words, plain text only.",
        totals.weight_grams,
        totals.calories,
        totals.protein_g,
        totals.carbohydrates_g,
        totals.fat_g,
        totals.fiber_g,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(category: &str, calories: f64, protein: f64, fat: f64, fiber: f64) -> NutritionTotals {
        NutritionTotals {
            calories,
            protein_g: protein,
            carbohydrates_g: 10.0,
            fat_g: fat,
            fiber_g: fiber,
            category: category.to_owned(),
            weight_grams: 150.0,
        }
    }

    #[test]
    fn fruit_with_fiber_bonus_scores_nine() {
        let scorer = AdvisoryScorer::new();
        // Base 8.5 + 0.5 fiber bonus, no penalties.
        let score = scorer.health_score(&totals("fruit", 100.0, 2.0, 1.0, 4.0));
        assert!((score - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_heavy_food_takes_both_penalties() {
        let scorer = AdvisoryScorer::new();
        // Base 5.0 - 1.0 calories - 0.5 fat.
        let score = scorer.health_score(&totals("unknown", 450.0, 2.0, 20.0, 1.0));
        assert!((score - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unrecognized_category_defaults_to_middle_base() {
        let scorer = AdvisoryScorer::new();
        let score = scorer.health_score(&totals("something-else", 100.0, 2.0, 1.0, 1.0));
        assert!((score - 5.0).abs() < f64::EPSILON);
        assert!(score >= MIN_HEALTH_SCORE);
    }

    #[test]
    fn vegetable_bonus_is_capped_at_ten() {
        let scorer = AdvisoryScorer::new();
        let score = scorer.health_score(&totals("vegetable", 80.0, 12.0, 1.0, 5.0));
        assert!(score <= MAX_HEALTH_SCORE);
        assert!((score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn protein_template_mentions_grams() {
        let scorer = AdvisoryScorer::new();
        let advice = scorer.template_advice("chicken breast", &totals("protein", 250.0, 46.0, 5.0, 0.0));
        assert!(advice.contains("46g of protein"));
    }

    #[tokio::test]
    async fn advise_without_client_uses_template() {
        let scorer = AdvisoryScorer::new();
        let t = totals("fruit", 80.0, 1.0, 0.3, 3.5);
        let goals = UserGoals {
            daily_calories: Some(2000.0),
            daily_protein_g: Some(120.0),
            diet_type: None,
        };
        let advice = scorer.advise("apple", &t, Some(&goals)).await;
        assert_eq!(advice, scorer.template_advice("apple", &t));
    }
}
