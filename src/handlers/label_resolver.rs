use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::models::{AnalysisResult, FoodItem, Observation};
use crate::services::food_database::{format_label, FoodDatabase};

/// Turns ranked classifier labels into food items with calorie estimates.
///
/// Pure and synchronous: the same observations always produce the same result.
#[derive(Debug, Clone)]
pub struct LabelResolver {
    database: Arc<FoodDatabase>,
    config: ResolverConfig,
}

impl LabelResolver {
    pub fn new(database: Arc<FoodDatabase>, config: ResolverConfig) -> Self {
        Self { database, config }
    }

    /// Observations are expected in descending confidence order.
    pub fn resolve(&self, observations: &[Observation]) -> AnalysisResult {
        let top = &observations[..observations.len().min(self.config.max_observations)];

        log::debug!("🔍 Classifier labels:");
        for (index, observation) in top.iter().take(10).enumerate() {
            log::debug!(
                "  {}. {} - {}%",
                index + 1,
                observation.identifier,
                (observation.confidence * 100.0) as i32
            );
        }

        let food: Vec<&Observation> = top
            .iter()
            .filter(|o| self.database.is_food(&o.identifier))
            .collect();
        log::debug!("🍽️ Food labels detected: {}", food.len());

        if food.is_empty() {
            return self.resolve_fallback(top);
        }

        let mut items = Vec::new();
        let mut emitted = HashSet::new();

        for observation in food {
            let name = format_label(&observation.identifier);
            // A name is claimed even when its label ends up dropped below
            if !emitted.insert(name.to_lowercase()) {
                continue;
            }

            let Some((calories, portion)) = self.resolve_calories(observation) else {
                log::debug!("⏭️ Dropping low-confidence label '{}'", observation.identifier);
                continue;
            };

            items.push(FoodItem {
                name,
                calories,
                confidence: observation.confidence,
                portion_size: portion,
            });

            if items.len() >= self.config.max_items {
                break;
            }
        }

        sort_by_confidence(&mut items);
        AnalysisResult::from_items(items)
    }

    /// Looser second pass used when no label matched a food keyword.
    fn resolve_fallback(&self, top: &[Observation]) -> AnalysisResult {
        let candidates: Vec<&Observation> = top
            .iter()
            .filter(|o| {
                self.database.is_generic_food(&o.identifier)
                    || o.confidence > self.config.fallback_min_confidence
            })
            .collect();

        if candidates.is_empty() {
            log::info!("🚫 No food labels among {} observations", top.len());
            return AnalysisResult::not_food(self.config.no_food_message.clone());
        }

        log::warn!("⚠️ No keyword match, estimating from {} generic labels", candidates.len());

        let mut items = Vec::new();
        let mut emitted = HashSet::new();

        for observation in candidates {
            let name = format_label(&observation.identifier);
            if !emitted.insert(name.to_lowercase()) {
                continue;
            }

            items.push(FoodItem {
                name,
                calories: estimate_calories(&observation.identifier, observation.confidence),
                confidence: observation.confidence,
                portion_size: self.config.fallback_portion.clone(),
            });

            if items.len() >= self.config.max_fallback_items {
                break;
            }
        }

        if items.is_empty() {
            return AnalysisResult::not_food(self.config.no_food_message.clone());
        }

        sort_by_confidence(&mut items);
        AnalysisResult::from_items(items)
    }

    /// Table lookup first, then a category estimate for confident labels.
    fn resolve_calories(&self, observation: &Observation) -> Option<(u32, String)> {
        if let Some(record) = self.database.lookup(&observation.identifier) {
            return Some((record.calories, record.portion.clone()));
        }

        if observation.confidence > self.config.estimate_min_confidence {
            let calories = estimate_calories(&observation.identifier, observation.confidence);
            return Some((calories, self.config.default_portion.clone()));
        }

        None
    }
}

/// Category-based guess for labels missing from the reference table.
pub fn estimate_calories(identifier: &str, confidence: f64) -> u32 {
    let id = identifier.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| id.contains(t));

    if has(&["fruit", "berry"]) {
        50
    } else if has(&["vegetable", "salad"]) {
        25
    } else if has(&["meat", "chicken", "beef"]) {
        250
    } else if has(&["bread", "pasta", "rice"]) {
        150
    } else if has(&["dessert", "cake", "sweet"]) {
        300
    } else if has(&["drink", "beverage"]) {
        100
    } else {
        (150.0 * confidence).round().max(0.0) as u32
    }
}

// Stable, so equal confidences keep their input order
fn sort_by_confidence(items: &mut [FoodItem]) {
    items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
}
