//! Shared nutrition data structures
//!
//! Used by the nutrient table, the aggregator, saved mixes and orders.

use serde::{Deserialize, Serialize};

/// Nutritional profile of one product, per pound
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub calories: f64,
    pub protein: f64, // grams
    pub fat: f64,     // grams
    pub carbs: f64,   // grams
    pub fiber: f64,   // grams
    #[serde(default)]
    pub vitamins: Vec<String>,
    #[serde(default)]
    pub minerals: Vec<String>,
}

impl NutrientProfile {
    /// Drop repeated vitamin and mineral tags, keeping first occurrences
    pub fn normalize_tags(&mut self) {
        dedup_in_order(&mut self.vitamins);
        dedup_in_order(&mut self.minerals);
    }

    /// Apply a partial update; every provided field replaces the current one
    pub fn merged_with(&self, update: &NutrientProfileUpdate) -> Self {
        Self {
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            description: update
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            calories: update.calories.unwrap_or(self.calories),
            protein: update.protein.unwrap_or(self.protein),
            fat: update.fat.unwrap_or(self.fat),
            carbs: update.carbs.unwrap_or(self.carbs),
            fiber: update.fiber.unwrap_or(self.fiber),
            vitamins: update
                .vitamins
                .clone()
                .unwrap_or_else(|| self.vitamins.clone()),
            minerals: update
                .minerals
                .clone()
                .unwrap_or_else(|| self.minerals.clone()),
        }
    }
}

/// Data for updating a nutrient profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutrientProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    pub vitamins: Option<Vec<String>>,
    pub minerals: Option<Vec<String>>,
}

/// Aggregated nutrition of a whole mix
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientAggregate {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub vitamins: Vec<String>,
    pub minerals: Vec<String>,
    /// Pounds of matched products
    pub total_weight: f64,
    /// RFC 3339 timestamp of the computation; informational only
    pub computed_at: String,
}

impl NutrientAggregate {
    /// Aggregate with every value zeroed
    pub fn zero(computed_at: String) -> Self {
        Self {
            computed_at,
            ..Self::default()
        }
    }

    /// Compare everything except `computed_at`
    pub fn same_values(&self, other: &NutrientAggregate) -> bool {
        self.calories == other.calories
            && self.protein == other.protein
            && self.fat == other.fat
            && self.carbs == other.carbs
            && self.fiber == other.fiber
            && self.vitamins == other.vitamins
            && self.minerals == other.minerals
            && self.total_weight == other.total_weight
    }
}

/// Nutrition values per pound of a mix
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerPoundAverages {
    pub calories_per_pound: f64,
    pub protein_per_pound: f64,
    pub fat_per_pound: f64,
    pub carbs_per_pound: f64,
    pub fiber_per_pound: f64,
}

/// Share of protein, fat and carbs in the macro total, as percentages
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacroPercentages {
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

fn dedup_in_order(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|tag| seen.insert(tag.clone()));
}
