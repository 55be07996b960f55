//! Derived nutrition analytics
//!
//! Recommendations, macro split and the summary shown next to a mix.

use std::fmt;

use serde::Serialize;

use super::aggregator::{round1, MixAggregator};
use super::table::NutrientSource;
use crate::models::{MacroPercentages, MixComponent, NutrientAggregate, PerPoundAverages};

/// Grams in one pound, as used for portion conversions
pub const GRAMS_PER_POUND: f64 = 453.6;

/// Qualitative note about a mix, in the order the rules are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HighProtein,
    HighFiber,
    Antioxidant,
    MuscleHealth,
    HighCalorie,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::HighProtein => "high_protein",
            Recommendation::HighFiber => "high_fiber",
            Recommendation::Antioxidant => "antioxidant",
            Recommendation::MuscleHealth => "muscle_health",
            Recommendation::HighCalorie => "high_calorie",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::HighProtein => "Excellent source of protein for athletes",
            Recommendation::HighFiber => "High in fiber for healthy digestion",
            Recommendation::Antioxidant => "Rich in vitamin E, a natural antioxidant",
            Recommendation::MuscleHealth => "Contains magnesium for muscle health",
            Recommendation::HighCalorie => "High calorie content, consume in moderation",
        }
    }

    /// Warnings as opposed to positive notes
    pub fn is_warning(&self) -> bool {
        matches!(self, Recommendation::HighCalorie)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Evaluate the recommendation rules against mix totals
pub fn generate_recommendations(totals: &NutrientAggregate) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if totals.protein > 25.0 {
        recommendations.push(Recommendation::HighProtein);
    }
    if totals.fiber > 15.0 {
        recommendations.push(Recommendation::HighFiber);
    }
    if totals.vitamins.iter().any(|v| v == "E") {
        recommendations.push(Recommendation::Antioxidant);
    }
    if totals.minerals.iter().any(|m| m == "Magnesio") {
        recommendations.push(Recommendation::MuscleHealth);
    }
    if totals.calories > 800.0 {
        recommendations.push(Recommendation::HighCalorie);
    }

    recommendations
}

/// Protein, fat and carbs as percentages of their sum
pub fn compute_macro_percentages(totals: &NutrientAggregate) -> MacroPercentages {
    let sum = totals.protein + totals.fat + totals.carbs;
    if sum == 0.0 {
        return MacroPercentages::default();
    }

    MacroPercentages {
        protein: totals.protein / sum * 100.0,
        fat: totals.fat / sum * 100.0,
        carbs: totals.carbs / sum * 100.0,
    }
}

/// Calories in a portion of `grams`, given calories per pound
pub fn calories_per_portion(calories_per_pound: f64, grams: f64) -> f64 {
    round1(calories_per_pound * grams / GRAMS_PER_POUND)
}

/// Quick yes/no facts about a mix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionFlags {
    pub high_protein: bool,
    pub high_fiber: bool,
    pub low_fat: bool,
    pub calories_per_100g: f64,
}

/// Everything the nutrition panel shows for a mix
#[derive(Debug, Clone, Serialize)]
pub struct NutritionSummary {
    pub total: NutrientAggregate,
    pub per_pound: Option<PerPoundAverages>,
    pub flags: NutritionFlags,
    pub macro_percentages: MacroPercentages,
    pub recommendations: Vec<Recommendation>,
    pub messages: Vec<String>,
}

/// Build the full nutrition summary of a component list
pub fn summarize<S: NutrientSource + ?Sized>(
    aggregator: &MixAggregator<'_, S>,
    components: &[MixComponent],
) -> NutritionSummary {
    let total = aggregator.compute_nutrition(components);
    let per_pound = aggregator.compute_per_pound_averages(components);
    let calories_per_pound = per_pound.map(|p| p.calories_per_pound).unwrap_or(0.0);

    let flags = NutritionFlags {
        high_protein: total.protein > 20.0,
        high_fiber: total.fiber > 10.0,
        low_fat: total.fat < 30.0,
        calories_per_100g: calories_per_portion(calories_per_pound, 100.0),
    };
    let recommendations = generate_recommendations(&total);
    let messages = recommendations.iter().map(|r| r.to_string()).collect();

    NutritionSummary {
        macro_percentages: compute_macro_percentages(&total),
        total,
        per_pound,
        flags,
        recommendations,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::NutrientTable;

    fn aggregate(protein: f64, fiber: f64, vitamins: &[&str], minerals: &[&str], calories: f64) -> NutrientAggregate {
        NutrientAggregate {
            calories,
            protein,
            fiber,
            vitamins: vitamins.iter().map(|s| s.to_string()).collect(),
            minerals: minerals.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_recommendations_in_rule_order() {
        let totals = aggregate(30.0, 20.0, &["E"], &["Magnesio"], 900.0);
        assert_eq!(
            generate_recommendations(&totals),
            vec![
                Recommendation::HighProtein,
                Recommendation::HighFiber,
                Recommendation::Antioxidant,
                Recommendation::MuscleHealth,
                Recommendation::HighCalorie,
            ]
        );
    }

    #[test]
    fn test_no_recommendations_below_thresholds() {
        let totals = aggregate(10.0, 2.0, &[], &[], 300.0);
        assert!(generate_recommendations(&totals).is_empty());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let totals = aggregate(25.0, 15.0, &["e"], &["magnesio"], 800.0);
        assert!(generate_recommendations(&totals).is_empty());
    }

    #[test]
    fn test_rules_are_independent() {
        let totals = aggregate(0.0, 0.0, &[], &["Magnesio"], 801.0);
        assert_eq!(
            generate_recommendations(&totals),
            vec![Recommendation::MuscleHealth, Recommendation::HighCalorie]
        );
        assert!(Recommendation::HighCalorie.is_warning());
        assert!(!Recommendation::MuscleHealth.is_warning());
    }

    #[test]
    fn test_macro_percentages() {
        let totals = NutrientAggregate {
            protein: 25.0,
            fat: 50.0,
            carbs: 25.0,
            ..Default::default()
        };
        let split = compute_macro_percentages(&totals);
        assert_eq!(split.protein, 25.0);
        assert_eq!(split.fat, 50.0);
        assert_eq!(split.carbs, 25.0);
    }

    #[test]
    fn test_macro_percentages_zero_sum() {
        let split = compute_macro_percentages(&NutrientAggregate::default());
        assert_eq!(split, MacroPercentages { protein: 0.0, fat: 0.0, carbs: 0.0 });
        assert!(!split.protein.is_nan());
    }

    #[test]
    fn test_calories_per_portion() {
        assert_eq!(calories_per_portion(579.0, GRAMS_PER_POUND), 579.0);
        assert_eq!(calories_per_portion(0.0, 100.0), 0.0);
        // 579 * 100 / 453.6 = 127.645...
        assert_eq!(calories_per_portion(579.0, 100.0), 127.6);
    }

    #[test]
    fn test_summary_of_almond_raisin_mix() {
        let table = NutrientTable::builtin();
        let aggregator = MixAggregator::new(&table);
        let summary = summarize(
            &aggregator,
            &[MixComponent::new("A01", 1.0), MixComponent::new("P01", 1.0)],
        );

        assert_eq!(summary.total.calories, 878.0);
        assert_eq!(summary.per_pound.map(|p| p.calories_per_pound), Some(439.0));
        assert!(summary.flags.high_protein);
        assert!(summary.flags.high_fiber);
        assert!(!summary.flags.low_fat);
        assert_eq!(summary.flags.calories_per_100g, calories_per_portion(439.0, 100.0));
        assert_eq!(
            summary.recommendations,
            vec![
                Recommendation::HighFiber,
                Recommendation::Antioxidant,
                Recommendation::MuscleHealth,
                Recommendation::HighCalorie,
            ]
        );
        assert_eq!(summary.messages.len(), summary.recommendations.len());
    }

    #[test]
    fn test_summary_of_empty_mix() {
        let table = NutrientTable::builtin();
        let summary = summarize(&MixAggregator::new(&table), &[]);
        assert!(summary.per_pound.is_none());
        assert_eq!(summary.flags.calories_per_100g, 0.0);
        assert!(summary.flags.low_fat);
        assert!(summary.recommendations.is_empty());
    }
}
