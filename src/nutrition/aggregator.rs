//! Mix aggregation
//!
//! Turns a list of mix components into price and nutrition totals.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::pricing::ProductLookup;
use super::table::NutrientSource;
use crate::models::{MixComponent, NutrientAggregate, NutrientProfile, PerPoundAverages};

/// How one component feeds into the totals
#[derive(Debug, Clone, Copy)]
pub enum Contribution<'a> {
    Matched {
        profile: &'a NutrientProfile,
        quantity: f64,
    },
    /// No nutrition data for the product; contributes nothing
    Absent,
}

/// One component's share of the mix weight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentShare {
    pub product_code: String,
    pub quantity: f64,
    /// Percentage of the summed quantity
    pub percent: f64,
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Current time as an RFC 3339 UTC timestamp
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Sum of all component quantities, matched or not
pub fn total_quantity(components: &[MixComponent]) -> f64 {
    components.iter().map(|c| c.quantity).sum()
}

/// Stateless aggregator over a nutrient source
pub struct MixAggregator<'a, S: NutrientSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: NutrientSource + ?Sized> MixAggregator<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolve a component against the nutrient source
    pub fn resolve(&self, component: &MixComponent) -> Contribution<'a> {
        let source: &'a S = self.source;
        match source.lookup(&component.product_code) {
            Some(profile) => Contribution::Matched {
                profile,
                quantity: component.quantity,
            },
            None => Contribution::Absent,
        }
    }

    /// Total nutrition of the mix
    ///
    /// Quantities are pounds and profiles are per pound, so each field is
    /// `profile.field * quantity`. Numeric totals are rounded to one decimal,
    /// the weight to two.
    pub fn compute_nutrition(&self, components: &[MixComponent]) -> NutrientAggregate {
        let computed_at = timestamp_now();
        if components.is_empty() {
            return NutrientAggregate::zero(computed_at);
        }

        let mut calories = 0.0;
        let mut protein = 0.0;
        let mut fat = 0.0;
        let mut carbs = 0.0;
        let mut fiber = 0.0;
        let mut total_weight = 0.0;
        let mut vitamins = TagUnion::default();
        let mut minerals = TagUnion::default();

        for component in components {
            match self.resolve(component) {
                Contribution::Matched { profile, quantity } => {
                    total_weight += quantity;
                    calories += profile.calories * quantity;
                    protein += profile.protein * quantity;
                    fat += profile.fat * quantity;
                    carbs += profile.carbs * quantity;
                    fiber += profile.fiber * quantity;
                    vitamins.extend(&profile.vitamins);
                    minerals.extend(&profile.minerals);
                }
                Contribution::Absent => {}
            }
        }

        NutrientAggregate {
            calories: round1(calories),
            protein: round1(protein),
            fat: round1(fat),
            carbs: round1(carbs),
            fiber: round1(fiber),
            vitamins: vitamins.into_vec(),
            minerals: minerals.into_vec(),
            total_weight: round2(total_weight),
            computed_at,
        }
    }

    /// Retail price of the mix; unpriced products count as zero. Not rounded.
    pub fn compute_total_price<L: ProductLookup + ?Sized>(
        &self,
        components: &[MixComponent],
        lookup: &L,
    ) -> f64 {
        compute_total_price(components, lookup)
    }

    /// Nutrition per pound of mix
    ///
    /// The divisor is the quantity of every component, including ones with
    /// no nutrition data, so the averages need not reconcile with
    /// `total_weight`. Returns `None` when the divisor is zero.
    pub fn compute_per_pound_averages(&self, components: &[MixComponent]) -> Option<PerPoundAverages> {
        if components.is_empty() {
            return None;
        }

        let pounds = total_quantity(components);
        if pounds == 0.0 {
            return None;
        }

        let totals = self.compute_nutrition(components);
        Some(PerPoundAverages {
            calories_per_pound: round1(totals.calories / pounds),
            protein_per_pound: round1(totals.protein / pounds),
            fat_per_pound: round1(totals.fat / pounds),
            carbs_per_pound: round1(totals.carbs / pounds),
            fiber_per_pound: round1(totals.fiber / pounds),
        })
    }
}

/// Retail price of a component list; unpriced products count as zero
pub fn compute_total_price<L: ProductLookup + ?Sized>(components: &[MixComponent], lookup: &L) -> f64 {
    components
        .iter()
        .map(|c| lookup.unit_price(&c.product_code).unwrap_or(0.0) * c.quantity)
        .sum()
}

/// Each component's quantity as a percentage of the total quantity
pub fn component_shares(components: &[MixComponent]) -> Vec<ComponentShare> {
    let pounds = total_quantity(components);
    components
        .iter()
        .map(|c| ComponentShare {
            product_code: c.product_code.clone(),
            quantity: c.quantity,
            percent: if pounds > 0.0 { c.quantity / pounds * 100.0 } else { 0.0 },
        })
        .collect()
}

/// Set union of tags that remembers first-seen order
#[derive(Default)]
struct TagUnion {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TagUnion {
    fn extend(&mut self, tags: &[String]) {
        for tag in tags {
            if self.seen.insert(tag.clone()) {
                self.ordered.push(tag.clone());
            }
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::nutrition::NutrientTable;

    fn has_tag(tags: &[String], tag: &str) -> bool {
        tags.iter().any(|t| t == tag)
    }

    #[test]
    fn test_empty_input_is_zero_aggregate() {
        let table = NutrientTable::builtin();
        let totals = MixAggregator::new(&table).compute_nutrition(&[]);
        assert_eq!(totals.calories, 0.0);
        assert_eq!(totals.protein, 0.0);
        assert_eq!(totals.fat, 0.0);
        assert_eq!(totals.carbs, 0.0);
        assert_eq!(totals.fiber, 0.0);
        assert_eq!(totals.total_weight, 0.0);
        assert!(totals.vitamins.is_empty());
        assert!(totals.minerals.is_empty());
        assert!(!totals.computed_at.is_empty());
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let table = NutrientTable::builtin();
        let totals = MixAggregator::new(&table)
            .compute_nutrition(&[MixComponent::new("NOEXISTE", 5.0)]);
        assert!(totals.same_values(&NutrientAggregate::zero(String::new())));
        assert!(!totals.calories.is_nan());
    }

    #[test]
    fn test_unknown_code_leaves_matched_totals_unchanged() {
        let table = NutrientTable::builtin();
        let aggregator = MixAggregator::new(&table);
        let alone = aggregator.compute_nutrition(&[MixComponent::new("A01", 1.0)]);
        let mixed = aggregator.compute_nutrition(&[
            MixComponent::new("A01", 1.0),
            MixComponent::new("NOEXISTE", 3.0),
        ]);
        assert!(alone.same_values(&mixed));
        assert_eq!(mixed.total_weight, 1.0);
    }

    #[test]
    fn test_single_product_totals() {
        let table = NutrientTable::builtin();
        let totals = MixAggregator::new(&table)
            .compute_nutrition(&[MixComponent::new("A01", 1.0)]);
        assert_eq!(totals.calories, 579.0);
        assert_eq!(totals.protein, 21.2);
        assert_eq!(totals.fiber, 12.5);
        assert_eq!(totals.total_weight, 1.0);
    }

    #[test]
    fn test_exact_decimal_sums_are_not_distorted() {
        let table = NutrientTable::builtin();
        let totals = MixAggregator::new(&table).compute_nutrition(&[
            MixComponent::new("A01", 1.0),
            MixComponent::new("P01", 1.0),
        ]);
        assert_eq!(totals.calories, 878.0);
        assert_eq!(totals.total_weight, 2.0);
    }

    #[test]
    fn test_linearity_in_quantity() {
        let table = NutrientTable::builtin();
        let aggregator = MixAggregator::new(&table);
        let profile = table.lookup("N01").unwrap();
        let q = 0.35;

        let single = aggregator.compute_nutrition(&[MixComponent::new("N01", q)]);
        let double = aggregator.compute_nutrition(&[MixComponent::new("N01", 2.0 * q)]);

        assert_eq!(single.calories, round1(profile.calories * q));
        assert_eq!(double.calories, round1(2.0 * profile.calories * q));
        assert_eq!(double.protein, round1(2.0 * profile.protein * q));
        assert_eq!(double.fat, round1(2.0 * profile.fat * q));
        assert_eq!(double.carbs, round1(2.0 * profile.carbs * q));
        assert_eq!(double.fiber, round1(2.0 * profile.fiber * q));
        assert_eq!(double.total_weight, 0.7);
    }

    #[test]
    fn test_shared_tags_appear_once() {
        let table = NutrientTable::builtin();
        // Both carry vitamin E and magnesium
        let totals = MixAggregator::new(&table).compute_nutrition(&[
            MixComponent::new("A01", 0.5),
            MixComponent::new("N01", 0.5),
        ]);
        assert_eq!(totals.vitamins.iter().filter(|v| *v == "E").count(), 1);
        assert_eq!(totals.minerals.iter().filter(|m| *m == "Magnesio").count(), 1);
        for tag in ["E", "B2", "Niacina", "B6", "Folato"] {
            assert!(has_tag(&totals.vitamins, tag), "missing vitamin {}", tag);
        }
        assert_eq!(totals.vitamins.len(), 5);
    }

    #[test]
    fn test_zero_quantity_counts_toward_weight_only() {
        let table = NutrientTable::builtin();
        let totals = MixAggregator::new(&table)
            .compute_nutrition(&[MixComponent::new("A01", 0.0)]);
        assert_eq!(totals.calories, 0.0);
        assert_eq!(totals.total_weight, 0.0);
        // Tags still come from the matched profile
        assert!(has_tag(&totals.vitamins, "E"));
    }

    #[test]
    fn test_works_with_fake_source() {
        let mut fake: HashMap<String, NutrientProfile> = HashMap::new();
        fake.insert(
            "X".to_string(),
            NutrientProfile {
                name: "Test".to_string(),
                calories: 100.0,
                protein: 10.0,
                ..Default::default()
            },
        );
        let totals = MixAggregator::new(&fake).compute_nutrition(&[MixComponent::new("X", 2.5)]);
        assert_eq!(totals.calories, 250.0);
        assert_eq!(totals.protein, 25.0);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let table = NutrientTable::builtin();
        let aggregator = MixAggregator::new(&table);
        let components = vec![
            MixComponent::new("A01", 0.5),
            MixComponent::new("S02", 0.25),
            MixComponent::new("D01", 1.2),
        ];
        let first = aggregator.compute_nutrition(&components);
        let second = aggregator.compute_nutrition(&components);
        assert!(first.same_values(&second));
    }

    #[test]
    fn test_total_price() {
        let table = NutrientTable::builtin();
        let mut prices: HashMap<String, f64> = HashMap::new();
        prices.insert("A01".to_string(), 17.99);
        prices.insert("P01".to_string(), 10.99);

        let total = MixAggregator::new(&table).compute_total_price(
            &[
                MixComponent::new("A01", 2.0),
                MixComponent::new("P01", 0.5),
                MixComponent::new("NOEXISTE", 4.0),
            ],
            &prices,
        );
        assert!((total - (17.99 * 2.0 + 10.99 * 0.5)).abs() < 1e-9);
        assert_eq!(compute_total_price(&[], &prices), 0.0);
    }

    #[test]
    fn test_per_pound_guards() {
        let table = NutrientTable::builtin();
        let aggregator = MixAggregator::new(&table);
        assert!(aggregator.compute_per_pound_averages(&[]).is_none());
        assert!(aggregator
            .compute_per_pound_averages(&[MixComponent::new("A01", 0.0)])
            .is_none());
    }

    #[test]
    fn test_per_pound_averages() {
        let table = NutrientTable::builtin();
        let averages = MixAggregator::new(&table)
            .compute_per_pound_averages(&[
                MixComponent::new("A01", 1.0),
                MixComponent::new("P01", 1.0),
            ])
            .unwrap();
        assert_eq!(averages.calories_per_pound, 439.0);
        assert_eq!(averages.fat_per_pound, 25.2);
    }

    #[test]
    fn test_per_pound_divisor_includes_unmatched() {
        let table = NutrientTable::builtin();
        let averages = MixAggregator::new(&table)
            .compute_per_pound_averages(&[
                MixComponent::new("A01", 1.0),
                MixComponent::new("NOEXISTE", 1.0),
            ])
            .unwrap();
        assert_eq!(averages.calories_per_pound, 289.5);
    }

    #[test]
    fn test_component_shares() {
        let shares = component_shares(&[
            MixComponent::new("A01", 1.0),
            MixComponent::new("P01", 3.0),
        ]);
        assert_eq!(shares[0].percent, 25.0);
        assert_eq!(shares[1].percent, 75.0);

        let zero = component_shares(&[MixComponent::new("A01", 0.0)]);
        assert_eq!(zero[0].percent, 0.0);
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round1(12.25), 12.3);
        assert_eq!(round1(0.04), 0.0);
        assert_eq!(round2(2.346), 2.35);
        assert_eq!(round2(0.333), 0.33);
    }
}
