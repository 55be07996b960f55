//! Nutrition calculation module
//!
//! Nutrient table, mix aggregation and derived analytics.

pub mod aggregator;
pub mod analytics;
pub mod pricing;
pub mod table;

pub use aggregator::{
    component_shares, compute_total_price, round1, round2, timestamp_now, total_quantity,
    ComponentShare, Contribution, MixAggregator,
};
pub use analytics::{
    calories_per_portion, compute_macro_percentages, generate_recommendations, summarize,
    NutritionFlags, NutritionSummary, Recommendation, GRAMS_PER_POUND,
};
pub use pricing::ProductLookup;
pub use table::{
    AvailableProduct, NutrientSource, NutrientTable, NutrientTableError, SharedNutrientTable,
};
