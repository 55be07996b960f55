//! Data models
//!
//! Rust structs for the catalog, mixes and orders.

mod mix_component;
mod mix_draft;
mod nutrition;
mod order;
mod product;
mod saved_mix;

pub use mix_component::MixComponent;
pub use mix_draft::{
    validate_mix_name, validate_quantity, DuplicatePolicy, MixDraft, MixError, MixTotals,
};
pub use nutrition::{
    MacroPercentages, NutrientAggregate, NutrientProfile, NutrientProfileUpdate, PerPoundAverages,
};
pub use order::{Order, OrderCreate, OrderItem, OrderOrigin, OrderSummary};
pub use product::{seed_sample_catalog, Catalog, Product, ProductCreate, ProductUpdate};
pub use saved_mix::{SavedMix, SavedMixCreate, SavedMixSummary};
