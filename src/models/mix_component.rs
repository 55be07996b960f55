//! Mix Component model
//!
//! One product line within a mix.

use serde::{Deserialize, Serialize};

use crate::nutrition::ProductLookup;

/// A product and the pounds of it used in a mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixComponent {
    pub product_code: String,
    /// Pounds of product
    pub quantity: f64,
    #[serde(default)]
    pub display_name: String,
    /// Retail price of this line at the time it was added or edited
    #[serde(default)]
    pub line_total: f64,
}

impl MixComponent {
    /// A bare line with no display data, as used by the aggregator
    pub fn new(product_code: impl Into<String>, quantity: f64) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
            display_name: String::new(),
            line_total: 0.0,
        }
    }

    /// Refresh the name and line total from current catalog data
    ///
    /// Products the lookup doesn't know keep their stored values.
    pub fn reprice<L: ProductLookup + ?Sized>(&mut self, lookup: &L) {
        if let Some(price) = lookup.unit_price(&self.product_code) {
            self.line_total = price * self.quantity;
        }
        if let Some(name) = lookup.display_name(&self.product_code) {
            self.display_name = name.to_string();
        }
    }

    /// Price per pound implied by the stored line total
    pub fn unit_price(&self) -> f64 {
        if self.quantity > 0.0 {
            self.line_total / self.quantity
        } else {
            0.0
        }
    }
}
