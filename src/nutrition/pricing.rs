//! Product price and stock lookup
//!
//! The catalog side of a mix: retail price per pound and available pounds.

use std::collections::HashMap;

/// Resolves catalog data for a product code
pub trait ProductLookup {
    /// Retail price per pound
    fn unit_price(&self, product_code: &str) -> Option<f64>;

    /// Pounds available for sale
    fn stock(&self, product_code: &str) -> Option<f64> {
        let _ = product_code;
        None
    }

    fn display_name(&self, product_code: &str) -> Option<&str> {
        let _ = product_code;
        None
    }
}

/// Plain price map; no stock or names
impl ProductLookup for HashMap<String, f64> {
    fn unit_price(&self, product_code: &str) -> Option<f64> {
        self.get(product_code).copied()
    }
}
