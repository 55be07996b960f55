//! Mix Draft model
//!
//! The mix being designed, before it is saved or ordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{MixComponent, NutrientAggregate};
use crate::nutrition::{
    compute_total_price, summarize, MixAggregator, NutrientSource, NutritionSummary, ProductLookup,
};

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 25;

/// Validation failures while editing a mix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixError {
    #[error("Quantity must be a positive number")]
    InvalidQuantity,

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Only {available} pounds of {code} available")]
    ExceedsStock { code: String, available: f64 },

    #[error("Product {0} is already in the mix; edit its quantity instead")]
    DuplicateProduct(String),

    #[error("Product {0} is not in the mix")]
    ComponentNotFound(String),

    #[error("Invalid mix name: {0}")]
    InvalidName(&'static str),

    #[error("The mix has no products")]
    EmptyMix,
}

/// What to do when a product already in the mix is added again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse the second line
    #[default]
    Reject,
    /// Add the new quantity to the existing line
    Merge,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::Reject => "reject",
            DuplicatePolicy::Merge => "merge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Some(DuplicatePolicy::Reject),
            "merge" => Some(DuplicatePolicy::Merge),
            _ => None,
        }
    }
}

/// Check a mix name: 3 to 25 ASCII letters, digits, whitespace or underscores
///
/// The name is checked as given; surrounding whitespace counts.
pub fn validate_mix_name(name: &str) -> Result<(), MixError> {
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(MixError::InvalidName("must be between 3 and 25 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '_')
    {
        return Err(MixError::InvalidName(
            "only letters, digits, whitespace and underscores are allowed",
        ));
    }
    Ok(())
}

/// Check a requested quantity against the catalog
pub fn validate_quantity<L: ProductLookup + ?Sized>(
    quantity: f64,
    product_code: &str,
    lookup: &L,
) -> Result<(), MixError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(MixError::InvalidQuantity);
    }

    let Some(available) = lookup.stock(product_code) else {
        return Err(MixError::ProductNotFound(product_code.to_string()));
    };

    if quantity > available {
        return Err(MixError::ExceedsStock {
            code: product_code.to_string(),
            available,
        });
    }

    Ok(())
}

/// Price and nutrition of a draft at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct MixTotals {
    pub name: String,
    pub components: Vec<MixComponent>,
    pub total_price: f64,
    pub summary: NutritionSummary,
}

impl MixTotals {
    pub fn nutrition(&self) -> &NutrientAggregate {
        &self.summary.total
    }
}

/// An in-progress mix
#[derive(Debug, Clone, Default, Serialize)]
pub struct MixDraft {
    pub name: String,
    pub components: Vec<MixComponent>,
    #[serde(skip)]
    policy: DuplicatePolicy,
}

impl MixDraft {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            name: String::new(),
            components: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), MixError> {
        validate_mix_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    /// Add a product line, applying the duplicate policy
    pub fn add_component<L: ProductLookup + ?Sized>(
        &mut self,
        product_code: &str,
        quantity: f64,
        lookup: &L,
    ) -> Result<&MixComponent, MixError> {
        validate_quantity(quantity, product_code, lookup)?;

        if let Some(index) = self.position(product_code) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(MixError::DuplicateProduct(product_code.to_string()));
                }
                DuplicatePolicy::Merge => {
                    let merged = self.components[index].quantity + quantity;
                    validate_quantity(merged, product_code, lookup)?;
                    let component = &mut self.components[index];
                    component.quantity = merged;
                    component.line_total = line_total(product_code, merged, lookup);
                    return Ok(&self.components[index]);
                }
            }
        }

        let display_name = lookup
            .display_name(product_code)
            .unwrap_or(product_code)
            .to_string();
        self.components.push(MixComponent {
            product_code: product_code.to_string(),
            quantity,
            display_name,
            line_total: line_total(product_code, quantity, lookup),
        });

        let last = self.components.len() - 1;
        Ok(&self.components[last])
    }

    /// Change the quantity of an existing line
    pub fn update_quantity<L: ProductLookup + ?Sized>(
        &mut self,
        product_code: &str,
        quantity: f64,
        lookup: &L,
    ) -> Result<&MixComponent, MixError> {
        let index = self
            .position(product_code)
            .ok_or_else(|| MixError::ComponentNotFound(product_code.to_string()))?;
        validate_quantity(quantity, product_code, lookup)?;

        let component = &mut self.components[index];
        component.quantity = quantity;
        component.line_total = line_total(product_code, quantity, lookup);
        Ok(&self.components[index])
    }

    pub fn remove_component(&mut self, product_code: &str) -> Result<MixComponent, MixError> {
        let index = self
            .position(product_code)
            .ok_or_else(|| MixError::ComponentNotFound(product_code.to_string()))?;
        Ok(self.components.remove(index))
    }

    /// Empty the draft, keeping the policy
    pub fn clear(&mut self) {
        self.name.clear();
        self.components.clear();
    }

    /// Replace the draft contents, e.g. from a saved mix
    pub fn load(&mut self, name: &str, components: Vec<MixComponent>) {
        self.name = name.to_string();
        self.components = components;
    }

    /// Fresh price and nutrition for the current lines, at current prices
    pub fn totals<S, L>(&self, source: &S, lookup: &L) -> MixTotals
    where
        S: NutrientSource + ?Sized,
        L: ProductLookup + ?Sized,
    {
        let mut components = self.components.clone();
        for component in &mut components {
            component.reprice(lookup);
        }

        let aggregator = MixAggregator::new(source);
        MixTotals {
            name: self.name.clone(),
            total_price: compute_total_price(&components, lookup),
            summary: summarize(&aggregator, &components),
            components,
        }
    }

    fn position(&self, product_code: &str) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.product_code == product_code)
    }
}

fn line_total<L: ProductLookup + ?Sized>(product_code: &str, quantity: f64, lookup: &L) -> f64 {
    lookup.unit_price(product_code).unwrap_or(0.0) * quantity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Catalog;
    use crate::models::Product;
    use crate::nutrition::NutrientTable;

    fn product(code: &str, name: &str, retail_price: f64, stock: f64) -> Product {
        Product {
            code: code.to_string(),
            name: name.to_string(),
            country_of_origin: None,
            price_per_pound: retail_price,
            wholesale_price: retail_price,
            retail_price,
            stock,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_products(vec![
            product("A01", "Almendras Premium", 17.99, 50.0),
            product("P01", "Pasas Sultan", 10.99, 75.0),
            product("X01", "Sin Datos", 5.0, 10.0),
        ])
    }

    #[test]
    fn test_validate_mix_name() {
        assert!(validate_mix_name("Mix Energia_1").is_ok());
        assert!(validate_mix_name("ab").is_err());
        assert!(validate_mix_name(&"a".repeat(26)).is_err());
        assert!(validate_mix_name(&"a".repeat(25)).is_ok());
        assert!(validate_mix_name("Mix-1").is_err());
        assert!(validate_mix_name("Mezcla ñ").is_err());
    }

    #[test]
    fn test_mix_name_whitespace_counts() {
        assert!(validate_mix_name("Mix\tEnergia").is_ok());
        // Padding is part of the name and its length
        assert!(validate_mix_name(" ab").is_ok());
        assert!(validate_mix_name(&format!(" {} ", "a".repeat(24))).is_err());

        let mut draft = MixDraft::default();
        draft.set_name(" Energia ").unwrap();
        assert_eq!(draft.name, " Energia ");
    }

    #[test]
    fn test_validate_quantity() {
        let catalog = catalog();
        assert_eq!(validate_quantity(0.0, "A01", &catalog), Err(MixError::InvalidQuantity));
        assert_eq!(validate_quantity(-1.0, "A01", &catalog), Err(MixError::InvalidQuantity));
        assert_eq!(validate_quantity(f64::NAN, "A01", &catalog), Err(MixError::InvalidQuantity));
        assert_eq!(
            validate_quantity(1.0, "ZZZ", &catalog),
            Err(MixError::ProductNotFound("ZZZ".to_string()))
        );
        assert_eq!(
            validate_quantity(50.5, "A01", &catalog),
            Err(MixError::ExceedsStock { code: "A01".to_string(), available: 50.0 })
        );
        assert!(validate_quantity(50.0, "A01", &catalog).is_ok());
    }

    #[test]
    fn test_add_component_sets_display_data() {
        let catalog = catalog();
        let mut draft = MixDraft::new(DuplicatePolicy::Reject);
        let added = draft.add_component("A01", 2.0, &catalog).unwrap().clone();
        assert_eq!(added.display_name, "Almendras Premium");
        assert!((added.line_total - 35.98).abs() < 1e-9);
    }

    #[test]
    fn test_reject_policy_refuses_duplicates() {
        let catalog = catalog();
        let mut draft = MixDraft::new(DuplicatePolicy::Reject);
        draft.add_component("A01", 1.0, &catalog).unwrap();
        assert_eq!(
            draft.add_component("A01", 1.0, &catalog).unwrap_err(),
            MixError::DuplicateProduct("A01".to_string())
        );
        assert_eq!(draft.components.len(), 1);
        assert_eq!(draft.components[0].quantity, 1.0);
    }

    #[test]
    fn test_merge_policy_sums_quantities() {
        let catalog = catalog();
        let mut draft = MixDraft::new(DuplicatePolicy::Merge);
        draft.add_component("A01", 1.0, &catalog).unwrap();
        draft.add_component("A01", 1.5, &catalog).unwrap();
        assert_eq!(draft.components.len(), 1);
        assert_eq!(draft.components[0].quantity, 2.5);

        // The merged amount is checked against stock
        let err = draft.add_component("A01", 48.0, &catalog).unwrap_err();
        assert!(matches!(err, MixError::ExceedsStock { .. }));
        assert_eq!(draft.components[0].quantity, 2.5);
    }

    #[test]
    fn test_update_and_remove() {
        let catalog = catalog();
        let mut draft = MixDraft::new(DuplicatePolicy::Reject);
        draft.add_component("A01", 1.0, &catalog).unwrap();
        draft.add_component("P01", 1.0, &catalog).unwrap();

        let updated = draft.update_quantity("P01", 3.0, &catalog).unwrap().clone();
        assert_eq!(updated.quantity, 3.0);
        assert!((updated.line_total - 32.97).abs() < 1e-9);

        assert!(draft.update_quantity("P01", 0.0, &catalog).is_err());
        assert_eq!(draft.components[1].quantity, 3.0);
        assert_eq!(
            draft.update_quantity("N01", 1.0, &catalog).unwrap_err(),
            MixError::ComponentNotFound("N01".to_string())
        );

        let removed = draft.remove_component("A01").unwrap();
        assert_eq!(removed.product_code, "A01");
        assert!(draft.remove_component("A01").is_err());
        assert_eq!(draft.components.len(), 1);
    }

    #[test]
    fn test_totals_use_catalog_prices_and_skip_unknown_nutrition() {
        let catalog = catalog();
        let table = NutrientTable::builtin();
        let mut draft = MixDraft::new(DuplicatePolicy::Reject);
        draft.set_name("Energia").unwrap();
        draft.add_component("A01", 1.0, &catalog).unwrap();
        draft.add_component("P01", 1.0, &catalog).unwrap();
        draft.add_component("X01", 2.0, &catalog).unwrap();

        let totals = draft.totals(&table, &catalog);
        assert!((totals.total_price - (17.99 + 10.99 + 10.0)).abs() < 1e-9);
        assert_eq!(totals.nutrition().calories, 878.0);
        assert_eq!(totals.nutrition().total_weight, 2.0);
        // Divisor counts the product without nutrition data
        assert_eq!(totals.summary.per_pound.map(|p| p.calories_per_pound), Some(219.5));
    }

    #[test]
    fn test_totals_reprice_lines_at_current_prices() {
        let mut draft = MixDraft::new(DuplicatePolicy::Reject);
        draft.add_component("A01", 2.0, &catalog()).unwrap();

        let repriced = Catalog::from_products(vec![product("A01", "Almendras Tostadas", 20.0, 50.0)]);
        let totals = draft.totals(&NutrientTable::builtin(), &repriced);

        assert_eq!(totals.components[0].line_total, 40.0);
        assert_eq!(totals.components[0].display_name, "Almendras Tostadas");
        let lines: f64 = totals.components.iter().map(|c| c.line_total).sum();
        assert_eq!(lines, totals.total_price);
        // The draft itself is not rewritten
        assert!((draft.components[0].line_total - 35.98).abs() < 1e-9);
    }

    #[test]
    fn test_clear_keeps_policy() {
        let catalog = catalog();
        let mut draft = MixDraft::new(DuplicatePolicy::Merge);
        draft.set_name("Para Clear").unwrap();
        draft.add_component("A01", 1.0, &catalog).unwrap();
        draft.clear();
        assert!(draft.is_empty());
        assert!(draft.name.is_empty());
        assert_eq!(draft.policy(), DuplicatePolicy::Merge);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DuplicatePolicy::parse("Merge"), Some(DuplicatePolicy::Merge));
        assert_eq!(DuplicatePolicy::parse(" reject "), Some(DuplicatePolicy::Reject));
        assert_eq!(DuplicatePolicy::parse("sum"), None);
    }
}
