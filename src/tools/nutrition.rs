//! Nutrition MCP Tools
//!
//! Tools for the nutrient table and stateless mix analysis.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Catalog, MixComponent, NutrientProfile, NutrientProfileUpdate};
use crate::nutrition::{
    component_shares, compute_total_price, summarize, AvailableProduct, ComponentShare,
    MixAggregator, NutritionSummary, ProductLookup, SharedNutrientTable,
};

/// Response for list_nutrition_products
#[derive(Debug, Serialize)]
pub struct ListNutritionProductsResponse {
    pub products: Vec<AvailableProduct>,
    pub total: usize,
}

/// Nutrition data of one product
#[derive(Debug, Serialize)]
pub struct ProductNutritionDetail {
    pub code: String,
    #[serde(flatten)]
    pub profile: NutrientProfile,
}

/// Response for add/update_product_nutrition
#[derive(Debug, Serialize)]
pub struct NutritionChangeResponse {
    pub success: bool,
    pub code: String,
    pub profile: NutrientProfile,
}

/// Response for analyze_mix
#[derive(Debug, Serialize)]
pub struct AnalyzeMixResponse {
    pub components: Vec<MixComponent>,
    pub total_price: f64,
    pub shares: Vec<ComponentShare>,
    #[serde(flatten)]
    pub summary: NutritionSummary,
}

fn check_values(values: [(&str, Option<f64>); 5]) -> Result<(), String> {
    for (field, value) in values {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{} must be a non-negative number", field));
            }
        }
    }
    Ok(())
}

/// List products that have nutrition data
pub fn list_nutrition_products(table: &SharedNutrientTable) -> ListNutritionProductsResponse {
    let products = table.read().list_available();
    let total = products.len();
    ListNutritionProductsResponse { products, total }
}

/// Get the per-pound nutrition of a product
pub fn get_product_nutrition(table: &SharedNutrientTable, code: &str) -> Option<ProductNutritionDetail> {
    table.read().lookup(code).map(|profile| ProductNutritionDetail {
        code: code.to_string(),
        profile: profile.clone(),
    })
}

/// Add nutrition data for a product code
pub fn add_product_nutrition(
    table: &SharedNutrientTable,
    code: &str,
    profile: NutrientProfile,
) -> Result<NutritionChangeResponse, String> {
    let code = code.trim();
    if code.is_empty() {
        return Err("Product code cannot be empty".to_string());
    }
    if profile.name.trim().is_empty() {
        return Err("Product name cannot be empty".to_string());
    }
    check_values([
        ("calories", Some(profile.calories)),
        ("protein", Some(profile.protein)),
        ("fat", Some(profile.fat)),
        ("carbs", Some(profile.carbs)),
        ("fiber", Some(profile.fiber)),
    ])?;

    table.add(code, profile).map_err(|e| e.to_string())?;
    tracing::info!("Added nutrition data for {}", code);

    let profile = table
        .read()
        .lookup(code)
        .cloned()
        .ok_or_else(|| format!("Product {} vanished after insert", code))?;

    Ok(NutritionChangeResponse {
        success: true,
        code: code.to_string(),
        profile,
    })
}

/// Update some fields of an existing product's nutrition data
pub fn update_product_nutrition(
    table: &SharedNutrientTable,
    code: &str,
    update: NutrientProfileUpdate,
) -> Result<NutritionChangeResponse, String> {
    if matches!(&update.name, Some(name) if name.trim().is_empty()) {
        return Err("Product name cannot be empty".to_string());
    }
    check_values([
        ("calories", update.calories),
        ("protein", update.protein),
        ("fat", update.fat),
        ("carbs", update.carbs),
        ("fiber", update.fiber),
    ])?;

    table.update(code, &update).map_err(|e| e.to_string())?;
    tracing::info!("Updated nutrition data for {}", code);

    let profile = table
        .read()
        .lookup(code)
        .cloned()
        .ok_or_else(|| format!("Product {} has no nutrition data", code))?;

    Ok(NutritionChangeResponse {
        success: true,
        code: code.to_string(),
        profile,
    })
}

/// Price and nutrition of an ad-hoc component list
///
/// Does not touch the draft. Quantities are used as given.
pub fn analyze_mix(
    db: &Database,
    table: &SharedNutrientTable,
    components: Vec<(String, f64)>,
) -> Result<AnalyzeMixResponse, String> {
    if let Some((code, _)) = components.iter().find(|(_, q)| !q.is_finite()) {
        return Err(format!("Quantity for {} must be a number", code));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let catalog = Catalog::load(&conn).map_err(|e| format!("Failed to load catalog: {}", e))?;

    let components: Vec<MixComponent> = components
        .into_iter()
        .map(|(code, quantity)| {
            let mut component = MixComponent::new(code, quantity);
            if let Some(name) = catalog.display_name(&component.product_code) {
                component.display_name = name.to_string();
            }
            component.line_total =
                catalog.unit_price(&component.product_code).unwrap_or(0.0) * quantity;
            component
        })
        .collect();

    let table = table.read();
    let aggregator = MixAggregator::new(&*table);

    Ok(AnalyzeMixResponse {
        total_price: compute_total_price(&components, &catalog),
        shares: component_shares(&components),
        summary: summarize(&aggregator, &components),
        components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::seed_sample_catalog;
    use crate::nutrition::NutrientTable;

    fn setup() -> (Database, SharedNutrientTable) {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            seed_sample_catalog(conn)?;
            Ok(())
        })
        .unwrap();
        (db, SharedNutrientTable::new(NutrientTable::builtin()))
    }

    fn profile(name: &str, calories: f64) -> NutrientProfile {
        NutrientProfile {
            name: name.to_string(),
            calories,
            protein: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let (_, table) = setup();
        assert!(add_product_nutrition(&table, " ", profile("X", 1.0)).is_err());
        assert!(add_product_nutrition(&table, "X01", profile("", 1.0)).is_err());
        assert!(add_product_nutrition(&table, "X01", profile("X", -1.0)).is_err());

        let err = add_product_nutrition(&table, "A01", profile("Otra", 1.0)).unwrap_err();
        assert!(err.contains("A01"));
        assert_eq!(table.read().lookup("A01").unwrap().calories, 579.0);
    }

    #[test]
    fn test_add_then_update() {
        let (_, table) = setup();
        add_product_nutrition(&table, "X01", profile("Mani", 567.0)).unwrap();
        assert_eq!(list_nutrition_products(&table).total, 11);

        let updated = update_product_nutrition(
            &table,
            "X01",
            NutrientProfileUpdate {
                calories: Some(570.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.profile.calories, 570.0);
        assert_eq!(updated.profile.name, "Mani");

        let missing = update_product_nutrition(&table, "Z99", NutrientProfileUpdate::default());
        assert!(missing.is_err());
        assert!(get_product_nutrition(&table, "Z99").is_none());
    }

    #[test]
    fn test_analyze_mix() {
        let (db, table) = setup();
        let result = analyze_mix(
            &db,
            &table,
            vec![("A01".to_string(), 1.0), ("P01".to_string(), 1.0)],
        )
        .unwrap();

        assert_eq!(result.summary.total.calories, 878.0);
        assert_eq!(result.summary.total.total_weight, 2.0);
        assert!((result.total_price - (17.99 + 10.99)).abs() < 1e-9);
        assert_eq!(result.components[0].display_name, "Almendras Premium");
        assert_eq!(result.shares[0].percent, 50.0);
    }

    #[test]
    fn test_analyze_empty_mix() {
        let (db, table) = setup();
        let result = analyze_mix(&db, &table, Vec::new()).unwrap();
        assert_eq!(result.total_price, 0.0);
        assert_eq!(result.summary.total.calories, 0.0);
        assert!(result.summary.per_pound.is_none());
        assert!(result.summary.recommendations.is_empty());
    }
}
