//! Catalog MCP Tools
//!
//! Tools for managing the products that can go into a mix.

use serde::Serialize;

use crate::db::Database;
use crate::models::{seed_sample_catalog, Product, ProductCreate, ProductUpdate};

/// Response for list_products and search_products
#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub products: Vec<Product>,
    pub total: usize,
}

/// Response for delete_product
#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub success: bool,
    pub code: String,
}

/// Response for seed_catalog
#[derive(Debug, Serialize)]
pub struct SeedCatalogResponse {
    pub inserted: usize,
    pub total: i64,
}

fn check_amount(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(())
}

/// Add a product to the catalog
pub fn add_product(db: &Database, mut data: ProductCreate) -> Result<Product, String> {
    data.code = data.code.trim().to_string();
    data.name = data.name.trim().to_string();
    if data.code.is_empty() {
        return Err("Product code cannot be empty".to_string());
    }
    if data.name.is_empty() {
        return Err("Product name cannot be empty".to_string());
    }
    check_amount("price_per_pound", data.price_per_pound)?;
    check_amount("wholesale_price", data.wholesale_price)?;
    check_amount("retail_price", data.retail_price)?;
    check_amount("stock", data.stock)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = Product::get_by_code(&conn, &data.code)
        .map_err(|e| format!("Database error: {}", e))?;
    if existing.is_some() {
        return Err(format!("Product {} already exists", data.code));
    }

    let product = Product::create(&conn, &data)
        .map_err(|e| format!("Failed to create product: {}", e))?;
    tracing::info!("Added product {} ({})", product.code, product.name);
    Ok(product)
}

/// Get a product by code
pub fn get_product(db: &Database, code: &str) -> Result<Option<Product>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Product::get_by_code(&conn, code).map_err(|e| format!("Failed to get product: {}", e))
}

/// List the whole catalog
pub fn list_products(db: &Database) -> Result<ListProductsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let products = Product::list(&conn).map_err(|e| format!("Failed to list products: {}", e))?;
    let total = products.len();
    Ok(ListProductsResponse { products, total })
}

/// Search products by code or name
pub fn search_products(db: &Database, query: &str, limit: i64) -> Result<ListProductsResponse, String> {
    let limit = limit.clamp(1, 200);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let products = Product::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Failed to search products: {}", e))?;
    let total = products.len();
    Ok(ListProductsResponse { products, total })
}

/// Update some fields of a product
pub fn update_product(db: &Database, code: &str, data: ProductUpdate) -> Result<Product, String> {
    if matches!(&data.name, Some(name) if name.trim().is_empty()) {
        return Err("Product name cannot be empty".to_string());
    }
    for (field, value) in [
        ("price_per_pound", data.price_per_pound),
        ("wholesale_price", data.wholesale_price),
        ("retail_price", data.retail_price),
        ("stock", data.stock),
    ] {
        if let Some(v) = value {
            check_amount(field, v)?;
        }
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let updated = Product::update(&conn, code, &data)
        .map_err(|e| format!("Failed to update product: {}", e))?;

    match updated {
        Some(product) => {
            tracing::info!("Updated product {}", code);
            Ok(product)
        }
        None => Err(format!("Product not found with code: {}", code)),
    }
}

/// Remove a product from the catalog
///
/// Saved mixes and orders keep their own copies of the lines.
pub fn delete_product(db: &Database, code: &str) -> Result<DeleteProductResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Product::delete(&conn, code)
        .map_err(|e| format!("Failed to delete product: {}", e))?;

    if !deleted {
        return Err(format!("Product not found with code: {}", code));
    }
    tracing::info!("Deleted product {}", code);
    Ok(DeleteProductResponse {
        success: true,
        code: code.to_string(),
    })
}

/// Insert the sample catalog
pub fn seed_catalog(db: &Database) -> Result<SeedCatalogResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let inserted = seed_sample_catalog(&conn).map_err(|e| format!("Failed to seed catalog: {}", e))?;
    let total = Product::count(&conn).map_err(|e| format!("Failed to count products: {}", e))?;
    Ok(SeedCatalogResponse { inserted, total })
}
