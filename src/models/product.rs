//! Product model
//!
//! Bulk catalog products priced per pound.

use std::collections::HashMap;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::ProductLookup;

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub name: String,
    pub country_of_origin: Option<String>,
    pub price_per_pound: f64,
    pub wholesale_price: f64,
    /// Price per pound charged in mixes
    pub retail_price: f64,
    /// Pounds available
    pub stock: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub code: String,
    pub name: String,
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub price_per_pound: f64,
    #[serde(default)]
    pub wholesale_price: f64,
    pub retail_price: f64,
    #[serde(default)]
    pub stock: f64,
}

/// Data for updating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub country_of_origin: Option<String>,
    pub price_per_pound: Option<f64>,
    pub wholesale_price: Option<f64>,
    pub retail_price: Option<f64>,
    pub stock: Option<f64>,
}

impl Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get("code")?,
            name: row.get("name")?,
            country_of_origin: row.get("country_of_origin")?,
            price_per_pound: row.get("price_per_pound")?,
            wholesale_price: row.get("wholesale_price")?,
            retail_price: row.get("retail_price")?,
            stock: row.get("stock")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new product
    pub fn create(conn: &Connection, data: &ProductCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO products (
                code, name, country_of_origin, price_per_pound, wholesale_price, retail_price, stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.code,
                data.name,
                data.country_of_origin,
                data.price_per_pound,
                data.wholesale_price,
                data.retail_price,
                data.stock,
            ],
        )?;

        Self::get_by_code(conn, &data.code)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a product by code
    pub fn get_by_code(conn: &Connection, code: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products WHERE code = ?1")?;

        let result = stmt.query_row([code], Self::from_row);
        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all products ordered by code
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products ORDER BY code ASC")?;

        let products = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    /// Search products by code or name substring
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let search_pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM products
            WHERE code LIKE ?1 OR name LIKE ?1
            ORDER BY name ASC
            LIMIT ?2
            "#,
        )?;

        let products = stmt
            .query_map(params![search_pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(products)
    }

    /// Update a product; returns None if it does not exist
    pub fn update(conn: &Connection, code: &str, data: &ProductUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", stringify!($field), params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name);
        add_update!(country_of_origin);
        add_update!(price_per_pound);
        add_update!(wholesale_price);
        add_update!(retail_price);
        add_update!(stock);

        if updates.is_empty() {
            return Self::get_by_code(conn, code);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE products SET {} WHERE code = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(code.to_string()));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_code(conn, code)
    }

    /// Delete a product; Ok(false) if it did not exist
    pub fn delete(conn: &Connection, code: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM products WHERE code = ?1", [code])?;
        Ok(rows > 0)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Insert the sample catalog, skipping codes that already exist
///
/// Returns the number of products inserted.
pub fn seed_sample_catalog(conn: &Connection) -> DbResult<usize> {
    let samples: [(&str, &str, &str, f64, f64, f64, f64); 5] = [
        ("A01", "Almendras Premium", "Estados Unidos", 15.99, 14.50, 17.99, 50.0),
        ("N01", "Nueces de Castilla", "Chile", 22.50, 20.00, 25.99, 30.0),
        ("P01", "Pasas Sultan", "Turquía", 8.75, 7.50, 10.99, 75.0),
        ("P02", "Pistachos Tostados", "Irán", 35.00, 32.00, 39.99, 20.0),
        ("A02", "Avellanas Enteras", "Italia", 18.25, 16.50, 21.99, 40.0),
    ];

    let mut inserted = 0;
    for (code, name, origin, per_pound, wholesale, retail, stock) in samples {
        inserted += conn.execute(
            r#"
            INSERT OR IGNORE INTO products (
                code, name, country_of_origin, price_per_pound, wholesale_price, retail_price, stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![code, name, origin, per_pound, wholesale, retail, stock],
        )?;
    }

    if inserted > 0 {
        tracing::info!("Seeded {} sample products", inserted);
    }
    Ok(inserted)
}

/// In-memory snapshot of the catalog used for pricing and stock checks
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<String, Product>,
}

impl Catalog {
    /// Load every product from the database
    pub fn load(conn: &Connection) -> DbResult<Self> {
        Ok(Self::from_products(Product::list(conn)?))
    }

    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.code.clone(), p)).collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Product> {
        self.products.get(code)
    }
}

impl ProductLookup for Catalog {
    fn unit_price(&self, product_code: &str) -> Option<f64> {
        self.get(product_code).map(|p| p.retail_price)
    }

    fn stock(&self, product_code: &str) -> Option<f64> {
        self.get(product_code).map(|p| p.stock)
    }

    fn display_name(&self, product_code: &str) -> Option<&str> {
        self.get(product_code).map(|p| p.name.as_str())
    }
}
