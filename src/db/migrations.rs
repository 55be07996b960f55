//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    let version = get_schema_version(conn)?;
    if version != SCHEMA_VERSION {
        tracing::warn!("Database schema at v{}, expected v{}", version, SCHEMA_VERSION);
    }
    Ok(())
}

/// Highest applied schema version, 0 for a fresh database
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- PRODUCTS
        -- Bulk catalog: prices are per pound, stock in pounds
        -- ============================================
        CREATE TABLE products (
            code TEXT PRIMARY KEY,               -- e.g., "A01"
            name TEXT NOT NULL,
            country_of_origin TEXT,
            price_per_pound REAL NOT NULL DEFAULT 0,
            wholesale_price REAL NOT NULL DEFAULT 0,
            retail_price REAL NOT NULL DEFAULT 0,
            stock REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_products_name ON products(name);

        -- ============================================
        -- SAVED MIXES
        -- Named mixes with a snapshot of price and nutrition
        -- ============================================
        CREATE TABLE saved_mixes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL COLLATE NOCASE UNIQUE,
            total_price REAL NOT NULL,
            nutrition_json TEXT NOT NULL,        -- NutrientAggregate at save time
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE saved_mix_components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mix_id INTEGER NOT NULL REFERENCES saved_mixes(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            product_code TEXT NOT NULL,          -- not a FK: the snapshot outlives catalog edits
            display_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            line_total REAL NOT NULL
        );

        CREATE INDEX idx_saved_mix_components_mix ON saved_mix_components(mix_id);

        -- ============================================
        -- ORDERS
        -- Orders created from a mix, with embedded snapshot
        -- ============================================
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mix_name TEXT NOT NULL,
            origin TEXT NOT NULL CHECK(origin IN ('admin', 'client')),
            customer_name TEXT,
            observations TEXT,
            status TEXT NOT NULL,
            total_amount REAL NOT NULL,
            nutrition_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_orders_created ON orders(created_at);

        CREATE TABLE order_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            product_code TEXT NOT NULL,
            product_name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit_price REAL NOT NULL,
            line_total REAL NOT NULL
        );

        CREATE INDEX idx_order_items_order ON order_items(order_id);
        "#,
    )?;

    Ok(())
}
