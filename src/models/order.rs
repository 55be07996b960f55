//! Order model
//!
//! Orders placed from a mix. The nutrition block and item prices are a
//! snapshot taken when the order is created and are never re-derived.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{MixComponent, NutrientAggregate};
use crate::db::{DbError, DbResult};

/// Who placed the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderOrigin {
    #[default]
    Admin,
    Client,
}

impl OrderOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOrigin::Admin => "admin",
            OrderOrigin::Client => "client",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(OrderOrigin::Admin),
            "client" => Some(OrderOrigin::Client),
            _ => None,
        }
    }

    /// Status a new order starts in
    pub fn initial_status(&self) -> &'static str {
        match self {
            OrderOrigin::Admin => "pending",
            OrderOrigin::Client => "client_pending",
        }
    }
}

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_code: String,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
}

impl From<&MixComponent> for OrderItem {
    fn from(component: &MixComponent) -> Self {
        Self {
            product_code: component.product_code.clone(),
            product_name: component.display_name.clone(),
            quantity: component.quantity,
            unit_price: component.unit_price(),
            line_total: component.line_total,
        }
    }
}

/// An order with its items and nutrition snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub mix_name: String,
    pub origin: OrderOrigin,
    pub customer_name: Option<String>,
    pub observations: Option<String>,
    pub status: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub nutrition: NutrientAggregate,
    pub created_at: String,
}

/// Data for creating an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub mix_name: String,
    pub origin: OrderOrigin,
    pub customer_name: Option<String>,
    pub observations: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub nutrition: NutrientAggregate,
}

/// Order without items, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub mix_name: String,
    pub origin: OrderOrigin,
    pub customer_name: Option<String>,
    pub status: String,
    pub total_amount: f64,
    pub created_at: String,
}

struct OrderRow {
    id: i64,
    mix_name: String,
    origin: String,
    customer_name: Option<String>,
    observations: Option<String>,
    status: String,
    total_amount: f64,
    nutrition_json: String,
    created_at: String,
}

impl OrderRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            mix_name: row.get("mix_name")?,
            origin: row.get("origin")?,
            customer_name: row.get("customer_name")?,
            observations: row.get("observations")?,
            status: row.get("status")?,
            total_amount: row.get("total_amount")?,
            nutrition_json: row.get("nutrition_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn item_from_row(row: &Row) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        product_code: row.get("product_code")?,
        product_name: row.get("product_name")?,
        quantity: row.get("quantity")?,
        unit_price: row.get("unit_price")?,
        line_total: row.get("line_total")?,
    })
}

impl Order {
    /// Insert an order and its items in one transaction
    pub fn create(conn: &mut Connection, data: &OrderCreate) -> DbResult<Self> {
        let nutrition_json = serde_json::to_string(&data.nutrition)?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO orders (
                mix_name, origin, customer_name, observations, status, total_amount, nutrition_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.mix_name,
                data.origin.as_str(),
                data.customer_name,
                data.observations,
                data.origin.initial_status(),
                data.total_amount,
                nutrition_json,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for (position, item) in data.items.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO order_items (
                    order_id, position, product_code, product_name, quantity, unit_price, line_total
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    id,
                    position as i64,
                    item.product_code,
                    item.product_name,
                    item.quantity,
                    item.unit_price,
                    item.line_total,
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            "Created {} order #{} for mix '{}' ({} items)",
            data.origin.as_str(),
            id,
            data.mix_name,
            data.items.len()
        );

        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get an order with its items
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let row = conn
            .query_row("SELECT * FROM orders WHERE id = ?1", [id], OrderRow::from_row)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT * FROM order_items WHERE order_id = ?1 ORDER BY position")?;
        let items = stmt
            .query_map([id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            id: row.id,
            mix_name: row.mix_name,
            origin: OrderOrigin::from_str(&row.origin).unwrap_or_default(),
            customer_name: row.customer_name,
            observations: row.observations,
            status: row.status,
            items,
            total_amount: row.total_amount,
            nutrition: serde_json::from_str(&row.nutrition_json)?,
            created_at: row.created_at,
        }))
    }

    /// List orders, newest first
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<OrderSummary>> {
        let mut stmt = conn.prepare("SELECT * FROM orders ORDER BY id DESC LIMIT ?1 OFFSET ?2")?;

        let orders = stmt
            .query_map(params![limit, offset], |row| {
                let row = OrderRow::from_row(row)?;
                Ok(OrderSummary {
                    id: row.id,
                    mix_name: row.mix_name,
                    origin: OrderOrigin::from_str(&row.origin).unwrap_or_default(),
                    customer_name: row.customer_name,
                    status: row.status,
                    total_amount: row.total_amount,
                    created_at: row.created_at,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(orders)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count)
    }
}
