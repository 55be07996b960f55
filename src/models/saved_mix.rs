//! Saved Mix model
//!
//! Named mixes persisted with the price and nutrition computed at save time.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{MixComponent, NutrientAggregate};
use crate::db::{DbError, DbResult};

/// A saved mix with its snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedMix {
    pub id: i64,
    pub name: String,
    pub components: Vec<MixComponent>,
    pub total_price: f64,
    pub nutrition: NutrientAggregate,
    pub created_at: String,
}

/// Data for saving a mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedMixCreate {
    pub name: String,
    pub components: Vec<MixComponent>,
    pub total_price: f64,
    pub nutrition: NutrientAggregate,
}

/// Saved mix without its lines, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedMixSummary {
    pub id: i64,
    pub name: String,
    pub total_price: f64,
    pub calories: f64,
    pub total_weight: f64,
    pub component_count: i64,
    pub created_at: String,
}

struct SavedMixRow {
    id: i64,
    name: String,
    total_price: f64,
    nutrition_json: String,
    created_at: String,
}

impl SavedMixRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            total_price: row.get("total_price")?,
            nutrition_json: row.get("nutrition_json")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn component_from_row(row: &Row) -> rusqlite::Result<MixComponent> {
    Ok(MixComponent {
        product_code: row.get("product_code")?,
        quantity: row.get("quantity")?,
        display_name: row.get("display_name")?,
        line_total: row.get("line_total")?,
    })
}

impl SavedMix {
    /// Save a mix; names are unique ignoring case
    pub fn create(conn: &mut Connection, data: &SavedMixCreate) -> DbResult<Self> {
        if Self::name_exists(conn, &data.name)? {
            return Err(DbError::DuplicateName(data.name.clone()));
        }

        let nutrition_json = serde_json::to_string(&data.nutrition)?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO saved_mixes (name, total_price, nutrition_json) VALUES (?1, ?2, ?3)",
            params![data.name, data.total_price, nutrition_json],
        )?;
        let id = tx.last_insert_rowid();

        for (position, component) in data.components.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO saved_mix_components (
                    mix_id, position, product_code, display_name, quantity, line_total
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    id,
                    position as i64,
                    component.product_code,
                    component.display_name,
                    component.quantity,
                    component.line_total,
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!("Saved mix '{}' with {} components", data.name, data.components.len());

        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a saved mix with its components
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let row = conn
            .query_row(
                "SELECT * FROM saved_mixes WHERE id = ?1",
                [id],
                SavedMixRow::from_row,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT * FROM saved_mix_components WHERE mix_id = ?1 ORDER BY position",
        )?;
        let components = stmt
            .query_map([id], component_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            id: row.id,
            name: row.name,
            components,
            total_price: row.total_price,
            nutrition: serde_json::from_str(&row.nutrition_json)?,
            created_at: row.created_at,
        }))
    }

    /// List saved mixes, newest first
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<SavedMixSummary>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.*, (SELECT COUNT(*) FROM saved_mix_components c WHERE c.mix_id = m.id) AS component_count
            FROM saved_mixes m
            ORDER BY m.id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit, offset], |row| {
                Ok((SavedMixRow::from_row(row)?, row.get::<_, i64>("component_count")?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(row, component_count)| -> DbResult<SavedMixSummary> {
                let nutrition: NutrientAggregate = serde_json::from_str(&row.nutrition_json)?;
                Ok(SavedMixSummary {
                    id: row.id,
                    name: row.name,
                    total_price: row.total_price,
                    calories: nutrition.calories,
                    total_weight: nutrition.total_weight,
                    component_count,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    /// Whether a mix with this name exists, ignoring case
    pub fn name_exists(conn: &Connection, name: &str) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM saved_mixes WHERE name = ?1 COLLATE NOCASE",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM saved_mixes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a saved mix; Ok(false) if not found
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM saved_mixes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
