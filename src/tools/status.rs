//! KairosMix Status Tool
//!
//! Provides runtime status information about the KairosMix service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;
use crate::models::{DuplicatePolicy, Order, Product, SavedMix};
use crate::nutrition::NutrientTable;

/// Mix design instructions for AI assistants
pub const MIX_INSTRUCTIONS: &str = r#"
# KairosMix Mix Design Instructions

This guide explains how to design, price and order a custom mix.

## Overview

A mix is a list of catalog products, each with a quantity in pounds.
Nutrition values are stored per pound of product, so a line of 2 lb
contributes twice the per-pound values. Prices are the retail price per
pound from the catalog.

## Step-by-Step Workflow

### Step 1: See what can go into a mix

```
list_products()                 // catalog: price per pound and stock
list_nutrition_products()       // products with nutrition data
```

A product without nutrition data can still be added. It is priced, but
contributes nothing to the nutrition totals.

### Step 2: Build the draft

```
set_mix_name(name: "Energia Diaria")
add_mix_component(product_code: "A01", quantity: 1.5)
add_mix_component(product_code: "P01", quantity: 0.5)
```

- Names are 3 to 25 characters: letters, digits, spaces and underscores
- Quantities must be greater than 0 and no more than the product stock
- Adding a product that is already in the mix is refused by default;
  use update_mix_component to change its quantity

### Step 3: Review

```
get_mix()
```

Returns the lines, total price, nutrition totals, per-pound averages,
macro percentages and recommendations.

To try a combination without touching the draft, use analyze_mix with
an explicit component list.

### Step 4: Save or order

```
save_mix()                              // requires a name, unique ignoring case
create_order(customer_name: "Ana")      // orders the current draft, then clears it
create_order(saved_mix_id: 3)           // orders a saved mix
```

Saved mixes and orders keep the price and nutrition computed when they
were created. Later catalog or nutrition changes do not alter them.

## Notes

- Values are rounded to one decimal; total weight to two
- Per-pound averages divide by the weight of every line, including
  products without nutrition data
- Recommendations: high protein (> 25 g), high fiber (> 15 g),
  antioxidant (vitamin E), muscle health (magnesium), high calorie
  warning (> 800 kcal)
"#;

/// Runtime status of the KairosMix service
#[derive(Debug, Clone, Serialize)]
pub struct KairosStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub product_count: Option<i64>,
    pub saved_mix_count: Option<i64>,
    pub order_count: Option<i64>,

    /// Mix engine
    pub nutrition_products: usize,
    pub duplicate_policy: &'static str,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Row counts; None when the database can't be read
struct Counts {
    products: Option<i64>,
    saved_mixes: Option<i64>,
    orders: Option<i64>,
}

impl Counts {
    fn read(db: &Database) -> Self {
        match db.get_conn() {
            Ok(conn) => Self {
                products: Product::count(&conn).ok(),
                saved_mixes: SavedMix::count(&conn).ok(),
                orders: Order::count(&conn).ok(),
            },
            Err(e) => {
                tracing::warn!("Status could not read the database: {}", e);
                Self {
                    products: None,
                    saved_mixes: None,
                    orders: None,
                }
            }
        }
    }
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(
        &self,
        db: &Database,
        table: &NutrientTable,
        policy: DuplicatePolicy,
    ) -> KairosStatus {
        let build_info = BuildInfo::current();

        // In-memory databases have no file
        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());
        let counts = Counts::read(db);

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        KairosStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            product_count: counts.products,
            saved_mix_count: counts.saved_mixes,
            order_count: counts.orders,
            nutrition_products: table.len(),
            duplicate_policy: policy.as_str(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::seed_sample_catalog;

    #[test]
    fn test_status_reports_counts() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            seed_sample_catalog(conn)?;
            Ok(())
        })
        .unwrap();

        let tracker = StatusTracker::new(PathBuf::from(":memory:"));
        let status = tracker.get_status(&db, &NutrientTable::builtin(), DuplicatePolicy::Reject);

        assert_eq!(status.product_count, Some(5));
        assert_eq!(status.saved_mix_count, Some(0));
        assert_eq!(status.order_count, Some(0));
        assert_eq!(status.nutrition_products, 10);
        assert_eq!(status.duplicate_policy, "reject");
        assert!(status.database_size_bytes.is_none());
        assert_eq!(status.process_id, std::process::id());
    }
}
