//! Order MCP Tools
//!
//! Tools for placing and reviewing orders.

use serde::Serialize;

use super::mixes::load_catalog;
use crate::db::Database;
use crate::models::{
    validate_quantity, Catalog, MixDraft, MixError, MixTotals, Order, OrderCreate, OrderItem,
    OrderOrigin, OrderSummary, SavedMix,
};
use crate::nutrition::{timestamp_now, SharedNutrientTable};

/// What to order and for whom
#[derive(Debug, Clone, Default)]
pub struct OrderRequest {
    /// Order a saved mix instead of the draft
    pub saved_mix_id: Option<i64>,
    /// Used when the mix itself has no name
    pub mix_name: Option<String>,
    pub origin: OrderOrigin,
    pub customer_name: Option<String>,
    pub observations: Option<String>,
}

/// Response for list_orders
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Origin named by a tool caller; absent means admin
pub fn parse_origin(origin: Option<&str>) -> Result<OrderOrigin, String> {
    match origin {
        None => Ok(OrderOrigin::default()),
        Some(value) => OrderOrigin::from_str(value)
            .ok_or_else(|| format!("Unknown order origin '{}': use 'admin' or 'client'", value)),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Price and nutrition of a mix as of now, after checking stock
fn fresh_totals(draft: &MixDraft, table: &SharedNutrientTable, catalog: &Catalog) -> Result<MixTotals, String> {
    if draft.is_empty() {
        return Err(MixError::EmptyMix.to_string());
    }
    for component in &draft.components {
        validate_quantity(component.quantity, &component.product_code, catalog)
            .map_err(|e| e.to_string())?;
    }
    Ok(draft.totals(&*table.read(), catalog))
}

/// Place an order for the draft or a saved mix
///
/// Ordering the draft clears it. The order stores the price and nutrition
/// computed now, not the ones saved with the mix.
pub fn create_order(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    request: OrderRequest,
) -> Result<Order, String> {
    let customer_name = non_empty(request.customer_name);
    if request.origin == OrderOrigin::Client && customer_name.is_none() {
        return Err("Client orders need a customer name".to_string());
    }

    let catalog = load_catalog(db)?;

    let totals = match request.saved_mix_id {
        Some(id) => {
            let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
            let saved = SavedMix::get_by_id(&conn, id)
                .map_err(|e| format!("Failed to get saved mix: {}", e))?
                .ok_or_else(|| format!("Saved mix not found with id: {}", id))?;
            drop(conn);

            let mut mix = MixDraft::new(draft.policy());
            mix.load(&saved.name, saved.components);
            fresh_totals(&mix, table, &catalog)?
        }
        None => fresh_totals(draft, table, &catalog)?,
    };

    let mix_name = if totals.name.is_empty() {
        non_empty(request.mix_name).unwrap_or_else(|| format!("Custom mix {}", timestamp_now()))
    } else {
        totals.name.clone()
    };

    let data = OrderCreate {
        mix_name,
        origin: request.origin,
        customer_name,
        observations: non_empty(request.observations),
        items: totals.components.iter().map(OrderItem::from).collect(),
        total_amount: totals.total_price,
        nutrition: totals.nutrition().clone(),
    };

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let order = Order::create(&mut conn, &data).map_err(|e| format!("Failed to create order: {}", e))?;

    if request.saved_mix_id.is_none() {
        draft.clear();
    }
    Ok(order)
}

/// Get an order with its items
pub fn get_order(db: &Database, id: i64) -> Result<Option<Order>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Order::get_by_id(&conn, id).map_err(|e| format!("Failed to get order: {}", e))
}

/// List orders, newest first
pub fn list_orders(db: &Database, limit: i64, offset: i64) -> Result<ListOrdersResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let orders = Order::list(&conn, limit, offset).map_err(|e| format!("Failed to list orders: {}", e))?;
    let total = Order::count(&conn).map_err(|e| format!("Failed to count orders: {}", e))?;

    Ok(ListOrdersResponse {
        orders,
        total,
        limit,
        offset,
    })
}
