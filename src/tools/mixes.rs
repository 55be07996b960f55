//! Mix MCP Tools
//!
//! Tools for editing the mix draft and managing saved mixes.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{
    Catalog, MixComponent, MixDraft, MixError, SavedMix, SavedMixCreate, SavedMixSummary,
};
use crate::nutrition::{component_shares, ComponentShare, NutritionSummary, SharedNutrientTable};

/// The draft with its current price and nutrition
#[derive(Debug, Serialize)]
pub struct MixView {
    pub name: String,
    pub components: Vec<MixComponent>,
    pub total_price: f64,
    pub shares: Vec<ComponentShare>,
    #[serde(flatten)]
    pub summary: NutritionSummary,
}

/// Response for list_saved_mixes
#[derive(Debug, Serialize)]
pub struct ListSavedMixesResponse {
    pub mixes: Vec<SavedMixSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for delete_saved_mix
#[derive(Debug, Serialize)]
pub struct DeleteSavedMixResponse {
    pub success: bool,
    pub id: i64,
}

pub(crate) fn load_catalog(db: &Database) -> Result<Catalog, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Catalog::load(&conn).map_err(|e| format!("Failed to load catalog: {}", e))
}

/// Refresh names and line totals from the current catalog
fn reprice(components: &mut [MixComponent], catalog: &Catalog) {
    for component in components {
        component.reprice(catalog);
    }
}

fn view(draft: &MixDraft, table: &SharedNutrientTable, catalog: &Catalog) -> MixView {
    let totals = draft.totals(&*table.read(), catalog);
    MixView {
        name: totals.name,
        shares: component_shares(&totals.components),
        components: totals.components,
        total_price: totals.total_price,
        summary: totals.summary,
    }
}

fn mix_error(e: MixError) -> String {
    e.to_string()
}

/// Show the current draft
pub fn get_mix(db: &Database, table: &SharedNutrientTable, draft: &MixDraft) -> Result<MixView, String> {
    let catalog = load_catalog(db)?;
    Ok(view(draft, table, &catalog))
}

/// Name the draft
pub fn set_mix_name(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    name: &str,
) -> Result<MixView, String> {
    draft.set_name(name).map_err(mix_error)?;
    get_mix(db, table, draft)
}

/// Add a product line to the draft
pub fn add_mix_component(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    product_code: &str,
    quantity: f64,
) -> Result<MixView, String> {
    let catalog = load_catalog(db)?;
    draft
        .add_component(product_code.trim(), quantity, &catalog)
        .map_err(mix_error)?;
    tracing::debug!("Draft now has {} components", draft.components.len());
    Ok(view(draft, table, &catalog))
}

/// Change the quantity of a line in the draft
pub fn update_mix_component(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    product_code: &str,
    quantity: f64,
) -> Result<MixView, String> {
    let catalog = load_catalog(db)?;
    draft
        .update_quantity(product_code.trim(), quantity, &catalog)
        .map_err(mix_error)?;
    Ok(view(draft, table, &catalog))
}

/// Remove a line from the draft
pub fn remove_mix_component(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    product_code: &str,
) -> Result<MixView, String> {
    draft
        .remove_component(product_code.trim())
        .map_err(mix_error)?;
    get_mix(db, table, draft)
}

/// Start over with an empty draft
pub fn clear_mix(db: &Database, table: &SharedNutrientTable, draft: &mut MixDraft) -> Result<MixView, String> {
    draft.clear();
    get_mix(db, table, draft)
}

/// Save the draft under its name, with a price and nutrition snapshot
pub fn save_mix(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    name: Option<&str>,
) -> Result<SavedMix, String> {
    if draft.is_empty() {
        return Err(MixError::EmptyMix.to_string());
    }
    if let Some(name) = name {
        draft.set_name(name).map_err(mix_error)?;
    }
    if draft.name.is_empty() {
        return Err("Give the mix a name before saving it".to_string());
    }

    let catalog = load_catalog(db)?;
    let totals = draft.totals(&*table.read(), &catalog);
    let data = SavedMixCreate {
        name: totals.name.clone(),
        nutrition: totals.nutrition().clone(),
        components: totals.components,
        total_price: totals.total_price,
    };

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    SavedMix::create(&mut conn, &data).map_err(|e| match e {
        DbError::DuplicateName(name) => format!("A mix named '{}' already exists", name),
        e => format!("Failed to save mix: {}", e),
    })
}

/// List saved mixes, newest first
pub fn list_saved_mixes(db: &Database, limit: i64, offset: i64) -> Result<ListSavedMixesResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let mixes = SavedMix::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list saved mixes: {}", e))?;
    let total = SavedMix::count(&conn).map_err(|e| format!("Failed to count saved mixes: {}", e))?;

    Ok(ListSavedMixesResponse {
        mixes,
        total,
        limit,
        offset,
    })
}

/// Get a saved mix with its snapshot
pub fn get_saved_mix(db: &Database, id: i64) -> Result<Option<SavedMix>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    SavedMix::get_by_id(&conn, id).map_err(|e| format!("Failed to get saved mix: {}", e))
}

/// Delete a saved mix; orders made from it are kept
pub fn delete_saved_mix(db: &Database, id: i64) -> Result<DeleteSavedMixResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = SavedMix::delete(&conn, id).map_err(|e| format!("Failed to delete saved mix: {}", e))?;
    if !deleted {
        return Err(format!("Saved mix not found with id: {}", id));
    }
    tracing::info!("Deleted saved mix #{}", id);
    Ok(DeleteSavedMixResponse { success: true, id })
}

/// Copy a saved mix into the draft, repriced at current catalog prices
pub fn load_saved_mix(
    db: &Database,
    table: &SharedNutrientTable,
    draft: &mut MixDraft,
    id: i64,
) -> Result<MixView, String> {
    let saved = get_saved_mix(db, id)?.ok_or_else(|| format!("Saved mix not found with id: {}", id))?;
    let catalog = load_catalog(db)?;

    let mut components = saved.components;
    reprice(&mut components, &catalog);
    draft.load(&saved.name, components);
    tracing::info!("Loaded saved mix '{}' into the draft", saved.name);

    Ok(view(draft, table, &catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{seed_sample_catalog, DuplicatePolicy, Product, ProductUpdate};
    use crate::nutrition::NutrientTable;

    fn setup() -> (Database, SharedNutrientTable, MixDraft) {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            run_migrations(conn)?;
            seed_sample_catalog(conn)?;
            Ok(())
        })
        .unwrap();
        (
            db,
            SharedNutrientTable::new(NutrientTable::builtin()),
            MixDraft::new(DuplicatePolicy::Reject),
        )
    }

    #[test]
    fn test_edit_draft() {
        let (db, table, mut draft) = setup();
        add_mix_component(&db, &table, &mut draft, "A01", 1.0).unwrap();
        let view = add_mix_component(&db, &table, &mut draft, "P01", 1.0).unwrap();
        assert_eq!(view.summary.total.calories, 878.0);
        assert!((view.total_price - 28.98).abs() < 1e-9);

        let err = add_mix_component(&db, &table, &mut draft, "A01", 1.0).unwrap_err();
        assert!(err.contains("already in the mix"));
        let err = add_mix_component(&db, &table, &mut draft, "N01", 31.0).unwrap_err();
        assert!(err.contains("30"));

        let view = update_mix_component(&db, &table, &mut draft, "P01", 2.0).unwrap();
        assert_eq!(view.summary.total.total_weight, 3.0);

        let view = remove_mix_component(&db, &table, &mut draft, "A01").unwrap();
        assert_eq!(view.components.len(), 1);

        let view = clear_mix(&db, &table, &mut draft).unwrap();
        assert!(view.components.is_empty());
        assert_eq!(view.total_price, 0.0);
    }

    #[test]
    fn test_save_requires_components_and_name() {
        let (db, table, mut draft) = setup();
        assert!(save_mix(&db, &table, &mut draft, Some("Energia")).is_err());

        add_mix_component(&db, &table, &mut draft, "A01", 1.0).unwrap();
        assert!(save_mix(&db, &table, &mut draft, None).is_err());
        assert!(save_mix(&db, &table, &mut draft, Some("x")).is_err());

        let saved = save_mix(&db, &table, &mut draft, Some("Energia")).unwrap();
        assert_eq!(saved.nutrition.calories, 579.0);
        assert_eq!(saved.components[0].display_name, "Almendras Premium");

        let err = save_mix(&db, &table, &mut draft, Some("ENERGIA")).unwrap_err();
        assert!(err.contains("already exists"));
        assert_eq!(list_saved_mixes(&db, 10, 0).unwrap().total, 1);
    }

    #[test]
    fn test_snapshot_survives_table_change() {
        let (db, table, mut draft) = setup();
        add_mix_component(&db, &table, &mut draft, "A01", 1.0).unwrap();
        let saved = save_mix(&db, &table, &mut draft, Some("Energia")).unwrap();

        table
            .update(
                "A01",
                &crate::models::NutrientProfileUpdate {
                    calories: Some(600.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let loaded = get_saved_mix(&db, saved.id).unwrap().unwrap();
        assert_eq!(loaded.nutrition.calories, 579.0);
        assert_eq!(get_mix(&db, &table, &draft).unwrap().summary.total.calories, 600.0);
    }

    #[test]
    fn test_load_saved_mix_reprices() {
        let (db, table, mut draft) = setup();
        add_mix_component(&db, &table, &mut draft, "A01", 2.0).unwrap();
        let saved = save_mix(&db, &table, &mut draft, Some("Energia")).unwrap();
        draft.clear();

        db.with_conn(|conn| {
            Product::update(
                conn,
                "A01",
                &ProductUpdate {
                    retail_price: Some(20.0),
                    ..Default::default()
                },
            )
        })
        .unwrap();

        let view = load_saved_mix(&db, &table, &mut draft, saved.id).unwrap();
        assert_eq!(view.name, "Energia");
        assert_eq!(view.components[0].line_total, 40.0);
        assert_eq!(view.total_price, 40.0);

        assert!(load_saved_mix(&db, &table, &mut draft, saved.id + 1).is_err());
        assert!(delete_saved_mix(&db, saved.id).unwrap().success);
        assert!(get_saved_mix(&db, saved.id).unwrap().is_none());
    }
}
