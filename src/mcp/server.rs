//! KairosMix MCP Server Implementation
//!
//! Implements the MCP server with all KairosMix tools.

use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{
    DuplicatePolicy, MixDraft, NutrientProfile, NutrientProfileUpdate, ProductCreate, ProductUpdate,
};
use crate::nutrition::SharedNutrientTable;
use crate::tools::orders::OrderRequest;
use crate::tools::status::StatusTracker;
use crate::tools::{catalog, mixes, nutrition, orders};

/// KairosMix MCP Service
#[derive(Clone)]
pub struct KairosService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    table: SharedNutrientTable,
    /// The mix being designed in this session
    draft: Arc<std::sync::Mutex<MixDraft>>,
    tool_router: ToolRouter<KairosService>,
}

impl KairosService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        table: SharedNutrientTable,
        policy: DuplicatePolicy,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            table,
            draft: Arc::new(std::sync::Mutex::new(MixDraft::new(policy))),
            tool_router: Self::tool_router(),
        }
    }

    fn draft(&self) -> MutexGuard<'_, MixDraft> {
        // A panic mid-edit leaves a valid draft; keep using it
        self.draft.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found_body(kind: &str, key: impl Serialize) -> serde_json::Value {
    serde_json::json!({ "error": format!("{} not found", kind), "key": key })
}

fn not_found(kind: &str, key: impl Serialize) -> Result<CallToolResult, McpError> {
    json_result(&not_found_body(kind, key))
}

// ============================================================================
// Nutrition Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProductCodeParams {
    /// Product code, e.g. "A01"
    pub code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddProductNutritionParams {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Values per pound of product
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub vitamins: Vec<String>,
    #[serde(default)]
    pub minerals: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductNutritionParams {
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub fiber: Option<f64>,
    /// Replaces the whole vitamin list
    pub vitamins: Option<Vec<String>>,
    /// Replaces the whole mineral list
    pub minerals: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ComponentParams {
    pub product_code: String,
    /// Pounds of product
    pub quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeMixParams {
    pub components: Vec<ComponentParams>,
}

// ============================================================================
// Catalog Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddProductParams {
    pub code: String,
    pub name: String,
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub price_per_pound: f64,
    #[serde(default)]
    pub wholesale_price: f64,
    /// Price per pound charged in mixes
    pub retail_price: f64,
    /// Pounds available
    #[serde(default)]
    pub stock: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchProductsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductParams {
    pub code: String,
    pub name: Option<String>,
    pub country_of_origin: Option<String>,
    pub price_per_pound: Option<f64>,
    pub wholesale_price: Option<f64>,
    pub retail_price: Option<f64>,
    pub stock: Option<f64>,
}

// ============================================================================
// Mix Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetMixNameParams {
    /// 3 to 25 letters, digits, spaces or underscores
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveMixComponentParams {
    pub product_code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveMixParams {
    /// Name to save under (default: the draft's name)
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

// ============================================================================
// Order Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateOrderParams {
    /// Order this saved mix instead of the current draft
    pub saved_mix_id: Option<i64>,
    /// Name for an unnamed mix (default: "Custom mix <timestamp>")
    pub mix_name: Option<String>,
    /// "admin" (default) or "client"
    pub origin: Option<String>,
    /// Required for client orders
    pub customer_name: Option<String>,
    pub observations: Option<String>,
}

#[tool_router]
impl KairosService {
    // --- Status ---

    #[tool(description = "Get the current status of the KairosMix service including build info, database counts, and process information")]
    async fn kairos_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let policy = self.draft().policy();
        let status = tracker.get_status(&self.database, &self.table.read(), policy);
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for designing, saving and ordering a mix. Call this when starting a new session or when unsure how to use the mix tools.")]
    fn mix_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::MIX_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(MIX_INSTRUCTIONS)]))
    }

    // --- Nutrient Table ---

    #[tool(description = "List products that have nutrition data, in table order")]
    fn list_nutrition_products(&self) -> Result<CallToolResult, McpError> {
        json_result(&nutrition::list_nutrition_products(&self.table))
    }

    #[tool(description = "Get the per-pound nutrition data of a product")]
    fn get_product_nutrition(&self, Parameters(p): Parameters<ProductCodeParams>) -> Result<CallToolResult, McpError> {
        match nutrition::get_product_nutrition(&self.table, &p.code) {
            Some(detail) => json_result(&detail),
            None => not_found("Nutrition data", &p.code),
        }
    }

    #[tool(description = "Add per-pound nutrition data for a product code. Fails if the code already has data.")]
    fn add_product_nutrition(&self, Parameters(p): Parameters<AddProductNutritionParams>) -> Result<CallToolResult, McpError> {
        let profile = NutrientProfile {
            name: p.name, description: p.description.unwrap_or_default(),
            calories: p.calories, protein: p.protein, fat: p.fat, carbs: p.carbs, fiber: p.fiber,
            vitamins: p.vitamins, minerals: p.minerals,
        };
        let result = nutrition::add_product_nutrition(&self.table, &p.code, profile)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update some fields of a product's nutrition data. Saved mixes and orders keep their snapshots.")]
    fn update_product_nutrition(&self, Parameters(p): Parameters<UpdateProductNutritionParams>) -> Result<CallToolResult, McpError> {
        let update = NutrientProfileUpdate {
            name: p.name, description: p.description,
            calories: p.calories, protein: p.protein, fat: p.fat, carbs: p.carbs, fiber: p.fiber,
            vitamins: p.vitamins, minerals: p.minerals,
        };
        let result = nutrition::update_product_nutrition(&self.table, &p.code, update)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Price and analyze a list of components without touching the current mix")]
    fn analyze_mix(&self, Parameters(p): Parameters<AnalyzeMixParams>) -> Result<CallToolResult, McpError> {
        let components = p.components.into_iter().map(|c| (c.product_code, c.quantity)).collect();
        let result = nutrition::analyze_mix(&self.database, &self.table, components)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Catalog ---

    #[tool(description = "Add a product to the catalog")]
    fn add_product(&self, Parameters(p): Parameters<AddProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductCreate {
            code: p.code, name: p.name, country_of_origin: p.country_of_origin,
            price_per_pound: p.price_per_pound, wholesale_price: p.wholesale_price,
            retail_price: p.retail_price, stock: p.stock,
        };
        let result = catalog::add_product(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a catalog product by code")]
    fn get_product(&self, Parameters(p): Parameters<ProductCodeParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::get_product(&self.database, &p.code).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(product) => json_result(&product),
            None => not_found("Product", &p.code),
        }
    }

    #[tool(description = "List the whole catalog with prices and stock")]
    fn list_products(&self) -> Result<CallToolResult, McpError> {
        let result = catalog::list_products(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Search catalog products by code or name")]
    fn search_products(&self, Parameters(p): Parameters<SearchProductsParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::search_products(&self.database, &p.query, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a catalog product's name, prices or stock")]
    fn update_product(&self, Parameters(p): Parameters<UpdateProductParams>) -> Result<CallToolResult, McpError> {
        let data = ProductUpdate {
            name: p.name, country_of_origin: p.country_of_origin,
            price_per_pound: p.price_per_pound, wholesale_price: p.wholesale_price,
            retail_price: p.retail_price, stock: p.stock,
        };
        let result = catalog::update_product(&self.database, &p.code, data)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a catalog product. Saved mixes and orders keep their copies.")]
    fn delete_product(&self, Parameters(p): Parameters<ProductCodeParams>) -> Result<CallToolResult, McpError> {
        let result = catalog::delete_product(&self.database, &p.code).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Insert the sample catalog. Existing products are left untouched.")]
    fn seed_catalog(&self) -> Result<CallToolResult, McpError> {
        let result = catalog::seed_catalog(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Mix Draft ---

    #[tool(description = "Show the current mix with price, nutrition totals, per-pound averages and recommendations")]
    fn get_mix(&self) -> Result<CallToolResult, McpError> {
        let draft = self.draft();
        let result = mixes::get_mix(&self.database, &self.table, &draft).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Name the current mix")]
    fn set_mix_name(&self, Parameters(p): Parameters<SetMixNameParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::set_mix_name(&self.database, &self.table, &mut draft, &p.name)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Add a product to the current mix. Quantity is in pounds and must not exceed stock.")]
    fn add_mix_component(&self, Parameters(p): Parameters<ComponentParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::add_mix_component(&self.database, &self.table, &mut draft, &p.product_code, p.quantity)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Change the quantity of a product already in the current mix")]
    fn update_mix_component(&self, Parameters(p): Parameters<ComponentParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::update_mix_component(&self.database, &self.table, &mut draft, &p.product_code, p.quantity)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove a product from the current mix")]
    fn remove_mix_component(&self, Parameters(p): Parameters<RemoveMixComponentParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::remove_mix_component(&self.database, &self.table, &mut draft, &p.product_code)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Empty the current mix")]
    fn clear_mix(&self) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::clear_mix(&self.database, &self.table, &mut draft).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Saved Mixes ---

    #[tool(description = "Save the current mix with a snapshot of its price and nutrition. Names are unique ignoring case.")]
    fn save_mix(&self, Parameters(p): Parameters<SaveMixParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::save_mix(&self.database, &self.table, &mut draft, p.name.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List saved mixes, newest first")]
    fn list_saved_mixes(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = mixes::list_saved_mixes(&self.database, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a saved mix with its components and nutrition snapshot")]
    fn get_saved_mix(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = mixes::get_saved_mix(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(mix) => json_result(&mix),
            None => not_found("Saved mix", p.id),
        }
    }

    #[tool(description = "Delete a saved mix")]
    fn delete_saved_mix(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = mixes::delete_saved_mix(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Replace the current mix with a copy of a saved mix, repriced at current catalog prices")]
    fn load_saved_mix(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let mut draft = self.draft();
        let result = mixes::load_saved_mix(&self.database, &self.table, &mut draft, p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Orders ---

    #[tool(description = "Order the current mix (which is then cleared) or a saved mix. Stock is checked and prices and nutrition are computed at order time.")]
    fn create_order(&self, Parameters(p): Parameters<CreateOrderParams>) -> Result<CallToolResult, McpError> {
        let origin = orders::parse_origin(p.origin.as_deref()).map_err(|e| McpError::internal_error(e, None))?;
        let request = OrderRequest {
            saved_mix_id: p.saved_mix_id,
            mix_name: p.mix_name,
            origin,
            customer_name: p.customer_name,
            observations: p.observations,
        };
        let mut draft = self.draft();
        let result = orders::create_order(&self.database, &self.table, &mut draft, request)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get an order with its items and nutrition snapshot")]
    fn get_order(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = orders::get_order(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(order) => json_result(&order),
            None => not_found("Order", p.id),
        }
    }

    #[tool(description = "List orders, newest first")]
    fn list_orders(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = orders::list_orders(&self.database, p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for KairosService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "kairosmix".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("KairosMix Custom Mix Designer".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "KairosMix - Custom nut and dried-fruit mixes priced per pound with nutrition analysis. \
                 IMPORTANT: Call mix_instructions before designing a mix. \
                 Nutrition: list_nutrition_products, get/add/update_product_nutrition, analyze_mix. \
                 Catalog: add/get/update/delete_product, list_products, search_products, seed_catalog. \
                 Current mix: get_mix, set_mix_name, add/update/remove_mix_component, clear_mix. \
                 Saved mixes: save_mix, list_saved_mixes, get/delete_saved_mix, load_saved_mix. \
                 Orders: create_order (current mix or saved_mix_id), get_order, list_orders. \
                 Status: kairos_status."
                    .into(),
            ),
        }
    }
}
