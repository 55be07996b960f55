//! KairosMix
//!
//! An MCP server for designing, pricing and ordering custom mixes.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use kairosmix::build_info;
use kairosmix::config::Config;
use kairosmix::db;
use kairosmix::mcp::KairosService;
use kairosmix::models::{seed_sample_catalog, Product};
use kairosmix::nutrition::{NutrientTable, SharedNutrientTable};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr; stdout carries the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kairosmix=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = Config::from_env()?;
    eprintln!("Database path: {}", config.database_path.display());
    eprintln!("Duplicate products: {}", config.duplicate_policy.as_str());

    // Ensure data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = db::Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);

        if Product::count(conn)? == 0 {
            let inserted = seed_sample_catalog(conn)?;
            eprintln!("Empty catalog, added {} sample products", inserted);
        }
        Ok(())
    })?;

    let table = SharedNutrientTable::new(NutrientTable::builtin());
    tracing::info!("Nutrient table loaded with {} products", table.read().len());

    let service = KairosService::new(
        config.database_path,
        database,
        table,
        config.duplicate_policy,
    );

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
