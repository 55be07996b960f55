//! Utility to load the sample catalog into the database

use kairosmix::config::Config;
use kairosmix::models::{seed_sample_catalog, Product};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    println!("Database path: {}", config.database_path.display());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = kairosmix::db::Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        kairosmix::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    database.with_conn(|conn| {
        let inserted = seed_sample_catalog(conn)?;
        println!("Inserted {} sample products", inserted);
        for product in Product::list(conn)? {
            println!(
                "  {}  {:<22} ${:>6.2}/lb  {:>5} lb",
                product.code, product.name, product.retail_price, product.stock
            );
        }
        Ok(())
    })?;

    Ok(())
}
