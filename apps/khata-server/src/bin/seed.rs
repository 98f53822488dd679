//! # Demo Seed
//!
//! Loads the demo shop (five products, two customers, two bills) into a
//! database whose catalog is empty.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by the usual config sources
//! cargo run -p khata-server --bin seed
//!
//! # Specify database path
//! cargo run -p khata-server --bin seed -- --db ./data/khata.db
//! ```

use std::env;
use std::path::PathBuf;

use khata_billing::BillingEngine;
use khata_db::{Database, DbConfig};
use khata_server::seed::{seed_demo, SeedOutcome};
use khata_server::{init_tracing, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Khata Demo Seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from khata.toml / KHATA_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => ServerConfig::load(None)?.db_config(),
    };

    println!("Database: {}", config.database_path.display());
    let db = Database::new(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let engine = BillingEngine::new(db);
    match seed_demo(&engine).await? {
        SeedOutcome::Seeded { products, customers, bills } => {
            println!("✓ Seeded {} products, {} customers, {} bills", products, customers, bills);
        }
        SeedOutcome::Skipped { existing } => {
            println!("⚠ Database already has {} products", existing);
            println!("  Skipping seed to avoid duplicates.");
        }
    }

    engine.store().close().await;
    Ok(())
}
