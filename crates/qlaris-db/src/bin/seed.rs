//! # Seed Data Generator
//!
//! Populates the database with a demo business for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default demo business
//! cargo run -p qlaris-db --bin seed
//!
//! # Specify database path and business id
//! cargo run -p qlaris-db --bin seed -- --db ./data/qlaris.db --business cafe-1
//! ```
//!
//! ## Generated Data
//! One category per menu section, created in display order, each with a
//! handful of products:
//! - Coffee and Tea track stock (a few items start sold out)
//! - Bakery and Snacks track stock
//! - Services don't track stock
//!
//! Prices are deterministic so demo checkouts produce the same totals on
//! every machine.

use chrono::Utc;
use qlaris_core::Product;
use qlaris_db::repository::product::generate_product_id;
use qlaris_db::{Database, DbConfig};
use std::env;

/// Menu sections: (category name, tracks stock, products)
const MENU: &[(&str, bool, &[&str])] = &[
    (
        "Coffee",
        true,
        &["Espresso", "Americano", "Cappuccino", "Latte", "Flat White", "Mocha"],
    ),
    ("Tea", true, &["Green Tea", "Black Tea", "Chai Latte", "Matcha Latte"]),
    (
        "Bakery",
        true,
        &["Croissant", "Pain au Chocolat", "Banana Bread", "Blueberry Muffin"],
    ),
    ("Snacks", true, &["Granola Bar", "Potato Chips", "Trail Mix"]),
    ("Services", false, &["Gift Wrapping", "Delivery Fee"]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./qlaris_dev.db");
    let mut business_id = String::from("demo-business");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--business" | "-b" => {
                if i + 1 < args.len() {
                    business_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Qlaris Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./qlaris_dev.db)");
                println!("  -b, --business <ID>    Business id to seed (default: demo-business)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Qlaris Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Business: {}", business_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count_by_business(&business_id).await?;
    if existing > 0 {
        println!("⚠ Business already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    for (section_idx, (section, enable_stock, names)) in MENU.iter().enumerate() {
        let category = db.categories().create(&business_id, section, Utc::now()).await?;

        for (product_idx, name) in names.iter().enumerate() {
            let product = generate_product(
                &business_id,
                &category.id,
                name,
                *enable_stock,
                section_idx * 10 + product_idx,
            );

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.name, e);
                continue;
            }
            generated += 1;
        }

        println!("  {} (sort_order {}): {} products", category.name, category.sort_order, names.len());
    }

    println!();
    println!("✓ Generated {} products", generated);
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one product with deterministic price and stock.
fn generate_product(
    business_id: &str,
    category_id: &str,
    name: &str,
    enable_stock: bool,
    seed: usize,
) -> Product {
    let now = Utc::now();

    // $2.50 - $7.25 in quarter steps
    let price_cents = 250 + ((seed * 7) % 20) as i64 * 25;
    let cost_cents = Some(price_cents * 40 / 100);

    // Every fifth stocked product starts sold out
    let stock_qty = enable_stock.then(|| if seed % 5 == 4 { 0 } else { 10 + (seed % 4) as i64 * 10 });

    Product {
        id: generate_product_id(),
        business_id: business_id.to_string(),
        name: name.to_string(),
        price_cents,
        cost_cents,
        enable_stock,
        stock_qty,
        is_active: true,
        category_id: Some(category_id.to_string()),
        created_at: now,
        updated_at: now,
    }
}
