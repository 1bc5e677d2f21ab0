//! # Seed Data Generator
//!
//! Populates a database with users, categories and stocked products for
//! local development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and a tax rate (basis points)
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --tax-bps 1100
//! ```
//!
//! ## Generated Data
//! - Users: `admin` (admin), `kasir1` (cashier)
//! - Categories: Minuman, Makanan Ringan, Sembako
//! - Products per category with stock 0-60 and a low-stock threshold of 5,
//!   so the low-stock listing is never empty

use std::env;

use tally_core::{Money, UserRole};
use tally_db::repository::settings::TAX_RATE_BPS;
use tally_db::{Database, DbConfig, NewProduct};

/// (category, [(product, price in cents)])
const CATALOG: &[(&str, &[(&str, i64)])] = &[
    (
        "Minuman",
        &[
            ("Teh Botol 450ml", 500),
            ("Kopi Susu Gula Aren", 1999),
            ("Air Mineral 600ml", 350),
            ("Susu UHT Coklat", 650),
            ("Jus Jeruk", 1200),
        ],
    ),
    (
        "Makanan Ringan",
        &[
            ("Chitato Sapi Panggang", 1150),
            ("Tango Wafer", 900),
            ("Roti Tawar", 1600),
            ("Kacang Garuda", 1050),
            ("Biskuit Kelapa", 750),
        ],
    ),
    (
        "Sembako",
        &[
            ("Beras 5kg", 7450),
            ("Minyak Goreng 1L", 1850),
            ("Gula Pasir 1kg", 1700),
            ("Telur 10 butir", 2800),
            ("Mie Instan", 310),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");
    let mut tax_bps: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tax-bps" | "-t" => {
                if i + 1 < args.len() {
                    tax_bps = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./tally_dev.db)");
                println!("  -t, --tax-bps <BPS>   Tax rate in basis points (default: unchanged)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    if let Some(bps) = tax_bps {
        db.settings().set(TAX_RATE_BPS, &bps).await?;
        println!("✓ Tax rate set to {} bps", bps);
    }

    let admin = db.users().insert("admin", "Administrator", UserRole::Admin).await?;
    let cashier = db
        .users()
        .insert("kasir1", "Kasir Satu", UserRole::Cashier)
        .await?;
    println!("✓ Users: admin ({}), kasir1 ({})", admin.id, cashier.id);

    let mut generated = 0usize;
    for (category_idx, (category_name, products)) in CATALOG.iter().enumerate() {
        let category = db.categories().insert(category_name, None).await?;

        for (product_idx, (name, price_cents)) in products.iter().enumerate() {
            let seed = category_idx * 10 + product_idx;
            let selling_price = Money::from_cents(*price_cents);

            let product = NewProduct {
                barcode: Some(format!("899{:010}", seed)),
                category_id: Some(category.id.clone()),
                // cost at 70% of price
                purchase_price: Money::from_cents(price_cents * 70 / 100),
                low_stock_threshold: 5,
                ..NewProduct::new(*name, selling_price, ((seed * 13) % 61) as i64)
            };

            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", name, e);
                continue;
            }
            generated += 1;
        }
    }

    println!("✓ Generated {} products", generated);

    let low = db.products().list_low_stock().await?;
    println!("  Low stock: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
