//! # Seed Data Generator
//!
//! Populates a development database with a medicine catalogue, default
//! settings and an admin account.
//!
//! ## Usage
//! ```bash
//! # Seed ./novacare_dev.db with the default admin
//! cargo run -p novacare-db --bin seed
//!
//! # Specify database path and admin credentials
//! cargo run -p novacare-db --bin seed -- --db ./data/novacare.db \
//!     --admin-email owner@example.com --admin-password 'change me please'
//! ```
//!
//! ## Generated Medicines
//! Every catalogue entry gets a SKU `{CATEGORY}-{INDEX}`. A few entries are
//! deliberately low on stock or already expired so the dashboard and
//! inventory signals have something to show.

use chrono::{Duration, Utc};
use novacare_core::types::{NewMedicine, Role, Settings, TaxRate};
use novacare_db::{Database, DbConfig, DbError};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Medicine catalogue: (category code, category name, medicines).
const CATALOGUE: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "ANL",
        "Analgesic",
        &[
            ("Paracetamol 500mg", 450),
            ("Ibuprofen 200mg", 620),
            ("Aspirin 75mg", 380),
            ("Diclofenac Gel 30g", 995),
            ("Naproxen 250mg", 840),
        ],
    ),
    (
        "ABX",
        "Antibiotic",
        &[
            ("Amoxicillin 250mg", 1250),
            ("Azithromycin 500mg", 1875),
            ("Ciprofloxacin 500mg", 1430),
            ("Doxycycline 100mg", 1120),
        ],
    ),
    (
        "ALG",
        "Allergy",
        &[
            ("Cetirizine 10mg", 560),
            ("Loratadine 10mg", 610),
            ("Fexofenadine 120mg", 980),
        ],
    ),
    (
        "GI",
        "Digestive",
        &[
            ("Omeprazole 20mg", 890),
            ("Oral Rehydration Salts", 150),
            ("Loperamide 2mg", 430),
            ("Antacid Tablets", 320),
        ],
    ),
    (
        "VIT",
        "Supplements",
        &[
            ("Vitamin C 1000mg", 800),
            ("Vitamin D3 1000IU", 720),
            ("Zinc 50mg", 540),
            ("Multivitamin", 1299),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./novacare_dev.db");
    let mut admin_email = String::from("admin@novacare.local");
    let mut admin_password = String::from("novacare-admin");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if i + 1 < args.len() {
                    admin_email = args[i + 1].trim().to_lowercase();
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("NovaCare Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>             Database file path (default: ./novacare_dev.db)");
                println!("      --admin-email <EMAIL>   Admin login (default: admin@novacare.local)");
                println!("      --admin-password <PW>   Admin password (default: novacare-admin)");
                println!("  -h, --help                  Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    if admin_password.chars().count() < novacare_core::MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Admin password must be at least {} characters.",
            novacare_core::MIN_PASSWORD_LENGTH
        )
        .into());
    }

    println!("🌱 NovaCare Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database (runs migrations)
    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Settings
    if db.settings().latest().await?.is_none() {
        db.settings()
            .insert(&Settings {
                tax_rate: TaxRate::from_bps(500),
                address: "12 Market Street".to_string(),
                phone: "+1 555 0100".to_string(),
                support_email: "support@novacare.local".to_string(),
                ..Settings::default()
            })
            .await?;
        println!("✓ Default settings stored");
    } else {
        println!("⚠ Settings already present, leaving them alone");
    }

    // Admin account
    match db.auth().create_account(&admin_email, &admin_password, "Store Admin").await {
        Ok(account) => {
            db.profiles()
                .update(&account.id, "Store Admin", Role::Admin, Some(&admin_email))
                .await?;
            println!("✓ Admin account created: {}", admin_email);
        }
        Err(DbError::UniqueViolation { .. }) => {
            println!("⚠ Admin account {} already exists", admin_email);
        }
        Err(e) => return Err(e.into()),
    }

    // Medicines
    let existing = db.medicines().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping catalogue to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating medicines...");

    let today = Utc::now().date_naive();
    let mut generated = 0;

    for (category_code, category, medicines) in CATALOGUE {
        for (index, (name, price_cents)) in medicines.iter().enumerate() {
            let seed = generated + index;

            // Every 7th entry is already expired, every 5th is low on stock.
            let expiry = if seed % 7 == 3 {
                today - Duration::days(10)
            } else {
                today + Duration::days(180 + (seed as i64 * 37) % 540)
            };
            let stock = if seed % 5 == 2 {
                (seed % 8) as i64
            } else {
                20 + ((seed * 13) % 180) as i64
            };

            let medicine = NewMedicine {
                sku: format!("{}-{:03}", category_code, index + 1),
                name: name.to_string(),
                category: category.to_string(),
                price_cents: *price_cents,
                stock,
                expiry: Some(expiry),
            };

            if let Err(e) = db.medicines().insert(&medicine).await {
                warn!(sku = %medicine.sku, error = %e, "Failed to insert medicine");
                continue;
            }
        }
        generated += medicines.len();
    }

    info!(count = generated, "Catalogue seeded");
    println!("✓ Generated {} medicines", db.medicines().count().await?);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
