//! # Seed Data Generator
//!
//! Populates the document store with demo locales, users, and products.
//!
//! ## Usage
//! ```bash
//! # Seed into the default file
//! cargo run -p caja-db --bin seed
//!
//! # Custom product count and database path
//! cargo run -p caja-db --bin seed -- --count 500 --db ./data/caja.db
//! ```
//!
//! Demo users are created WITHOUT a password hash, so any secret logs them
//! in. Never run this against a production database.

use std::env;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use caja_core::{
    Local, MeasurementUnit, Product, Role, SubscriptionStatus, User,
};
use caja_db::{Collection, Database, DbConfig};

/// Product categories for realistic demo data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &[
            "Coca-Cola 330ml",
            "Pepsi 330ml",
            "Sprite 500ml",
            "Orange Juice 1L",
            "Sparkling Water 750ml",
            "Iced Tea 500ml",
        ],
    ),
    (
        "Snacks",
        &[
            "Potato Chips",
            "Tortilla Chips",
            "Chocolate Bar",
            "Gummy Bears",
            "Salted Peanuts",
            "Cookies Pack",
        ],
    ),
    (
        "Dairy",
        &[
            "Whole Milk 1L",
            "Greek Yogurt",
            "Cheddar Cheese 250g",
            "Butter 200g",
            "Eggs Dozen",
        ],
    ),
    (
        "Grocery",
        &[
            "Spaghetti 500g",
            "White Rice 1kg",
            "Canned Tomatoes",
            "Olive Oil 500ml",
            "Black Beans 400g",
        ],
    ),
];

struct Args {
    db_path: String,
    count: usize,
}

fn parse_args() -> Args {
    let mut args = Args {
        db_path: "./caja.db".to_string(),
        count: 100,
    };

    let mut iter = env::args().skip(1);
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--db" => {
                if let Some(path) = iter.next() {
                    args.db_path = path;
                }
            }
            "--count" => {
                if let Some(count) = iter.next().and_then(|c| c.parse().ok()) {
                    args.count = count;
                }
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    args
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args();
    tracing::info!(db = %args.db_path, count = args.count, "Seeding demo data");

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    let docs = db.documents();

    // One demo locale
    let local = Local {
        id: "local-demo-1".to_string(),
        name: "Sucursal Centro".to_string(),
        address: "Av. Principal 123".to_string(),
        is_active: true,
        subscription_status: SubscriptionStatus::Active,
        last_payment_date: Some(Utc::now()),
        cash_in_register_cents: Some(0),
    };
    docs.put(Collection::Locales, &local.id, &serde_json::to_value(&local)?)
        .await?;

    // Demo admin and seller for the locale (no password hash: demo only)
    let users = [
        User {
            id: Uuid::new_v4().to_string(),
            username: "ana.admin".to_string(),
            email: Some("ana@example.com".to_string()),
            password_hash: None,
            role: Role::Admin,
            name: "Ana Torres".to_string(),
            local_id: Some(local.id.clone()),
        },
        User {
            id: Uuid::new_v4().to_string(),
            username: "maria".to_string(),
            email: Some("maria@example.com".to_string()),
            password_hash: None,
            role: Role::Seller,
            name: "Maria Lopez".to_string(),
            local_id: Some(local.id.clone()),
        },
    ];
    for user in &users {
        let mut body = serde_json::to_value(user)?;
        // The synced store maintains these on real writes; mirror it here
        body["usernameLower"] = json!(user.username.to_lowercase());
        if let Some(email) = &user.email {
            body["emailLower"] = json!(email.to_lowercase());
        }
        docs.put(Collection::Users, &user.id, &body).await?;
    }

    // Products cycle through the category catalog; repeats get a suffix
    let catalog_size: usize = CATEGORIES.iter().map(|(_, names)| names.len()).sum();
    let mut created = 0usize;
    'outer: loop {
        for (category, names) in CATEGORIES {
            for (i, name) in names.iter().enumerate() {
                if created >= args.count {
                    break 'outer;
                }
                let n = created + 1;
                let product = Product {
                    id: Uuid::new_v4().to_string(),
                    local_id: local.id.clone(),
                    name: if created < catalog_size {
                        (*name).to_string()
                    } else {
                        format!("{name} #{n}")
                    },
                    price_cents: 99 + ((n as i64 * 37) % 1_900),
                    stock: (n as i64 * 7) % 100,
                    min_stock: 5,
                    category: (*category).to_string(),
                    sku: format!("{}-{:04}", &category[..3].to_uppercase(), n),
                    barcode: if i % 2 == 0 {
                        Some(format!("779{:010}", n))
                    } else {
                        None
                    },
                    cost_cents: Some(60 + ((n as i64 * 23) % 1_200)),
                    measurement_unit: MeasurementUnit::Unit,
                };
                docs.put(
                    Collection::Products,
                    &product.id,
                    &serde_json::to_value(&product)?,
                )
                .await?;
                created += 1;
            }
        }
    }

    tracing::info!(
        locales = 1,
        users = users.len(),
        products = created,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
