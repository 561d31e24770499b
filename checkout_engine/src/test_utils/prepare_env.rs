//! Helpers for integration tests: throwaway databases, migrations, and catalog/cart seed data. The catalog itself is
//! out of scope for the engine, so tests write its rows directly.
use std::{env, path::Path};

use chrono::{Duration, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = env::temp_dir();
    format!("sqlite://{}/checkout_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Inserts a product and its variants: `(sku, price, stock)` per variant.
pub async fn seed_product(db: &SqliteDatabase, product_id: &str, name: &str, variants: &[(&str, i64, i64)]) {
    sqlx::query("INSERT INTO products (id, name) VALUES ($1, $2)")
        .bind(product_id)
        .bind(name)
        .execute(db.pool())
        .await
        .expect("Error seeding product");
    for (sku, price, stock) in variants {
        sqlx::query("INSERT INTO product_variants (variant_sku, product_id, price, stock) VALUES ($1, $2, $3, $4)")
            .bind(sku)
            .bind(product_id)
            .bind(price)
            .bind(stock)
            .execute(db.pool())
            .await
            .expect("Error seeding variant");
    }
}

pub async fn seed_cart_item(db: &SqliteDatabase, customer_id: &str, product_id: &str, sku: &str, quantity: i64) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    crate::sqlite::db::cart::add_item(customer_id, product_id, sku, quantity, &mut conn)
        .await
        .expect("Error seeding cart item");
}

pub async fn cart_item_count(db: &SqliteDatabase, customer_id: &str) -> i64 {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    crate::sqlite::db::cart::count_items(customer_id, &mut conn).await.expect("Error counting cart items")
}

/// Rewinds an order's creation time so expiry scenarios do not have to sleep.
pub async fn backdate_order(db: &SqliteDatabase, order_id: i64, minutes: i64) {
    let created_at = Utc::now() - Duration::minutes(minutes);
    sqlx::query("UPDATE orders SET created_at = $2 WHERE id = $1")
        .bind(order_id)
        .bind(created_at)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}
