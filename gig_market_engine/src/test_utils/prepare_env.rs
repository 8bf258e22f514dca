use std::path::Path;

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::{db_types::OrderId, SqliteDatabase};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    format!("sqlite://data/test_market_{}.db", rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    std::fs::create_dir_all("data").expect("Error creating data directory");
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Rewinds an order's due date so that the next sweep sees it as overdue. Only useful in tests,
/// since due dates are otherwise always computed by the database.
pub async fn backdate_order(db: &SqliteDatabase, order_id: OrderId, days: i64) {
    sqlx::query("UPDATE orders SET due_date = datetime(CURRENT_TIMESTAMP, '-' || $1 || ' days') WHERE id = $2")
        .bind(days)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}
