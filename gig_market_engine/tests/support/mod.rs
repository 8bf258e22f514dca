#![allow(dead_code)]
use gig_market_engine::{
    db_types::{Credits, Gig, NewGig, NewUser, Role, User},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LedgerApi,
    MarketplaceDatabase,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn setup() -> (OrderFlowApi<SqliteDatabase>, LedgerApi<SqliteDatabase>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    (OrderFlowApi::new(db.clone(), EventProducers::default()), LedgerApi::new(db))
}

pub async fn tear_down(mut api: OrderFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

pub struct Actors {
    pub client: User,
    pub freelancer: User,
    pub gig: Gig,
}

/// Registers a funded client, a freelancer and one gig.
pub async fn seed_marketplace(
    api: &OrderFlowApi<SqliteDatabase>,
    opening_balance: i64,
    price: i64,
) -> Actors {
    let client = api
        .register_user(NewUser::new("Alice", "alice@example.com", Role::Client).with_balance(Credits::from(opening_balance)))
        .await
        .expect("Error registering client");
    let freelancer = api
        .register_user(NewUser::new("Bob", "bob@example.com", Role::Freelancer))
        .await
        .expect("Error registering freelancer");
    let gig = api
        .register_gig(NewGig::new("Logo design", Credits::from(price), freelancer.id).with_duration_days(7))
        .await
        .expect("Error registering gig");
    Actors { client, freelancer, gig }
}
