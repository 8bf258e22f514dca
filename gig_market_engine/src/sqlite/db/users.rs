use gme_common::Credits;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User, UserId},
    traits::MarketplaceError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, MarketplaceError> {
    let user = sqlx::query_as(
        r#"
            INSERT INTO users (name, email, role, balance) VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.role)
    .bind(user.balance)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(user_id: UserId, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

/// Debits `amount` from the user's balance. The sufficient-funds check is part of the UPDATE
/// itself, so concurrent debits against the same row cannot interleave a stale read. Returns
/// `None` if the user's balance could not cover the amount (the caller distinguishes a missing
/// user from insufficient funds).
pub async fn debit(
    user_id: UserId,
    amount: Credits,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, MarketplaceError> {
    let user: Option<User> = sqlx::query_as(
        r#"
            UPDATE users SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND balance >= $1
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    if let Some(u) = &user {
        trace!("💳️ Debited {amount} from {user_id}. New balance: {}", u.balance);
    }
    Ok(user)
}

/// Credits `amount` to the user's balance. No upper bound. Returns the updated user, or an error
/// if no such user exists.
pub async fn credit(user_id: UserId, amount: Credits, conn: &mut SqliteConnection) -> Result<User, MarketplaceError> {
    let user: Option<User> = sqlx::query_as(
        r#"
            UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    let user = user.ok_or(MarketplaceError::UserNotFound(user_id))?;
    trace!("💳️ Credited {amount} to {user_id}. New balance: {}", user.balance);
    Ok(user)
}
