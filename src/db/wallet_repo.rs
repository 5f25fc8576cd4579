use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::Wallet;

/// Create the wallet row for a new account.
pub async fn insert_wallet(
    conn: &mut PgConnection,
    account_id: Uuid,
    initial_balance: Decimal,
) -> Result<Wallet, sqlx::Error> {
    sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (account_id, balance, initial_balance)
        VALUES ($1, $2, $2)
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(initial_balance)
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_wallet(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Option<Wallet>, sqlx::Error> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE account_id = $1")
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Set the balance only if the wallet is still at `expected_version`.
/// Returns `false` when no row matched.
pub async fn update_balance_if_version(
    conn: &mut PgConnection,
    account_id: Uuid,
    expected_version: i64,
    new_balance: Decimal,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE wallets
        SET balance = $3, version = version + 1, updated_at = NOW()
        WHERE account_id = $1 AND version = $2
        "#,
    )
    .bind(account_id)
    .bind(expected_version)
    .bind(new_balance)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
