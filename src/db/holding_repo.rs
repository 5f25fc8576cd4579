use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::Holding;

/// All holdings for an account, ordered by symbol.
pub async fn get_holdings(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Vec<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE account_id = $1 ORDER BY symbol",
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn get_holding(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
) -> Result<Option<Holding>, sqlx::Error> {
    sqlx::query_as::<_, Holding>(
        "SELECT * FROM holdings WHERE account_id = $1 AND symbol = $2",
    )
    .bind(account_id)
    .bind(symbol)
    .fetch_optional(&mut *conn)
    .await
}

/// Insert a holding or overwrite quantity and average price of the existing one.
pub async fn upsert_holding(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
    name: &str,
    quantity: i64,
    avg_price: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO holdings (account_id, symbol, name, quantity, avg_price)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (account_id, symbol) DO UPDATE
            SET quantity = $4, avg_price = $5, updated_at = NOW()
        "#,
    )
    .bind(account_id)
    .bind(symbol)
    .bind(name)
    .bind(quantity)
    .bind(avg_price)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn delete_holding(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM holdings WHERE account_id = $1 AND symbol = $2")
        .bind(account_id)
        .bind(symbol)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
