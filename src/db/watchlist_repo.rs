use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::WatchlistEntry;

/// Returns `true` if a new row was inserted.
pub async fn add_symbol(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO watchlist (account_id, symbol)
        VALUES ($1, $2)
        ON CONFLICT (account_id, symbol) DO NOTHING
        "#,
    )
    .bind(account_id)
    .bind(symbol)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn remove_symbol(
    conn: &mut PgConnection,
    account_id: Uuid,
    symbol: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE account_id = $1 AND symbol = $2")
        .bind(account_id)
        .bind(symbol)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_watchlist(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>(
        "SELECT * FROM watchlist WHERE account_id = $1 ORDER BY added_at, symbol",
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn get_all_entries(conn: &mut PgConnection) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>("SELECT * FROM watchlist ORDER BY account_id, symbol")
        .fetch_all(&mut *conn)
        .await
}
