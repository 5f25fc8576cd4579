use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::models::{NewTransaction, Side, Transaction};

/// Raw row for the transactions table; `side` is stored as text.
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    account_id: Uuid,
    client_order_id: Option<Uuid>,
    side: String,
    symbol: String,
    name: String,
    quantity: i64,
    price: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = sqlx::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let side = Side::from_db_str(&row.side).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown transaction side: {}", row.side).into())
        })?;

        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            client_order_id: row.client_order_id,
            side,
            symbol: row.symbol,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
            created_at: row.created_at,
        })
    }
}

fn into_transactions(rows: Vec<TransactionRow>) -> Result<Vec<Transaction>, sqlx::Error> {
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Append a transaction to the log.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    tx: &NewTransaction,
) -> Result<Transaction, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(
        r#"
        INSERT INTO transactions (account_id, client_order_id, side, symbol, name, quantity, price, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(tx.account_id)
    .bind(tx.client_order_id)
    .bind(tx.side.as_str())
    .bind(&tx.symbol)
    .bind(&tx.name)
    .bind(tx.quantity)
    .bind(tx.price)
    .bind(tx.total)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

pub async fn get_by_client_order_id(
    conn: &mut PgConnection,
    account_id: Uuid,
    client_order_id: Uuid,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions WHERE account_id = $1 AND client_order_id = $2",
    )
    .bind(account_id)
    .bind(client_order_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Transaction::try_from).transpose()
}

/// Get the N most recent transactions for an account.
pub async fn get_recent(
    conn: &mut PgConnection,
    account_id: Uuid,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions WHERE account_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    into_transactions(rows)
}

/// The whole log for an account in creation order.
pub async fn get_log(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions WHERE account_id = $1 ORDER BY id ASC",
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await?;

    into_transactions(rows)
}
