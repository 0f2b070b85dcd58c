//! Energy record store. Rows are only ever read by, and written for, their owner.

use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct EnergyRecord {
    pub id: i64,
    pub timestamp: OffsetDateTime,
    pub usage: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub owner_id: i64,
}

/// A reading waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEnergyRecord {
    pub timestamp: OffsetDateTime,
    pub usage: f64,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, FromRow)]
struct EnergyRow {
    id: i64,
    timestamp_us: i64,
    usage: f64,
    temperature: f64,
    humidity: f64,
    owner_id: i64,
}

impl TryFrom<EnergyRow> for EnergyRecord {
    type Error = anyhow::Error;

    fn try_from(r: EnergyRow) -> anyhow::Result<Self> {
        let timestamp = OffsetDateTime::from_unix_timestamp_nanos(i128::from(r.timestamp_us) * 1_000)
            .with_context(|| format!("energy row {} has out-of-range timestamp", r.id))?;
        Ok(Self {
            id: r.id,
            timestamp,
            usage: r.usage,
            temperature: r.temperature,
            humidity: r.humidity,
            owner_id: r.owner_id,
        })
    }
}

fn to_micros(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000) as i64
}

async fn insert_batch_tx(
    tx: &mut Transaction<'_, Sqlite>,
    owner_id: i64,
    records: &[NewEnergyRecord],
) -> Result<u64> {
    let mut inserted = 0;
    for r in records {
        inserted += sqlx::query(
            r#"
            INSERT INTO energy_data (timestamp, usage, temperature, humidity, user_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_micros(r.timestamp))
        .bind(r.usage)
        .bind(r.temperature)
        .bind(r.humidity)
        .bind(owner_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

/// Insert `records` for `owner_id` in one transaction: either the whole
/// batch becomes visible or none of it does.
pub async fn append(db: &SqlitePool, owner_id: i64, records: &[NewEnergyRecord]) -> Result<u64> {
    let mut tx = db.begin().await?;
    let inserted = insert_batch_tx(&mut tx, owner_id, records).await?;
    tx.commit().await?;
    tracing::debug!(owner_id, inserted, "energy batch appended");
    Ok(inserted)
}

/// Swap the owner's whole series for `records` in one transaction.
pub async fn replace(db: &SqlitePool, owner_id: i64, records: &[NewEnergyRecord]) -> Result<u64> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query("DELETE FROM energy_data WHERE user_id = ?")
        .bind(owner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let inserted = insert_batch_tx(&mut tx, owner_id, records).await?;
    tx.commit().await?;
    tracing::debug!(owner_id, removed, inserted, "energy series replaced");
    Ok(inserted)
}

/// Every record of `owner_id`, oldest first. Empty when the owner has none.
pub async fn list_by_owner(db: &SqlitePool, owner_id: i64) -> Result<Vec<EnergyRecord>> {
    let rows = sqlx::query_as::<_, EnergyRow>(
        r#"
        SELECT id, timestamp AS timestamp_us, usage, temperature, humidity, user_id AS owner_id
        FROM energy_data
        WHERE user_id = ?
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(db)
    .await?;

    let records = rows
        .into_iter()
        .map(EnergyRecord::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(records)
}

pub async fn count_by_owner(db: &SqlitePool, owner_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM energy_data WHERE user_id = ?")
        .bind(owner_id)
        .fetch_one(db)
        .await?;
    Ok(count)
}
