//! Synthetic week of hourly readings.

use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::repo::{self, NewEnergyRecord};
use crate::config::SeriesMode;
use crate::error::Result;

/// 7 days × 24 hours.
pub const POINTS_PER_SERIES: usize = 7 * 24;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// The fixed series, every point stamped `at`. The index only drives the
/// values; timestamps are not spaced out.
pub fn synthetic_series(at: OffsetDateTime) -> Vec<NewEnergyRecord> {
    (0..POINTS_PER_SERIES)
        .map(|i| {
            let i = i as f64;
            NewEnergyRecord {
                timestamp: at,
                usage: round2(0.5 + 0.02 * i),
                temperature: round2(20.0 + 0.05 * i),
                humidity: round2(50.0 + 0.03 * i),
            }
        })
        .collect()
}

/// Write a fresh series for `owner_id`. Returns the number of rows written.
pub async fn generate(db: &SqlitePool, owner_id: i64, mode: SeriesMode) -> Result<u64> {
    let series = synthetic_series(OffsetDateTime::now_utc());
    let written = match mode {
        SeriesMode::Append => repo::append(db, owner_id, &series).await?,
        SeriesMode::Replace => repo::replace(db, owner_id, &series).await?,
    };
    tracing::info!(owner_id, written, ?mode, "synthetic series generated");
    Ok(written)
}
