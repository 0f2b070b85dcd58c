//! Usage chart for one owner, drawn with plotters and stored per owner as PNG.

use std::path::PathBuf;

use bytes::Bytes;
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use lazy_static::lazy_static;
use plotters::prelude::*;
use plotters::style::register_font;
use sqlx::SqlitePool;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

use super::repo;
use crate::error::{AppError, Result};
use crate::storage::StorageClient;

pub const CHART_TITLE: &str = "Energy Usage Over the Last Week";
pub const CHART_CONTENT_TYPE: &str = "image/png";
pub const CHART_SIZE: (u32, u32) = (1000, 600);
const TICK_FORMAT: &[FormatItem<'static>] = format_description!("[month]-[day] [hour]:[minute]");
/// Padding either side of the x axis when every point shares one instant.
const FLAT_SPAN_PAD_SECS: f64 = 1800.0;

static CHART_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

lazy_static! {
    /// Glyphs come from the embedded font, never from the host.
    static ref FONT_REGISTERED: bool =
        register_font("sans-serif", FontStyle::Normal, CHART_FONT).is_ok();
}

/// Storage key of `owner_id`'s chart.
pub fn artifact_key(owner_id: i64) -> String {
    format!("{}/energy_usage.png", owner_id)
}

fn render_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Render(e.to_string())
}

fn tick_label(secs: f64) -> String {
    OffsetDateTime::from_unix_timestamp(secs.floor() as i64)
        .ok()
        .and_then(|t| t.format(TICK_FORMAT).ok())
        .unwrap_or_default()
}

fn as_secs(ts: OffsetDateTime) -> f64 {
    ts.unix_timestamp_nanos() as f64 / 1e9
}

/// Draw `(timestamp, usage)` points as a PNG line chart with markers.
pub fn draw_usage_chart(points: &[(OffsetDateTime, f64)]) -> Result<Vec<u8>> {
    let xs = points.iter().map(|(t, _)| as_secs(*t));
    let mut x_min = xs.clone().fold(f64::INFINITY, f64::min);
    let mut x_max = xs.fold(f64::NEG_INFINITY, f64::max);
    if !x_min.is_finite() || !x_max.is_finite() {
        return Err(AppError::Render("no points to draw".into()));
    }
    if x_max - x_min < 1.0 {
        x_min -= FLAT_SPAN_PAD_SECS;
        x_max += FLAT_SPAN_PAD_SECS;
    }
    let y_top = points.iter().map(|(_, u)| *u).fold(0.0_f64, f64::max);
    let y_max = if y_top > 0.0 { y_top * 1.1 } else { 1.0 };

    if !*FONT_REGISTERED {
        return Err(AppError::Render("embedded chart font failed to load".into()));
    }

    let (width, height) = CHART_SIZE;
    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(CHART_TITLE, ("sans-serif", 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Usage (kWh)")
            .x_labels(8)
            .x_label_formatter(&|x: &f64| tick_label(*x))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(
                LineSeries::new(points.iter().map(|(t, u)| (as_secs(*t), *u)), &BLUE)
                    .point_size(3),
            )
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&rgb, width, height, ColorType::Rgb8)
        .map_err(render_err)?;
    Ok(png)
}

/// Render `owner_id`'s records to their chart artifact. `None` when the
/// owner has no records, in which case nothing is written.
pub async fn render(
    db: &SqlitePool,
    storage: &dyn StorageClient,
    owner_id: i64,
) -> Result<Option<PathBuf>> {
    let records = repo::list_by_owner(db, owner_id).await?;
    if records.is_empty() {
        tracing::debug!(owner_id, "no energy data; skipping chart");
        return Ok(None);
    }

    let points: Vec<(OffsetDateTime, f64)> =
        records.iter().map(|r| (r.timestamp, r.usage)).collect();
    let count = points.len();
    // CPU-bound.
    let png = tokio::task::spawn_blocking(move || draw_usage_chart(&points))
        .await
        .map_err(render_err)??;

    let path = storage
        .put_object(&artifact_key(owner_id), Bytes::from(png), CHART_CONTENT_TYPE)
        .await?;
    tracing::info!(owner_id, points = count, path = %path.display(), "usage chart rendered");
    Ok(Some(path))
}
