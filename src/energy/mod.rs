//! Per-user energy data: storage, the synthetic generator, the chart and
//! the dashboard that ties them together.

use crate::state::AppState;
use axum::Router;

pub mod generator;
pub mod handlers;
pub mod render;
pub mod repo;
pub mod service;

pub use repo::{EnergyRecord, NewEnergyRecord};

pub fn router() -> Router<AppState> {
    handlers::dashboard_routes()
}
