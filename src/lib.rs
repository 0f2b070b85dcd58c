//! Wattboard: log in and look at a week of (synthetic) energy usage.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod energy;
pub mod error;
pub mod flash;
pub mod state;
pub mod storage;

pub use app::build_app;
pub use state::AppState;
