use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod session;

pub use extractors::CurrentUser;
pub use repo::User;
pub use session::{Session, SessionKeys, SessionStore};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
