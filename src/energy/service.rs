use std::path::PathBuf;

use super::{generator, render};
use crate::auth::session::Session;
use crate::error::Result;
use crate::state::AppState;

/// One dashboard visit: write a fresh series for the session's user, then
/// chart everything they own.
pub async fn view(state: &AppState, session: &Session) -> Result<Option<PathBuf>> {
    let owner_id = session.user.id;
    generator::generate(&state.db, owner_id, state.config.series_mode).await?;
    render::render(&state.db, state.storage.as_ref(), owner_id).await
}
