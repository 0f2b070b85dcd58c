use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use super::repo::User;
use super::session::{Session, SESSION_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// The login-required gate. Resolves the session cookie to a [`Session`]
/// or rejects with [`AppError::Unauthenticated`] before the handler runs.
pub struct CurrentUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthenticated)?;

        let claims = state.keys.verify(&token).map_err(|e| {
            debug!(error = %e, "session token rejected");
            AppError::Unauthenticated
        })?;

        match state.sessions.resolve(&claims.sid) {
            Some(user_id) if user_id == claims.sub => {}
            Some(_) => {
                warn!(user_id = claims.sub, "session bound to a different user");
                return Err(AppError::Unauthenticated);
            }
            None => return Err(AppError::Unauthenticated),
        }

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        Ok(CurrentUser(Session {
            id: claims.sid,
            user,
        }))
    }
}
