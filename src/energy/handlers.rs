use askama::Template;
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use super::{render, service};
use crate::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::flash::{Flash, FlashMessage};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub flash: Option<FlashMessage>,
    pub username: String,
    pub has_chart: bool,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/dashboard/chart", get(chart))
}

#[instrument(skip_all, fields(user_id = tracing::field::Empty))]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    tracing::Span::current().record("user_id", session.user.id);
    let artifact = service::view(&state, &session).await?;
    let (jar, flash) = Flash::take(jar);
    Ok((
        jar,
        DashboardTemplate {
            flash,
            username: session.user.username,
            has_chart: artifact.is_some(),
        },
    ))
}

/// The caller's own chart; other users' artifacts are unreachable here.
#[instrument(skip_all)]
pub async fn chart(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Response> {
    let body = state
        .storage
        .get_object(&render::artifact_key(session.user.id))
        .await?
        .ok_or(AppError::NotFound("chart"))?;
    Ok((
        [
            (header::CONTENT_TYPE, render::CHART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response())
}
