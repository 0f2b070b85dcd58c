use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::dto::{FormErrors, LoginForm, RegistrationForm};
use super::extractors::CurrentUser;
use super::repo::User;
use super::session;
use crate::error::{AppError, Result};
use crate::flash::{Flash, FlashMessage};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub flash: Option<FlashMessage>,
    pub username: String,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub flash: Option<FlashMessage>,
    pub username: String,
    pub errors: FormErrors,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

pub async fn register_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = Flash::take(jar);
    (
        jar,
        RegisterTemplate {
            flash,
            username: String::new(),
            errors: FormErrors::default(),
        },
    )
}

#[instrument(skip(state, jar, form))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut form): Form<RegistrationForm>,
) -> Result<Response> {
    form.normalize();

    let rerender = |errors: FormErrors, username: String| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            RegisterTemplate {
                flash: None,
                username,
                errors,
            },
        )
            .into_response()
    };

    if let Err(e) = form.validate() {
        warn!(username = %form.username, "registration form rejected");
        return Ok(rerender(FormErrors::from(&e), form.username));
    }

    match User::create(&state.db, &form.username, &form.password).await {
        Ok(user) => {
            info!(user_id = user.id, "user registered");
            let jar = Flash::Registered.set(jar);
            Ok((jar, Redirect::to("/login")).into_response())
        }
        Err(AppError::DuplicateUsername) => {
            let errors = FormErrors {
                username: vec!["Username already taken.".to_string()],
                ..FormErrors::default()
            };
            Ok(rerender(errors, form.username))
        }
        Err(e) => Err(e),
    }
}

pub async fn login_page(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = Flash::take(jar);
    (
        jar,
        LoginTemplate {
            flash,
            username: String::new(),
            errors: FormErrors::default(),
        },
    )
}

#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut form): Form<LoginForm>,
) -> Result<Response> {
    form.normalize();

    if let Err(e) = form.validate() {
        let page = LoginTemplate {
            flash: None,
            username: form.username,
            errors: FormErrors::from(&e),
        };
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let Some(user) = User::verify(&state.db, &form.username, &form.password).await? else {
        warn!(username = %form.username, "login failed");
        return Err(AppError::InvalidCredentials);
    };

    // A new login replaces whatever session this browser had.
    let jar = session::logout(&state.sessions, &state.keys, jar);
    let (jar, _) = session::login(&state.sessions, &state.keys, jar, &user)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok((jar, Redirect::to("/dashboard")).into_response())
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = session::logout(&state.sessions, &state.keys, jar);
    info!(user_id = current.user.id, "user logged out");
    let jar = Flash::LoggedOut.set(jar);
    (jar, Redirect::to("/login"))
}
