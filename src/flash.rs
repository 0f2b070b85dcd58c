//! One-shot messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "wattboard_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Registered,
    InvalidCredentials,
    LoggedOut,
}

/// What a page template needs to show a flash.
#[derive(Debug, Clone)]
pub struct FlashMessage {
    pub level: &'static str,
    pub text: &'static str,
}

impl Flash {
    fn code(self) -> &'static str {
        match self {
            Flash::Registered => "registered",
            Flash::InvalidCredentials => "invalid_credentials",
            Flash::LoggedOut => "logged_out",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "registered" => Some(Flash::Registered),
            "invalid_credentials" => Some(Flash::InvalidCredentials),
            "logged_out" => Some(Flash::LoggedOut),
            _ => None,
        }
    }

    pub fn message(self) -> FlashMessage {
        match self {
            Flash::Registered => FlashMessage {
                level: "success",
                text: "Registration successful!",
            },
            Flash::InvalidCredentials => FlashMessage {
                level: "danger",
                text: "Invalid username or password",
            },
            Flash::LoggedOut => FlashMessage {
                level: "info",
                text: "You have been logged out.",
            },
        }
    }

    pub fn set(self, jar: CookieJar) -> CookieJar {
        let cookie = Cookie::build((FLASH_COOKIE, self.code()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        jar.add(cookie)
    }

    /// Read and clear the pending flash, if any.
    pub fn take(jar: CookieJar) -> (CookieJar, Option<FlashMessage>) {
        let Some(flash) = jar
            .get(FLASH_COOKIE)
            .and_then(|c| Flash::from_code(c.value()))
        else {
            return (jar, None);
        };
        let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
        (jar, Some(flash.message()))
    }
}
