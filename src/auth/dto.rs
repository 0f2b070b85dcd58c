use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// Body of `POST /register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegistrationForm {
    #[serde(default)]
    #[validate(length(min = 4, max = 64, message = "Username must be between 4 and 64 characters."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "This field is required."),
        must_match(other = "password", message = "Passwords must match.")
    )]
    pub password2: String,
}

/// Body of `POST /login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

impl RegistrationForm {
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_string();
    }
}

impl LoginForm {
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_string();
    }
}

/// Inline messages for a re-rendered form, keyed by field.
#[derive(Debug, Default, Clone)]
pub struct FormErrors {
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub password2: Vec<String>,
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let fields = errors.field_errors();
        let messages = |field: &str| -> Vec<String> {
            fields
                .get(field)
                .map(|errs| {
                    errs.iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("Invalid {}.", field))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            username: messages("username"),
            password: messages("password"),
            password2: messages("password2"),
        }
    }
}
