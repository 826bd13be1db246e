use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, store::User};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.is_empty() || email.len() > 255 || !is_valid_email(email) {
        return Err(ApiError::validation("email must be a valid address of at most 255 characters"));
    }
    if !(3..=72).contains(&password.len()) {
        return Err(ApiError::validation("password must be between 3 and 72 characters"));
    }
    Ok(())
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() || self.username.chars().count() > 100 {
            return Err(ApiError::validation("username is required and at most 100 characters"));
        }
        check_credentials(&self.email, &self.password)
    }
}

/// Request body for token creation.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

impl TokenRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_credentials(&self.email, &self.password)
    }
}

/// Registered user plus the plain activation token.
#[derive(Debug, Serialize)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}
