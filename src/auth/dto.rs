use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{auth::repo_types::PublicUser, error::ValidationError};

const LOGIN_MAX_CHARS: usize = 50;
const PASSWORD_MIN_CHARS: usize = 8;
const PASSWORD_MAX_CHARS: usize = 72;

fn is_valid_login(login: &str) -> bool {
    lazy_static! {
        static ref LOGIN_RE: Regex = Regex::new(r"^[A-Za-z0-9]{3,50}$").unwrap();
    }
    LOGIN_RE.is_match(login)
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_login(&self.login) {
            return Err(ValidationError::new(
                "login must be 3 to 50 latin letters or digits",
            ));
        }
        let len = self.password.chars().count();
        if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
            return Err(ValidationError::new("password must be 8 to 72 characters"));
        }
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.login.is_empty() || self.login.chars().count() > LOGIN_MAX_CHARS {
            return Err(ValidationError::new("login is required and at most 50 characters"));
        }
        if self.password.is_empty() || self.password.chars().count() > PASSWORD_MAX_CHARS {
            return Err(ValidationError::new("password is required and at most 72 characters"));
        }
        Ok(())
    }
}

/// Response returned after login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}
