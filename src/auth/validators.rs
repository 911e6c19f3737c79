// src/auth/validators.rs

use regex::Regex;
use std::sync::OnceLock;

use super::models::{LoginRequest, RegisterRequest};
use super::password::check_password_strength;
use crate::common::{ValidationResult, Validator};

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 100;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

/// True when `email` looks like `local@domain.tld`
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LENGTH && email_regex().is_match(email)
}

// ============================================================================
// Registration
// ============================================================================

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.email.as_deref().map(str::trim) {
            None | Some("") => result.add_error("email", "Email is required."),
            Some(email) if !is_valid_email(email) => {
                result.add_error("email", "Enter a valid email address.")
            }
            Some(_) => {}
        }

        match data.password.as_deref() {
            None | Some("") => result.add_error("password", "Password is required."),
            Some(password) => {
                for message in check_password_strength(password).messages() {
                    result.add_error("password", message);
                }
            }
        }

        if let Some(name) = &data.name {
            if name.trim().chars().count() > MAX_NAME_LENGTH {
                result.add_error("name", "Name must be at most 100 characters.");
            }
        }

        result
    }
}

// ============================================================================
// Login
// ============================================================================

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.email.as_deref().map(str::trim).unwrap_or("").is_empty() {
            result.add_error("email", "Email is required.");
        }
        if data.password.as_deref().unwrap_or("").is_empty() {
            result.add_error("password", "Password is required.");
        }

        result
    }
}
