use chrono::{DateTime, Utc};
use common::validation::{ValidationErrors, char_len};
use serde::{Deserialize, Serialize};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct RawRegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// A registration that passed every rule. The username is already normalized.
#[derive(Debug)]
pub struct RegisterRequest {
    username: String,
    password: String,
}

/// Usernames are stored and looked up trimmed and lowercased.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

impl RegisterRequest {
    pub fn new(raw: RawRegisterRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let username = normalize_username(&raw.username);

        let len = char_len(&username);
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            errors.add(
                "username",
                format!(
                    "Username must be between {} and {} characters long.",
                    USERNAME_MIN_LEN, USERNAME_MAX_LEN
                ),
            );
        }
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.add(
                "username",
                "Username can only contain letters, numbers, and underscores.",
            );
        }

        check_password_strength(&mut errors, &raw.password);

        if raw.password != raw.confirm_password {
            errors.add("confirm_password", "Passwords must match");
        }

        errors.into_result(Self {
            username,
            password: raw.password,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

fn check_password_strength(errors: &mut ValidationErrors, password: &str) {
    if char_len(password) < PASSWORD_MIN_LEN {
        errors.add("password", "Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.add("password", "Password must contain at least one uppercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.add("password", "Password must contain at least one lowercase letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.add("password", "Password must contain at least one number.");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        errors.add("password", "Password must contain at least one special character.");
    }
}
