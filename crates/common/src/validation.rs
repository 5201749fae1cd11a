use crate::money::{Money, MoneyError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-scoped validation failures collected over a whole entity.
///
/// Validators push every problem they find instead of stopping at the first
/// one, so a caller can show all of them next to their fields at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn messages_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Answered as `422` with every field error, so clients can place each message.
impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "errors": self.errors })),
        )
            .into_response()
    }
}

/// Parses a raw amount, recording format and precision problems against `field`.
pub fn parse_money(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<Money> {
    match raw.parse::<Money>() {
        Ok(money) => Some(money),
        Err(MoneyError::Precision(_)) => {
            errors.add(field, "Amount cannot have more than 2 decimal places.");
            None
        }
        Err(MoneyError::Format(_)) => {
            errors.add(field, "Invalid amount format.");
            None
        }
    }
}

/// Records an error unless `min <= value <= max`.
pub fn check_money_range(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Money,
    min: Money,
    max: Money,
) -> bool {
    if value < min || value > max {
        errors.add(
            field,
            format!("Amount must be between {} and {}", min, max),
        );
        return false;
    }
    true
}

pub fn parse_date(errors: &mut ValidationErrors, field: &'static str, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Invalid date format, expected YYYY-MM-DD");
            None
        }
    }
}

/// Length in characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountText {
    Text(String),
    Number(serde_json::Number),
}

/// Lets raw request structs take an amount as either `"12.50"` or `12.5`
/// while keeping the text for [`parse_money`].
pub fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match AmountText::deserialize(deserializer)? {
        AmountText::Text(s) => s,
        AmountText::Number(n) => n.to_string(),
    })
}

/// [`amount_text`] for optional fields. Pair with `#[serde(default)]`.
pub fn optional_amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<AmountText>::deserialize(deserializer)?.map(|amount| match amount {
        AmountText::Text(s) => s,
        AmountText::Number(n) => n.to_string(),
    }))
}
