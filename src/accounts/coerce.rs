//! Normalization of loosely typed preference input.
//!
//! Clients send whatever JSON they like for these fields. Rather than
//! rejecting odd shapes, each field is mapped to a well-typed value here.

use serde_json::Value;

use super::{
    dto::{PreferencesRequest, PreferencesUpdate},
    error::AccountError,
    repo_types::DEFAULT_MIN_RATING,
};

/// Arrays keep their string items; anything else is an empty list.
pub fn tags(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn price_range(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Missing, null, zero, false, empty or non-numeric input falls back to 3.0.
pub fn min_rating(value: Option<Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(r) if r != 0.0 && r.is_finite() => r,
        _ => DEFAULT_MIN_RATING,
    }
}

/// `1.0` names user 1; fractional, negative or huge values name nobody.
fn integral_id(f: f64) -> Option<u64> {
    (f.is_finite() && f > 0.0 && f.fract() == 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

/// Absent-ish ids are `MissingUserId`; ids that cannot name a record are
/// `UserNotFound`.
pub fn user_id(value: Option<&Value>) -> Result<u64, AccountError> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Err(AccountError::MissingUserId),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Err(AccountError::MissingUserId),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(integral_id))
            .ok_or(AccountError::UserNotFound),
        Some(Value::String(s)) if s.trim().is_empty() => Err(AccountError::MissingUserId),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| AccountError::UserNotFound),
        Some(_) => Err(AccountError::UserNotFound),
    }
}

impl PreferencesRequest {
    /// Splits the raw request into its user id and the coerced field values.
    pub fn into_update(self) -> (Option<Value>, PreferencesUpdate) {
        let update = PreferencesUpdate {
            preferences: tags(self.preferences),
            dietary_restrictions: tags(self.dietary_restrictions),
            cuisine_types: tags(self.cuisine_types),
            price_range: price_range(self.price_range),
            min_rating: min_rating(self.min_rating),
        };
        (self.user_id, update)
    }
}
