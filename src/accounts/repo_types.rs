use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const DEFAULT_MIN_RATING: f64 = 3.0;

fn default_min_rating() -> f64 {
    DEFAULT_MIN_RATING
}

/// User record as persisted in the store document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String, // unique, case-sensitive
    #[serde(default)]
    pub phone: String,
    #[serde(alias = "password")]
    pub password_hash: String, // Argon2 PHC string, stripped by UserProfile
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub cuisine_types: Vec<String>,
    #[serde(default)]
    pub price_range: String,
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,
    #[serde(default)]
    pub has_preferences: bool, // one-way: set by the first preferences update
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything about a user except the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub cuisine_types: Vec<String>,
    pub price_range: String,
    pub min_rating: f64,
    pub has_preferences: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&UserRecord> for UserProfile {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            phone: u.phone.clone(),
            preferences: u.preferences.clone(),
            dietary_restrictions: u.dietary_restrictions.clone(),
            cuisine_types: u.cuisine_types.clone(),
            price_range: u.price_range.clone(),
            min_rating: u.min_rating,
            has_preferences: u.has_preferences,
            created_at: u.created_at,
        }
    }
}

/// Subset returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub has_preferences: bool,
}

impl From<&UserRecord> for SessionUser {
    fn from(u: &UserRecord) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            has_preferences: u.has_preferences,
        }
    }
}
