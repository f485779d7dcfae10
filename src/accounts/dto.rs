use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repo_types::{SessionUser, UserProfile};

/// Request body for account creation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for a preferences update. Fields are loosely typed on purpose;
/// see `coerce` for how each is normalized.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferencesRequest {
    pub user_id: Option<Value>,
    pub preferences: Option<Value>,
    pub dietary_restrictions: Option<Value>,
    pub cuisine_types: Option<Value>,
    pub price_range: Option<Value>,
    pub min_rating: Option<Value>,
}

/// Preference values after coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferencesUpdate {
    pub preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub cuisine_types: Vec<String>,
    pub price_range: String,
    pub min_rating: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: u64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// Body of every failed account call.
#[derive(Debug, Serialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
