use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    accounts::{
        dto::{
            HealthResponse, LoginRequest, LoginResponse, PreferencesRequest, SignupRequest,
            SignupResponse, UserResponse,
        },
        error::AccountError,
    },
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/preferences", post(update_preferences).put(update_preferences))
        .route("/user/:id", get(get_user))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), AccountError> {
    let Json(payload) = payload?;
    let user_id = state.accounts.create_account(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            user_id,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AccountError> {
    let Json(payload) = payload?;
    let user = state
        .accounts
        .login(payload.email.as_deref(), payload.password.as_deref())
        .await?;
    Ok(Json(LoginResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_preferences(
    State(state): State<AppState>,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AccountError> {
    let Json(payload) = payload?;
    let (user_id, update) = payload.into_update();
    let user = state
        .accounts
        .update_preferences(user_id.as_ref(), update)
        .await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AccountError> {
    let id = id.parse::<u64>().map_err(|_| AccountError::UserNotFound)?;
    let user = state.accounts.get_user(id).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running",
    })
}
