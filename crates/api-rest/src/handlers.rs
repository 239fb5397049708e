//! Route handlers.
//!
//! Every handler converts domain failures at the boundary with [`ApiError::from_account`],
//! naming the message used when the failure is internal.

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::AppState;
use api_shared::{
    AuthRes, ChangePasswordReq, HealthRes, HealthService, LoginReq, MedicalHistoryRes,
    MedicalHistoryUpdateReq, MessageRes, PrivacySettingsRes, PrivacySettingsUpdateReq,
    ProfileUpdateReq, RegisterReq, UserRes,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use telehealth_core::{AccountError, NewAccount, Role};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler(state = AppState)]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = AuthRes),
        (status = 400, description = "Invalid input", body = MessageRes),
        (status = 409, description = "Username or email already registered", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Register a new patient or doctor account
///
/// Returns a bearer token together with the new account.
#[axum::debug_handler(state = AppState)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterReq>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthRes>), ApiError> {
    const FAILURE: &str = "Error registering user";

    let Json(req) = body.map_err(ApiError::from_json_rejection)?;
    let role: Role = req
        .role
        .parse()
        .map_err(|e| ApiError::from_account(e, FAILURE))?;

    let session = state
        .accounts
        .register(NewAccount {
            username: req.username,
            name: req.name,
            email: req.email,
            password: req.password,
            role,
        })
        .map_err(|e| ApiError::from_account(e, FAILURE))?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = AuthRes),
        (status = 401, description = "Invalid credentials", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<AuthRes>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_json_rejection)?;
    let session = state
        .accounts
        .login(&req.username, &req.password)
        .map_err(|e| ApiError::from_account(e, "Error logging in"))?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The authenticated account", body = UserRes),
        (status = 401, description = "Authentication required", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn me(Authenticated(session): Authenticated) -> Json<UserRes> {
    Json(session.into_account().into())
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile of the authenticated account", body = UserRes),
        (status = 401, description = "Authentication required", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn get_profile(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<Json<UserRes>, ApiError> {
    let view = state
        .accounts
        .profile(&session)
        .map_err(|e| ApiError::from_account(e, "Error fetching profile"))?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    security(("bearer_auth" = [])),
    request_body = ProfileUpdateReq,
    responses(
        (status = 200, description = "Updated profile", body = UserRes),
        (status = 400, description = "Invalid updates", body = MessageRes),
        (status = 401, description = "Authentication required", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Update any subset of the profile fields
///
/// The whole request is rejected if any key is outside the profile allow-list.
#[axum::debug_handler(state = AppState)]
pub async fn update_profile(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserRes>, ApiError> {
    let Json(body) = body.map_err(ApiError::from_json_rejection)?;
    let view = state
        .accounts
        .update_profile(&session, body)
        .map_err(|e| ApiError::from_account(e, "Error updating profile"))?;
    Ok(Json(view.into()))
}

#[utoipa::path(
    put,
    path = "/api/users/medical-history",
    security(("bearer_auth" = [])),
    request_body = MedicalHistoryUpdateReq,
    responses(
        (status = 200, description = "Updated medical history", body = MedicalHistoryRes),
        (status = 400, description = "Invalid updates", body = MessageRes),
        (status = 401, description = "Authentication required", body = MessageRes),
        (status = 403, description = "Only patients may update medical history", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn update_medical_history(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MedicalHistoryRes>, ApiError> {
    let Json(body) = body.map_err(ApiError::from_json_rejection)?;
    let history = state
        .accounts
        .update_medical_history(&session, body)
        .map_err(|e| ApiError::from_account(e, "Error updating medical history"))?;
    Ok(Json(history.into()))
}

#[utoipa::path(
    put,
    path = "/api/users/privacy-settings",
    security(("bearer_auth" = [])),
    request_body = PrivacySettingsUpdateReq,
    responses(
        (status = 200, description = "Updated privacy settings", body = PrivacySettingsRes),
        (status = 400, description = "Invalid updates", body = MessageRes),
        (status = 401, description = "Authentication required", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn update_privacy_settings(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PrivacySettingsRes>, ApiError> {
    let Json(body) = body.map_err(ApiError::from_json_rejection)?;
    let settings = state
        .accounts
        .update_privacy_settings(&session, body)
        .map_err(|e| ApiError::from_account(e, "Error updating privacy settings"))?;
    Ok(Json(settings.into()))
}

#[utoipa::path(
    put,
    path = "/api/users/change-password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password updated", body = MessageRes),
        (status = 400, description = "New password rejected", body = MessageRes),
        (status = 401, description = "Current password is incorrect", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
#[axum::debug_handler(state = AppState)]
pub async fn change_password(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    body: Result<Json<ChangePasswordReq>, JsonRejection>,
) -> Result<Json<MessageRes>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_json_rejection)?;
    state
        .accounts
        .change_password(&session, &req.current_password, &req.new_password)
        .map_err(|e| match e {
            AccountError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Current password is incorrect")
            }
            other => ApiError::from_account(other, "Error changing password"),
        })?;
    Ok(Json(MessageRes::new("Password updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/users/account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account deleted", body = MessageRes),
        (status = 401, description = "Authentication required", body = MessageRes),
        (status = 404, description = "Account not found", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Delete the authenticated account
///
/// Tokens issued for the account are rejected afterwards.
#[axum::debug_handler(state = AppState)]
pub async fn delete_account(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<Json<MessageRes>, ApiError> {
    state
        .accounts
        .delete_account(&session)
        .map_err(|e| ApiError::from_account(e, "Error deleting account"))?;
    Ok(Json(MessageRes::new("Account deleted successfully")))
}
