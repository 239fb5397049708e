//! Session guard as an axum extractor.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::bearer_token;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use telehealth_core::Session;

/// The authenticated caller.
///
/// Rejects with 401 `Authentication required` when the `Authorization` header is missing or
/// not a bearer credential, or when the token does not resolve to a stored account.
pub struct Authenticated(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        state
            .accounts
            .authenticate(bearer)
            .map(Authenticated)
            .map_err(|e| ApiError::from_account(e, "Error authenticating request"))
    }
}
