//! # API REST
//!
//! REST API implementation for the telehealth account service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer-token session guard as an extractor
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, `{message}` errors, CORS)
//!
//! Uses `api-shared` for wire types and `telehealth-core` for every account operation.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;

use api_shared::{
    AuthRes, ChangePasswordReq, EmergencyContactRes, HealthRes, LoginReq, MedicalHistoryRes,
    MedicalHistoryUpdateReq, MessageRes, PrivacySettingsRes, PrivacySettingsUpdateReq,
    ProfileUpdateReq, RegisterReq, UserRes,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use telehealth_core::{AccountService, CoreConfig};
use tower_http::cors::CorsLayer;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use extract::Authenticated;

/// Default listen address when `TELEHEALTH_REST_ADDR` is unset.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:5000";

/// Application state for the REST API server
///
/// Shared by every handler; the account service is behind an `Arc` so cloning the state per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn new(accounts: AccountService) -> Self {
        Self {
            accounts: Arc::new(accounts),
        }
    }

    /// State backed by the file store under the configured data directory.
    pub fn from_config(cfg: Arc<CoreConfig>) -> Self {
        Self::new(AccountService::with_file_store(cfg))
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::register,
        handlers::login,
        handlers::me,
        handlers::get_profile,
        handlers::update_profile,
        handlers::update_medical_history,
        handlers::update_privacy_settings,
        handlers::change_password,
        handlers::delete_account,
    ),
    components(schemas(
        HealthRes,
        MessageRes,
        RegisterReq,
        LoginReq,
        AuthRes,
        UserRes,
        EmergencyContactRes,
        MedicalHistoryRes,
        PrivacySettingsRes,
        ProfileUpdateReq,
        MedicalHistoryUpdateReq,
        PrivacySettingsUpdateReq,
        ChangePasswordReq,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Builds the full REST router: API routes, Swagger UI and permissive CORS for the SPA.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/api/users/medical-history",
            put(handlers::update_medical_history),
        )
        .route(
            "/api/users/privacy-settings",
            put(handlers::update_privacy_settings),
        )
        .route("/api/users/change-password", put(handlers::change_password))
        .route("/api/users/account", delete(handlers::delete_account))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves the core configuration from the process environment.
///
/// Call once at startup, after `dotenvy::dotenv()`.
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let cfg = CoreConfig::from_env_values(
        std::env::var("TELEHEALTH_DATA_DIR").ok(),
        std::env::var("TELEHEALTH_TOKEN_SECRET").ok(),
        std::env::var("TELEHEALTH_TOKEN_TTL_SECS").ok(),
        std::env::var("TELEHEALTH_HASH_ITERATIONS").ok(),
    )?;
    Ok(cfg)
}

/// Listen address from `TELEHEALTH_REST_ADDR`, or [`DEFAULT_REST_ADDR`].
pub fn rest_addr_from_env() -> String {
    std::env::var("TELEHEALTH_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into())
}
