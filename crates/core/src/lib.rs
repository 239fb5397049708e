//! # Telehealth Core
//!
//! Core business logic for the telehealth account service.
//!
//! This crate contains pure data operations:
//! - Account documents with sharded JSON storage under the configured data directory
//! - Password hashing and signed bearer tokens
//! - Allow-listed partial updates of profile, medical history and privacy settings
//! - The role gate
//! - Client-session appointment booking and time-slot generation
//!
//! **No API concerns**: HTTP servers, status codes and response messages belong in `api-rest`
//! or `api-shared`.

pub mod account;
pub mod allow_list;
pub mod appointments;
pub mod config;
pub mod constants;
pub mod error;
pub mod password;
pub mod repositories;
pub mod session;
pub mod store;
pub mod token;
pub mod updates;

pub use account::{
    Account, AccountView, EmergencyContact, MedicalHistory, PrivacySettings, Role,
};
pub use config::CoreConfig;
pub use error::{AccountError, AccountResult};
pub use repositories::accounts::{AccountService, AuthSession, NewAccount};
pub use session::Session;
pub use store::{AccountStore, FileAccountStore, InMemoryAccountStore};
pub use telehealth_types::{EmailAddress, NonEmptyText, TextError};
pub use telehealth_uuid::AccountId;
