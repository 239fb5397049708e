//! Account management.
//!
//! [`AccountService`] owns every operation on an account document: registration, login,
//! bearer-token authentication, allow-listed partial updates, password change and deletion.
//!
//! Mutations follow one path: resolve the session, run the role gate where one applies,
//! validate and decode the body, load the stored account, assign exactly the submitted fields,
//! bump `updated_at`, and persist with a single write. Nothing is written if any step before
//! the write fails.
//!
//! ## Pure Data Operations
//!
//! This module contains **only** data operations. HTTP status codes and response messages
//! belong in `api-rest`.

use crate::account::{Account, AccountView, MedicalHistory, PrivacySettings, Role};
use crate::config::CoreConfig;
use crate::constants::MIN_PASSWORD_LEN;
use crate::password::PasswordHash;
use crate::session::{require_role, Session, MEDICAL_HISTORY_ROLES};
use crate::store::{AccountStore, FileAccountStore};
use crate::token::TokenService;
use crate::updates::{MedicalHistoryUpdate, PartialUpdate, PrivacySettingsUpdate, ProfileUpdate};
use crate::{AccountError, AccountId, AccountResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use telehealth_types::{EmailAddress, NonEmptyText};

/// Registration input as submitted by the client, before validation.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Result of a successful registration or login.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountView,
}

/// Service for account operations.
#[derive(Clone)]
pub struct AccountService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
}

impl AccountService {
    /// Creates a service over the given store.
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn AccountStore>) -> Self {
        let tokens = TokenService::new(&cfg);
        Self { cfg, store, tokens }
    }

    /// Creates a service backed by the sharded file store under the configured data directory.
    pub fn with_file_store(cfg: Arc<CoreConfig>) -> Self {
        let store = Arc::new(FileAccountStore::new(&cfg));
        Self::new(cfg, store)
    }

    /// Registers a new account and issues its first token.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank username or name, a malformed email, or a short password.
    /// - `AlreadyExists` if the username or email is already registered.
    pub fn register(&self, new: NewAccount) -> AccountResult<AuthSession> {
        let username = NonEmptyText::new(&new.username)
            .map_err(|_| AccountError::InvalidInput("username is required".into()))?;
        let name = NonEmptyText::new(&new.name)
            .map_err(|_| AccountError::InvalidInput("name is required".into()))?;
        let email = EmailAddress::parse(&new.email)
            .map_err(|e| AccountError::InvalidInput(e.to_string()))?;
        check_password_policy(&new.password)?;

        let password_hash = PasswordHash::generate(&new.password, self.cfg.hash_iterations())?;
        let account = Account::new(username, name, email, new.role, password_hash);

        // Username and email uniqueness is checked atomically with the insert.
        self.store
            .insert(&account)
            .map_err(AccountError::update_failed)?;

        tracing::info!(account_id = %account.id, role = %account.role, "account registered");
        self.issue(&account)
    }

    /// Exchanges a username and password for a token.
    ///
    /// An unknown username and a wrong password both fail with `InvalidCredentials`.
    pub fn login(&self, username: &str, password: &str) -> AccountResult<AuthSession> {
        let account = self
            .store
            .find_by_username(username.trim())
            .map_err(AccountError::read_failed)?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.password_matches(&account, password) {
            tracing::warn!(account_id = %account.id, "login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        tracing::info!(account_id = %account.id, "login succeeded");
        self.issue(&account)
    }

    /// Resolves a bearer token to a session.
    ///
    /// A missing, malformed, forged or expired token, or one whose account no longer exists,
    /// fails with `Unauthenticated`.
    pub fn authenticate(&self, bearer: Option<&str>) -> AccountResult<Session> {
        let token = bearer.ok_or(AccountError::Unauthenticated)?;
        let claims = self.tokens.verify(token)?;
        let account = self.load(&claims.sub)?;
        Ok(Session::new(account.view()))
    }

    /// Current stored view of the session's account.
    pub fn profile(&self, session: &Session) -> AccountResult<AccountView> {
        self.load(session.id()).map(|account| account.view())
    }

    /// Applies an allow-listed profile update and returns the full account view.
    ///
    /// # Errors
    ///
    /// `InvalidUpdate` for disallowed keys, ill-typed values, or an email already held by
    /// another account. The email check happens inside the store's save.
    pub fn update_profile(&self, session: &Session, body: Value) -> AccountResult<AccountView> {
        let update = ProfileUpdate::from_body(body).inspect_err(|e| log_rejected(session, e))?;

        let account = self.mutate(session, |account| update.apply(account))?;
        tracing::info!(account_id = %account.id, "profile updated");
        Ok(account.view())
    }

    /// Applies an allow-listed medical-history update. Patients only.
    pub fn update_medical_history(
        &self,
        session: &Session,
        body: Value,
    ) -> AccountResult<MedicalHistory> {
        require_role(session, MEDICAL_HISTORY_ROLES).inspect_err(|e| log_rejected(session, e))?;
        let update =
            MedicalHistoryUpdate::from_body(body).inspect_err(|e| log_rejected(session, e))?;

        let account = self.mutate(session, |account| update.apply(account))?;
        tracing::info!(account_id = %account.id, "medical history updated");
        Ok(account.medical_history)
    }

    /// Applies an allow-listed privacy-settings update.
    pub fn update_privacy_settings(
        &self,
        session: &Session,
        body: Value,
    ) -> AccountResult<PrivacySettings> {
        let update =
            PrivacySettingsUpdate::from_body(body).inspect_err(|e| log_rejected(session, e))?;

        let account = self.mutate(session, |account| update.apply(account))?;
        tracing::info!(account_id = %account.id, "privacy settings updated");
        Ok(account.privacy_settings)
    }

    /// Replaces the password credential after checking the current password.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if `current_password` does not match.
    /// - `InvalidInput` if `new_password` is shorter than the minimum length.
    pub fn change_password(
        &self,
        session: &Session,
        current_password: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        let account = self.load(session.id())?;
        if !self.password_matches(&account, current_password) {
            tracing::warn!(account_id = %account.id, "password change rejected");
            return Err(AccountError::InvalidCredentials);
        }
        check_password_policy(new_password)?;

        let password_hash = PasswordHash::generate(new_password, self.cfg.hash_iterations())?;
        self.mutate(session, |account| account.password_hash = password_hash)?;

        tracing::info!(account_id = %session.id(), "password changed");
        Ok(())
    }

    /// Deletes the session's account. Tokens issued for it stop authenticating.
    pub fn delete_account(&self, session: &Session) -> AccountResult<()> {
        self.delete_by_id(session.id())
    }

    /// Deletes an account by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such account is stored.
    pub fn delete_by_id(&self, id: &AccountId) -> AccountResult<()> {
        self.store.delete(id).map_err(AccountError::update_failed)?;
        tracing::info!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Every stored account, oldest first.
    pub fn list_accounts(&self) -> AccountResult<Vec<AccountView>> {
        let accounts = self.store.list().map_err(AccountError::read_failed)?;
        Ok(accounts.iter().map(AccountView::from).collect())
    }

    fn issue(&self, account: &Account) -> AccountResult<AuthSession> {
        let issued = self.tokens.issue(account)?;
        Ok(AuthSession {
            token: issued.token,
            expires_at: issued.expires_at,
            account: account.view(),
        })
    }

    /// Loads the stored account; an account that vanished is an authentication failure.
    fn load(&self, id: &AccountId) -> AccountResult<Account> {
        self.store
            .get(id)
            .map_err(AccountError::read_failed)?
            .ok_or(AccountError::Unauthenticated)
    }

    /// Read-modify-write of the session's account with exactly one save.
    fn mutate(&self, session: &Session, apply: impl FnOnce(&mut Account)) -> AccountResult<Account> {
        let mut account = self.load(session.id())?;
        apply(&mut account);
        account.updated_at = Utc::now();

        self.store.save(&account).map_err(|e| match e {
            AccountError::NotFound => AccountError::Unauthenticated,
            AccountError::AlreadyExists(detail) => {
                let err = AccountError::InvalidUpdate(detail);
                log_rejected(session, &err);
                err
            }
            other => {
                tracing::error!(account_id = %session.id(), "failed to save account: {other}");
                other.update_failed()
            }
        })?;
        Ok(account)
    }

    fn password_matches(&self, account: &Account, candidate: &str) -> bool {
        match account.password_hash.verify(candidate) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(account_id = %account.id, "cannot verify password: {e}");
                false
            }
        }
    }
}

fn check_password_policy(password: &str) -> AccountResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn log_rejected(session: &Session, err: &AccountError) {
    tracing::warn!(account_id = %session.id(), "update rejected: {err}");
}
