//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables;
//! binaries parse the raw values with the `*_from_env_value` helpers below and build a
//! [`CoreConfig`] that is shared behind an `Arc`.

use crate::constants::{
    ACCOUNTS_DIR_NAME, DEFAULT_DATA_DIR, DEFAULT_HASH_ITERATIONS, DEFAULT_TOKEN_TTL_SECS,
    MIN_TOKEN_SECRET_LEN,
};
use crate::{AccountError, AccountResult};
use chrono::Duration;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone)]
pub struct CoreConfig {
    data_dir: PathBuf,
    token_secret: Vec<u8>,
    token_ttl: Duration,
    hash_iterations: u32,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("token_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("hash_iterations", &self.hash_iterations)
            .finish()
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidInput` if the token secret is shorter than
    /// [`MIN_TOKEN_SECRET_LEN`] bytes, the token lifetime is not positive, or the hash
    /// iteration count is zero.
    pub fn new(
        data_dir: PathBuf,
        token_secret: impl Into<Vec<u8>>,
        token_ttl: Duration,
        hash_iterations: u32,
    ) -> AccountResult<Self> {
        let token_secret = token_secret.into();
        if token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(AccountError::InvalidInput(format!(
                "token secret must be at least {MIN_TOKEN_SECRET_LEN} bytes"
            )));
        }
        if token_ttl <= Duration::zero() {
            return Err(AccountError::InvalidInput(
                "token lifetime must be positive".into(),
            ));
        }
        if hash_iterations == 0 {
            return Err(AccountError::InvalidInput(
                "hash iterations must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            token_secret,
            token_ttl,
            hash_iterations,
        })
    }

    /// Build a `CoreConfig` from raw environment values.
    ///
    /// Binaries call this once at startup with `std::env::var(..).ok()` for
    /// `TELEHEALTH_DATA_DIR`, `TELEHEALTH_TOKEN_SECRET`, `TELEHEALTH_TOKEN_TTL_SECS` and
    /// `TELEHEALTH_HASH_ITERATIONS`.
    pub fn from_env_values(
        data_dir: Option<String>,
        token_secret: Option<String>,
        token_ttl_secs: Option<String>,
        hash_iterations: Option<String>,
    ) -> AccountResult<Self> {
        Self::new(
            data_dir_from_env_value(data_dir),
            token_secret_from_env_value(token_secret)?,
            token_ttl_from_env_value(token_ttl_secs)?,
            hash_iterations_from_env_value(hash_iterations)?,
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn accounts_dir(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_DIR_NAME)
    }

    pub fn token_secret(&self) -> &[u8] {
        &self.token_secret
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn hash_iterations(&self) -> u32 {
        self.hash_iterations
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the data directory from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()))
}

/// Parse the token signing secret from an optional string value.
///
/// The secret has no default; a missing or blank value is an error.
pub fn token_secret_from_env_value(value: Option<String>) -> AccountResult<Vec<u8>> {
    non_blank(value)
        .map(String::into_bytes)
        .ok_or_else(|| AccountError::InvalidInput("TELEHEALTH_TOKEN_SECRET must be set".into()))
}

/// Parse the token lifetime (in seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default lifetime.
pub fn token_ttl_from_env_value(value: Option<String>) -> AccountResult<Duration> {
    let secs = match non_blank(value) {
        Some(v) => v.parse::<i64>().map_err(|_| {
            AccountError::InvalidInput(format!("token lifetime is not a whole number: {v}"))
        })?,
        None => DEFAULT_TOKEN_TTL_SECS,
    };

    Duration::try_seconds(secs)
        .ok_or_else(|| AccountError::InvalidInput(format!("token lifetime out of range: {secs}")))
}

/// Parse the PBKDF2 iteration count from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default count.
pub fn hash_iterations_from_env_value(value: Option<String>) -> AccountResult<u32> {
    match non_blank(value) {
        Some(v) => v.parse::<u32>().map_err(|_| {
            AccountError::InvalidInput(format!("hash iterations is not a whole number: {v}"))
        }),
        None => Ok(DEFAULT_HASH_ITERATIONS),
    }
}
