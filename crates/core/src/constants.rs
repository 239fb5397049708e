//! Constants used throughout the telehealth core crate.
//!
//! Path names, defaults and policy values live here so the store, config and services agree.

/// Default directory for account storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "telehealth_data";

/// Directory name (under the data directory) for account documents.
pub const ACCOUNTS_DIR_NAME: &str = "accounts";

/// Filename of the JSON document inside each account directory.
pub const ACCOUNT_FILENAME: &str = "account.json";

/// Default bearer-token lifetime in seconds (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Default PBKDF2 iteration count for password hashing.
pub const DEFAULT_HASH_ITERATIONS: u32 = 10_000;

/// Minimum accepted length (in bytes) of the token signing secret.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Minimum accepted password length (in characters).
pub const MIN_PASSWORD_LEN: usize = 6;
