//! Account identifiers and sharded-path utilities.
//!
//! Account documents are stored under sharded directories derived from the account id.
//!
//! To keep path derivation deterministic, identifiers use a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - A small wrapper type ([`AccountId`]) that *guarantees* the canonical format once
//!   constructed.
//! - Shared sharding logic to derive an account's directory from its identifier.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (bearer-token subjects, CLI arguments) must already be
//! canonical; [`AccountId::parse`] rejects hyphenated, uppercase or otherwise malformed input.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, documents live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `telehealth_data/accounts/55/0e/550e8400e29b41d4a716446655440000/`

mod account_id;

pub use account_id::{AccountId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
