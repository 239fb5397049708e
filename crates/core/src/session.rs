//! Authenticated sessions and the role gate.

use crate::account::{AccountView, Role};
use crate::{AccountError, AccountId, AccountResult};

/// Roles allowed to change the medical history.
pub const MEDICAL_HISTORY_ROLES: &[Role] = &[Role::Patient];

/// The caller of a request, resolved from a bearer token.
///
/// Holds the password-stripped view of the account as it was when the token was checked.
#[derive(Clone, Debug)]
pub struct Session {
    account: AccountView,
}

impl Session {
    pub fn new(account: AccountView) -> Self {
        Self { account }
    }

    pub fn id(&self) -> &AccountId {
        &self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }

    pub fn account(&self) -> &AccountView {
        &self.account
    }

    pub fn into_account(self) -> AccountView {
        self.account
    }
}

/// Permits the session iff its role is in `allowed`.
pub fn require_role(session: &Session, allowed: &[Role]) -> AccountResult<()> {
    if allowed.contains(&session.role()) {
        Ok(())
    } else {
        Err(AccountError::Forbidden {
            role: session.role(),
        })
    }
}
