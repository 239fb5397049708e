use crate::account::Role;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role {role} is not permitted for this operation")]
    Forbidden { role: Role },
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("account not found")]
    NotFound,

    #[error("failed to read account: {0}")]
    ReadFailed(#[source] Box<AccountError>),
    #[error("failed to update account: {0}")]
    UpdateFailed(#[source] Box<AccountError>),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write account file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read account file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete account directory: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize account: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize account: {0}")]
    Deserialization(serde_json::Error),
    #[error("account store lock poisoned")]
    StorePoisoned,

    #[error("stored password hash is malformed")]
    MalformedPasswordHash,
    #[error("cryptographic primitive failed: {0}")]
    Crypto(String),

    #[error("identifier error: {0}")]
    Uuid(#[from] telehealth_uuid::UuidError),
}

impl AccountError {
    /// Wraps a storage error raised while reading.
    ///
    /// Domain errors pass through unchanged so callers can still match on them.
    pub(crate) fn read_failed(self) -> Self {
        if self.is_storage() && !self.is_wrapped() {
            AccountError::ReadFailed(Box::new(self))
        } else {
            self
        }
    }

    /// Wraps a storage error raised while persisting a mutation.
    pub(crate) fn update_failed(self) -> Self {
        if self.is_storage() && !self.is_wrapped() {
            AccountError::UpdateFailed(Box::new(self))
        } else {
            self
        }
    }

    fn is_wrapped(&self) -> bool {
        matches!(
            self,
            AccountError::ReadFailed(_) | AccountError::UpdateFailed(_)
        )
    }

    /// True for failures of the underlying store rather than of the request.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AccountError::StorageDirCreation(_)
                | AccountError::FileWrite(_)
                | AccountError::FileRead(_)
                | AccountError::FileDelete(_)
                | AccountError::Serialization(_)
                | AccountError::Deserialization(_)
                | AccountError::StorePoisoned
                | AccountError::ReadFailed(_)
                | AccountError::UpdateFailed(_)
        )
    }
}

pub type AccountResult<T> = std::result::Result<T, AccountError>;
