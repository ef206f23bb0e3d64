// Credential store: the owned session record and its persisted copy

use std::sync::{Arc, PoisonError, RwLock};

use super::storage::SessionStorage;
use super::types::{SessionRecord, TokenPair, UserInfo};
use crate::error::StorageError;

/// Storage key for the raw access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the raw refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the serialized session record
pub const AUTH_KEY: &str = "auth";

/// Process-wide session state.
///
/// The in-memory record is the primary copy; storage is only ever written
/// from it, so the three persisted entries always agree with each other and
/// with memory after a successful mutation.
pub struct CredentialStore {
    storage: Arc<dyn SessionStorage>,
    record: RwLock<SessionRecord>,
}

impl CredentialStore {
    /// Create a store and load whatever session the storage holds
    pub fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let store = Self {
            storage,
            record: RwLock::new(SessionRecord::anonymous()),
        };
        store.load();
        store
    }

    /// Reload the record from storage.
    /// Never fails: unreadable or unparsable storage means "no session".
    pub fn load(&self) -> SessionRecord {
        let record = self.read_persisted().normalized();
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = record.clone();
        record
    }

    fn read_persisted(&self) -> SessionRecord {
        match self.storage.get(AUTH_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionRecord>(&raw) {
                Ok(record) => return record,
                Err(e) => {
                    tracing::warn!("Stored session record is unreadable, starting anonymous: {}", e);
                    return SessionRecord::anonymous();
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to read session storage, starting anonymous: {}", e);
                return SessionRecord::anonymous();
            }
        }

        // No combined record; pick up loose tokens if a previous run left any
        SessionRecord {
            access_token: self.storage.get(ACCESS_TOKEN_KEY).ok().flatten(),
            refresh_token: self.storage.get(REFRESH_TOKEN_KEY).ok().flatten(),
            ..SessionRecord::anonymous()
        }
    }

    /// Replace the session with `record` in memory and in storage
    pub fn save(&self, record: SessionRecord) -> Result<SessionRecord, StorageError> {
        let record = record.normalized();
        let mut current = self.record.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&record)?;
        *current = record.clone();
        Ok(record)
    }

    /// Replace both tokens, keeping the user
    pub fn update_tokens(&self, tokens: &TokenPair) -> Result<SessionRecord, StorageError> {
        let mut current = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let record = current.clone().with_tokens(tokens);
        self.persist(&record)?;
        *current = record.clone();
        Ok(record)
    }

    /// Drop the session. Memory is reset even when the storage write fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.record.write().unwrap_or_else(PoisonError::into_inner);
        *current = SessionRecord::anonymous();
        self.storage.write_batch(&[
            (AUTH_KEY, None),
            (ACCESS_TOKEN_KEY, None),
            (REFRESH_TOKEN_KEY, None),
        ])
    }

    // Caller holds the write lock and assigns memory only after this succeeds.
    fn persist(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(record)?;
        self.storage.write_batch(&[
            (AUTH_KEY, Some(serialized.as_str())),
            (ACCESS_TOKEN_KEY, record.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, record.refresh_token.as_deref()),
        ])
    }

    pub fn snapshot(&self) -> SessionRecord {
        self.record.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_info
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated
    }
}
