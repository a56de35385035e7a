//! The persisted session record.
//!
//! [`SessionStore`] keeps the current `{ user, tokens }` in memory and mirrors
//! every change to storage under [`SESSION_KEY`]. Reads never touch storage.

use std::sync::{Arc, PoisonError, RwLock};

use tz_materials_core::{Session, Tokens, User};

use crate::storage::{Storage, StorageError, load_json, save_json};

/// Storage key of the session record.
pub const SESSION_KEY: &str = "tz-materials-auth";

/// Shared handle to the session record.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn Storage>,
    session: RwLock<Session>,
}

impl SessionStore {
    /// Load the persisted session. A missing or unreadable record yields an
    /// empty session.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let session = match load_json::<Session>(storage.as_ref(), SESSION_KEY) {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session record");
                Session::default()
            }
        };

        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                session: RwLock::new(session),
            }),
        }
    }

    /// A copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// The current token pair, if logged in.
    #[must_use]
    pub fn current_tokens(&self) -> Option<Tokens> {
        self.read().tokens.clone()
    }

    /// The current access token, if logged in.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read()
            .tokens
            .as_ref()
            .map(|tokens| tokens.access.clone())
            .filter(|access| !access.is_empty())
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Replace the session and persist it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written. The in-memory
    /// session is updated regardless.
    pub fn set(&self, session: Session) -> Result<(), StorageError> {
        let mut current = self.write();
        *current = session;
        save_json(self.inner.storage.as_ref(), SESSION_KEY, &*current)
    }

    /// Replace the access token minted from `refresh`, keeping the refresh
    /// token, and persist.
    ///
    /// Returns `Ok(false)` without writing when there is no session or the
    /// session no longer holds `refresh` (it was replaced while the refresh
    /// was in flight).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    pub fn update_access(&self, refresh: &str, access: &str) -> Result<bool, StorageError> {
        let mut current = self.write();
        let Some(tokens) = current.tokens.as_ref().filter(|t| t.refresh == refresh) else {
            return Ok(false);
        };
        current.tokens = Some(tokens.with_access(access));
        save_json(self.inner.storage.as_ref(), SESSION_KEY, &*current)?;
        Ok(true)
    }

    /// Drop the session and remove the persisted record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be removed. The in-memory
    /// session is cleared regardless.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.write();
        *current = Session::default();
        self.inner.storage.remove(SESSION_KEY)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.read();
        f.debug_struct("SessionStore")
            .field("user", &session.user.as_ref().map(|u| u.id))
            .field("authenticated", &session.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tz_materials_core::{Phone, UserId, UserRole};

    use super::*;
    use crate::storage::MemoryStorage;

    fn user() -> User {
        User {
            id: UserId::random(),
            full_name: "Juma Said".to_string(),
            phone: Phone::parse("+255 712 000 111").unwrap(),
            email: None,
            role: UserRole::Buyer,
            kyc_status: "pending".to_string(),
        }
    }

    #[test]
    fn test_load_empty_storage() {
        let store = SessionStore::load(Arc::new(MemoryStorage::new()));
        assert!(store.current_tokens().is_none());
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_corrupt_record_loads_as_logged_out() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_KEY, "not json").unwrap();
        let store = SessionStore::load(storage);
        assert_eq!(store.snapshot(), Session::default());
    }

    #[test]
    fn test_set_persists_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(Arc::clone(&storage));
        store
            .set(Session::authenticated(user(), Tokens::new("acc", "ref")))
            .unwrap();

        let reloaded = SessionStore::load(storage);
        assert_eq!(reloaded.access_token().as_deref(), Some("acc"));
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[test]
    fn test_update_access_keeps_refresh() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(Arc::clone(&storage));
        store
            .set(Session::authenticated(user(), Tokens::new("old", "ref")))
            .unwrap();

        assert!(store.update_access("ref", "new").unwrap());
        let tokens = store.current_tokens().unwrap();
        assert_eq!(tokens.access, "new");
        assert_eq!(tokens.refresh, "ref");

        let persisted: Session = load_json(storage.as_ref(), SESSION_KEY).unwrap().unwrap();
        assert_eq!(persisted.tokens.unwrap().access, "new");
    }

    #[test]
    fn test_update_access_without_session_is_noop() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(Arc::clone(&storage));
        assert!(!store.update_access("ref", "new").unwrap());
        assert!(storage.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn test_update_access_for_replaced_session_is_noop() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(Arc::clone(&storage));
        store
            .set(Session::authenticated(user(), Tokens::new("acc-b", "ref-b")))
            .unwrap();

        assert!(!store.update_access("ref-a", "minted-from-a").unwrap());
        assert_eq!(store.current_tokens().unwrap(), Tokens::new("acc-b", "ref-b"));
        let persisted: Session = load_json(storage.as_ref(), SESSION_KEY).unwrap().unwrap();
        assert_eq!(persisted.tokens.unwrap().access, "acc-b");
    }

    #[test]
    fn test_clear_removes_record() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SessionStore::load(Arc::clone(&storage));
        store
            .set(Session::authenticated(user(), Tokens::new("a", "r")))
            .unwrap();
        store.clear().unwrap();
        assert!(store.current_tokens().is_none());
        assert!(storage.get(SESSION_KEY).unwrap().is_none());
    }
}
