//! Token lifecycle: login, proactive refresh and logout.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::instrument;
use tz_materials_core::{AuthResponse, Session, Tokens, User};

use super::AuthError;
use super::timer::RefreshTimer;
use super::token::{TokenError, access_token_expiry};
use crate::api::{AcceptInvitationRequest, AuthApi, LoginRequest, RegisterRequest};
use crate::session::SessionStore;

/// Owns the token pair and keeps the access token fresh.
///
/// A refresh is armed for `refresh_lead` before each access token's expiry.
/// Concurrent refreshes collapse into one network call. Every failure path
/// (undecodable token, rejected refresh, missing refresh token) ends in a full
/// logout; only login, register and invitation acceptance return errors.
pub struct TokenManager<A> {
    inner: Arc<TokenManagerInner<A>>,
}

struct TokenManagerInner<A> {
    api: A,
    session: SessionStore,
    refresh_lead: Duration,
    refresh_lock: Mutex<()>,
    timer: RefreshTimer,
}

impl<A> Clone for TokenManager<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AuthApi + 'static> TokenManager<A> {
    /// Create a manager over `session`. Nothing is scheduled until
    /// [`resume`](Self::resume) or a login.
    #[must_use]
    pub fn new(api: A, session: SessionStore, refresh_lead: Duration) -> Self {
        Self {
            inner: Arc::new(TokenManagerInner {
                api,
                session,
                refresh_lead,
                refresh_lock: Mutex::new(()),
                timer: RefreshTimer::new(),
            }),
        }
    }

    /// The session store this manager writes to.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// The API this manager authenticates against.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// The present token pair, if logged in. Never blocks on I/O.
    #[must_use]
    pub fn current_tokens(&self) -> Option<Tokens> {
        self.inner.session.current_tokens()
    }

    /// When the next proactive refresh fires, if one is armed.
    #[must_use]
    pub fn next_refresh_at(&self) -> Option<tokio::time::Instant> {
        self.inner.timer.deadline()
    }

    /// Log in with phone and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` if the backend rejects the credentials, or
    /// `AuthError::InvalidToken` if it issues an access token without a
    /// readable expiry.
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn login(&self, request: &LoginRequest) -> Result<User, AuthError> {
        let response = self.inner.api.login(request).await?;
        self.establish(response).await
    }

    /// Create an account and log it in.
    ///
    /// # Errors
    ///
    /// As for [`login`](Self::login).
    #[instrument(skip(self, request), fields(phone = %request.phone))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, AuthError> {
        let response = self.inner.api.register(request).await?;
        self.establish(response).await
    }

    /// Accept a seller-team invitation and log the new member in.
    ///
    /// # Errors
    ///
    /// As for [`login`](Self::login).
    #[instrument(skip(self, request))]
    pub async fn accept_invitation(
        &self,
        request: &AcceptInvitationRequest,
    ) -> Result<User, AuthError> {
        let response = self.inner.api.accept_invitation(request).await?;
        self.establish(response).await
    }

    /// Re-arm the refresh schedule for a persisted session.
    ///
    /// If the access token is already due the refresh runs before this
    /// returns. Returns whether a session survives.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> bool {
        let Some(tokens) = self.current_tokens() else {
            return false;
        };
        self.schedule(&tokens.access).await;
        self.inner.session.access_token().is_some()
    }

    /// Clear the session and cancel any pending refresh. Idempotent.
    pub fn logout(&self) {
        self.inner.timer.cancel();
        if let Err(e) = self.inner.session.clear() {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
        tracing::info!("Logged out");
    }

    /// Renew the access token.
    ///
    /// Callers arriving while a refresh is in flight wait for it instead of
    /// issuing their own request. Failures log out.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let _guard = loop {
            let before = self.current_tokens();
            if let Ok(guard) = self.inner.refresh_lock.try_lock() {
                break guard;
            }
            tracing::debug!("Refresh already in flight, waiting");
            drop(self.inner.refresh_lock.lock().await);
            let after = self.current_tokens();
            if after.is_none() || after != before {
                return;
            }
            // The finished refresh served a session that has since been replaced.
        };

        let Some(tokens) = self.current_tokens().filter(|t| !t.refresh.is_empty()) else {
            tracing::warn!("No refresh token available, logging out");
            self.logout();
            return;
        };

        match self.inner.api.refresh(&tokens.refresh).await {
            Ok(response) => {
                match self
                    .inner
                    .session
                    .update_access(&tokens.refresh, &response.access)
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!("Session replaced during refresh, discarding token");
                        return;
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to persist refreshed session"),
                }
                match self.plan(&response.access) {
                    Ok(delay) => self.arm(delay),
                    Err(e) => {
                        tracing::warn!(error = %e, "Refreshed access token unreadable, logging out");
                        self.logout();
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, logging out");
                self.logout();
            }
        }
    }

    async fn establish(&self, response: AuthResponse) -> Result<User, AuthError> {
        let AuthResponse { user, tokens } = response;
        let access = tokens.access.clone();
        self.inner
            .session
            .set(Session::authenticated(user.clone(), tokens))?;

        let delay = match self.plan(&access) {
            Ok(delay) => delay,
            Err(e) => {
                tracing::warn!(error = %e, "Issued access token unreadable, logging out");
                self.logout();
                return Err(e.into());
            }
        };

        if delay.is_zero() {
            self.refresh().await;
        } else {
            self.arm(delay);
        }
        tracing::info!(user_id = %user.id, role = %user.role, "Logged in");
        Ok(user)
    }

    async fn schedule(&self, access: &str) {
        match self.plan(access) {
            Ok(delay) if delay.is_zero() => self.refresh().await,
            Ok(delay) => self.arm(delay),
            Err(e) => {
                tracing::warn!(error = %e, "Access token unreadable, logging out");
                self.logout();
            }
        }
    }

    /// Time until `access` should be refreshed; zero when already due.
    fn plan(&self, access: &str) -> Result<Duration, TokenError> {
        let expiry = access_token_expiry(access)?;
        let lead = TimeDelta::from_std(self.inner.refresh_lead).unwrap_or(TimeDelta::MAX);
        let due = expiry
            .checked_sub_signed(lead)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        Ok((due - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    fn arm(&self, delay: Duration) {
        tracing::debug!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Refresh scheduled"
        );
        let weak = Arc::downgrade(&self.inner);
        self.inner.timer.arm(delay, move |generation| async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.timer.release(generation) {
                Self { inner }.refresh().await;
            }
        });
    }
}

impl<A> std::fmt::Debug for TokenManager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("session", &self.inner.session)
            .field("refresh_lead", &self.inner.refresh_lead)
            .field("next_refresh_at", &self.inner.timer.deadline())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use tokio::time::Instant;
    use tz_materials_core::{Phone, RefreshResponse, UserId, UserRole};

    use super::*;
    use crate::auth::token::tests::token_expiring_at;
    use crate::error::ApiError;
    use crate::session::SESSION_KEY;
    use crate::storage::{MemoryStorage, Storage};

    const LEAD: Duration = Duration::from_secs(30);

    fn in_secs(secs: i64) -> String {
        token_expiring_at(Utc::now().timestamp() + secs)
    }

    fn user() -> User {
        User {
            id: UserId::random(),
            full_name: "Rehema Kimaro".to_string(),
            phone: Phone::parse("+255712345678").unwrap(),
            email: Some("rehema@example.com".to_string()),
            role: UserRole::Buyer,
            kyc_status: "pending".to_string(),
        }
    }

    /// Hands out `issued` on login and `refreshed` (or a 401) on refresh.
    struct FakeAuth {
        issued: String,
        refreshed: std::sync::Mutex<Option<String>>,
        refresh_delay: Duration,
        refresh_calls: AtomicUsize,
        refresh_tokens: std::sync::Mutex<Vec<String>>,
    }

    impl FakeAuth {
        fn new(issued: String, refreshed: Option<String>) -> Self {
            Self {
                issued,
                refreshed: std::sync::Mutex::new(refreshed),
                refresh_delay: Duration::ZERO,
                refresh_calls: AtomicUsize::new(0),
                refresh_tokens: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }

        fn refreshed_with(&self) -> Vec<String> {
            self.refresh_tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthApi for Arc<FakeAuth> {
        async fn register(&self, _: &RegisterRequest) -> Result<AuthResponse, ApiError> {
            self.login(&login_request()).await
        }

        async fn login(&self, _: &LoginRequest) -> Result<AuthResponse, ApiError> {
            Ok(AuthResponse {
                user: user(),
                tokens: Tokens::new(self.issued.clone(), "refresh-1"),
            })
        }

        async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
            self.refresh_tokens
                .lock()
                .unwrap()
                .push(refresh_token.to_string());
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }
            match self.refreshed.lock().unwrap().clone() {
                Some(access) => Ok(RefreshResponse { access }),
                None => Err(ApiError::from_status(
                    StatusCode::UNAUTHORIZED,
                    r#"{"detail": "Token is invalid or expired"}"#,
                )),
            }
        }

        async fn accept_invitation(
            &self,
            _: &AcceptInvitationRequest,
        ) -> Result<AuthResponse, ApiError> {
            self.login(&login_request()).await
        }
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            phone: "+255712345678".to_string(),
            password: SecretString::from("pw".to_string()),
        }
    }

    fn manager(fake: &Arc<FakeAuth>) -> (TokenManager<Arc<FakeAuth>>, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let session = SessionStore::load(Arc::clone(&storage));
        (TokenManager::new(Arc::clone(fake), session, LEAD), storage)
    }

    fn assert_armed_in(manager: &TokenManager<Arc<FakeAuth>>, expected: Duration) {
        let at = manager.next_refresh_at().expect("refresh armed");
        let delay = at - Instant::now();
        let tolerance = Duration::from_millis(1500);
        assert!(
            delay + tolerance >= expected && delay <= expected + tolerance,
            "armed in {delay:?}, expected about {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_arms_refresh_before_expiry() {
        let fake = Arc::new(FakeAuth::new(in_secs(60), Some(in_secs(3600))));
        let (manager, _) = manager(&fake);

        manager.login(&login_request()).await.unwrap();

        assert!(manager.current_tokens().is_some());
        assert_armed_in(&manager, Duration::from_secs(30));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refreshes_and_rearms() {
        let fresh = in_secs(3600);
        let fake = Arc::new(FakeAuth::new(in_secs(60), Some(fresh.clone())));
        let (manager, storage) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(fake.calls(), 1);
        let tokens = manager.current_tokens().unwrap();
        assert_eq!(tokens.access, fresh);
        assert_eq!(tokens.refresh, "refresh-1");
        assert!(storage.get(SESSION_KEY).unwrap().unwrap().contains(&fresh));
        assert_armed_in(&manager, Duration::from_secs(3600 - 31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_collapse() {
        let mut fake = FakeAuth::new(in_secs(600), Some(in_secs(3600)));
        fake.refresh_delay = Duration::from_secs(1);
        let fake = Arc::new(fake);
        let (manager, _) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        tokio::join!(manager.refresh(), manager.refresh());

        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_finishing_after_relogin_is_discarded() {
        let stale = in_secs(3600);
        let mut fake = FakeAuth::new(in_secs(600), Some(stale.clone()));
        fake.refresh_delay = Duration::from_secs(5);
        let fake = Arc::new(fake);
        let (manager, storage) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        let next = in_secs(600);
        let relogin = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            manager.logout();
            manager
                .session()
                .set(Session::authenticated(
                    user(),
                    Tokens::new(next.clone(), "refresh-B"),
                ))
                .unwrap();
        };
        tokio::join!(manager.refresh(), relogin);

        assert_eq!(fake.refreshed_with(), ["refresh-1"]);
        assert_eq!(
            manager.current_tokens().unwrap(),
            Tokens::new(next, "refresh-B")
        );
        assert!(!storage.get(SESSION_KEY).unwrap().unwrap().contains(&stale));
        assert!(manager.next_refresh_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_refreshes_replacement_session_itself() {
        let refreshed = in_secs(3600);
        let mut fake = FakeAuth::new(in_secs(600), Some(refreshed.clone()));
        fake.refresh_delay = Duration::from_secs(5);
        let fake = Arc::new(fake);
        let (manager, _) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        let relogin = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            manager.logout();
            manager
                .session()
                .set(Session::authenticated(
                    user(),
                    Tokens::new(in_secs(10), "refresh-B"),
                ))
                .unwrap();
            manager.refresh().await;
        };
        tokio::join!(manager.refresh(), relogin);

        assert_eq!(fake.refreshed_with(), ["refresh-1", "refresh-B"]);
        assert_eq!(
            manager.current_tokens().unwrap(),
            Tokens::new(refreshed, "refresh-B")
        );
        assert!(manager.next_refresh_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_issued_token_fails_closed() {
        let fake = Arc::new(FakeAuth::new("garbage".to_string(), None));
        let (manager, storage) = manager(&fake);

        let err = manager.login(&login_request()).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert!(manager.current_tokens().is_none());
        assert!(manager.next_refresh_at().is_none());
        assert!(storage.get(SESSION_KEY).unwrap().is_none());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_with_malformed_token_logs_out() {
        let fake = Arc::new(FakeAuth::new(in_secs(600), Some(in_secs(3600))));
        let (manager, storage) = manager(&fake);
        manager
            .session()
            .set(Session::authenticated(user(), Tokens::new("not.a.jwt", "refresh-1")))
            .unwrap();

        assert!(!manager.resume().await);
        assert!(manager.current_tokens().is_none());
        assert!(storage.get(SESSION_KEY).unwrap().is_none());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_refreshes_due_token_before_returning() {
        let fresh = in_secs(3600);
        let fake = Arc::new(FakeAuth::new(in_secs(600), Some(fresh.clone())));
        let (manager, _) = manager(&fake);
        manager
            .session()
            .set(Session::authenticated(user(), Tokens::new(in_secs(10), "refresh-1")))
            .unwrap();

        assert!(manager.resume().await);
        assert_eq!(fake.calls(), 1);
        assert_eq!(manager.current_tokens().unwrap().access, fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_logs_out() {
        let fake = Arc::new(FakeAuth::new(in_secs(60), None));
        let (manager, storage) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(fake.calls(), 1);
        assert!(manager.current_tokens().is_none());
        assert!(manager.next_refresh_at().is_none());
        assert!(storage.get(SESSION_KEY).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_without_refresh_token_logs_out() {
        let fake = Arc::new(FakeAuth::new(in_secs(600), Some(in_secs(3600))));
        let (manager, _) = manager(&fake);
        manager
            .session()
            .set(Session::authenticated(user(), Tokens::new(in_secs(600), "")))
            .unwrap();

        manager.refresh().await;

        assert_eq!(fake.calls(), 0);
        assert!(manager.current_tokens().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_idempotent_and_disarms() {
        let fake = Arc::new(FakeAuth::new(in_secs(60), Some(in_secs(3600))));
        let (manager, _) = manager(&fake);
        manager.login(&login_request()).await.unwrap();

        manager.logout();
        manager.logout();

        assert!(manager.current_tokens().is_none());
        assert!(manager.next_refresh_at().is_none());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_login_replaces_armed_refresh() {
        let fake = Arc::new(FakeAuth::new(in_secs(60), Some(in_secs(3600))));
        let (manager, _) = manager(&fake);
        manager.login(&login_request()).await.unwrap();
        assert_armed_in(&manager, Duration::from_secs(30));

        // Second login with a longer-lived token.
        let manager_b = manager.clone();
        manager_b
            .establish(AuthResponse {
                user: user(),
                tokens: Tokens::new(in_secs(600), "refresh-1"),
            })
            .await
            .unwrap();
        assert_armed_in(&manager, Duration::from_secs(570));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.calls(), 0, "the first timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_manager_cancels_timer() {
        let fake = Arc::new(FakeAuth::new(in_secs(60), Some(in_secs(3600))));
        let (manager, _) = manager(&fake);
        manager.login(&login_request()).await.unwrap();
        drop(manager);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fake.calls(), 0);
    }
}
