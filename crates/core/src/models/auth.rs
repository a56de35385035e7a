//! Accounts, tokens and the persisted session record.

use serde::{Deserialize, Serialize};

use crate::types::{Phone, UserId, UserRole};

/// A marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub phone: Phone,
    pub email: Option<String>,
    pub role: UserRole,
    /// Know-your-customer review state (`pending` until ops review).
    pub kyc_status: String,
}

/// Access/refresh token pair.
///
/// The access token is a JWT whose `exp` claim drives refresh scheduling.
/// Implements `Debug` manually to redact both tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

impl Tokens {
    /// Create a token pair.
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Replace the access token, keeping the refresh token.
    #[must_use]
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: self.refresh.clone(),
        }
    }
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// The persisted session record: `{ user, tokens }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub tokens: Option<Tokens>,
}

impl Session {
    /// A session for a freshly authenticated user.
    #[must_use]
    pub const fn authenticated(user: User, tokens: Tokens) -> Self {
        Self {
            user: Some(user),
            tokens: Some(tokens),
        }
    }

    /// Whether an access token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tokens.as_ref().is_some_and(|t| !t.access.is_empty())
    }
}

/// Body returned by register, login and invitation acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: Tokens,
}

/// Body returned by the refresh endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}
