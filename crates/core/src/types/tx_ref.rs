//! Payment transaction references.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::OrderId;

/// A string correlating a payment record with a provider transaction.
///
/// References are either supplied by the caller (or server) or synthesized
/// locally as `TX-<first 8 order-id chars>-<epoch millis>`, which is unique
/// enough without a round trip to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    /// Prefix of locally synthesized references.
    pub const PREFIX: &'static str = "TX";

    /// Wrap an existing reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Synthesize a reference for `order` at the given instant.
    #[must_use]
    pub fn generate(order: OrderId, at: DateTime<Utc>) -> Self {
        let short: String = order.to_string().chars().take(8).collect();
        Self(format!(
            "{}-{short}-{}",
            Self::PREFIX,
            at.timestamp_millis()
        ))
    }

    /// Synthesize a reference for `order` now.
    #[must_use]
    pub fn generate_now(order: OrderId) -> Self {
        Self::generate(order, Utc::now())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TxRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
