//! In-memory connection code registry.

use super::errors::{PairingError, PairingResult};
use super::models::Identity;
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// A live, unredeemed connection code.
#[derive(Debug, Clone)]
struct CodeEntry {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

/// Registry of live connection codes.
///
/// Holds the mapping `code -> (identity, expires_at)` shared by the
/// registration handler, the redemption handler, and the expiry sweeper.
/// Cloning is cheap; all clones share the same underlying map.
///
/// Entries leave the registry in exactly one of three ways: a successful
/// redemption, a redemption attempt that finds the entry expired, or a
/// sweeper pass. Redemption removes the entry and checks expiry under a
/// single write lock, so two concurrent redemptions of the same code can
/// never both succeed.
#[derive(Clone)]
pub struct CodeRegistry {
    codes: Arc<RwLock<HashMap<String, CodeEntry>>>,
}

impl CodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection code for `identity`, valid for `ttl_seconds`.
    ///
    /// Returns the computed expiry timestamp. There is no uniqueness check:
    /// re-registering a live code silently replaces the previous entry
    /// (last write wins). The registry does not cap `ttl_seconds`; callers
    /// are expected to. A non-positive TTL produces an entry that is
    /// already expired and can never be redeemed.
    pub async fn register(
        &self,
        code: &str,
        identity: Identity,
        ttl_seconds: i64,
    ) -> DateTime<Utc> {
        self.register_at(Utc::now(), code, identity, ttl_seconds)
            .await
    }

    async fn register_at(
        &self,
        now: DateTime<Utc>,
        code: &str,
        identity: Identity,
        ttl_seconds: i64,
    ) -> DateTime<Utc> {
        let expires_at = now + Duration::seconds(ttl_seconds);
        let entry = CodeEntry {
            identity,
            expires_at,
        };

        let mut codes = self.codes.write().await;
        if let Some(previous) = codes.insert(code.to_string(), entry) {
            log::debug!(
                "connection code re-registered, replacing entry for {}",
                previous.identity.username
            );
        }
        expires_at
    }

    /// Redeem a connection code, consuming it.
    ///
    /// # Errors
    ///
    /// * `PairingError::CodeNotFound` - code was never registered or is
    ///   already consumed
    /// * `PairingError::CodeExpired` - TTL elapsed; the entry is removed on
    ///   this path too, so a retry reports `CodeNotFound`
    pub async fn redeem(&self, code: &str) -> PairingResult<Identity> {
        self.redeem_at(Utc::now(), code).await
    }

    async fn redeem_at(&self, now: DateTime<Utc>, code: &str) -> PairingResult<Identity> {
        let mut codes = self.codes.write().await;

        // Remove first: the entry must be gone whether redemption succeeds
        // or turns out to be expired.
        let entry = codes.remove(code).ok_or(PairingError::CodeNotFound)?;
        if entry.expires_at <= now {
            return Err(PairingError::CodeExpired);
        }
        Ok(entry.identity)
    }

    /// Number of live entries, exposed for diagnostics.
    pub async fn size(&self) -> usize {
        self.codes.read().await.len()
    }

    /// Remove every entry whose expiry has passed, returning the count removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, entry| entry.expires_at > now);
        before - codes.len()
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
