use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::FcmError;

/// A token is refreshed once it is this close to expiring
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Access token as returned by the OAuth2 token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

/// Source of short-lived bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, FcmError>;
}

/// OAuth2 Token Cache
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn issued(token: AccessToken, now: DateTime<Utc>) -> Result<Self, FcmError> {
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                FcmError::Authentication(format!("invalid expires_in {}", token.expires_in))
            })?;

        Ok(Self {
            access_token: token.access_token,
            expires_at,
        })
    }

    /// True when the token expires within the refresh margin of `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Keeps one bearer token fresh for a client.
///
/// The `{token, expiry}` pair is swapped under a single lock. The lock is
/// never held across the provider call, so two callers may refresh at the
/// same time; the provider is idempotent and the last write wins.
pub struct TokenManager {
    provider: Arc<dyn TokenProvider>,
    cache: Mutex<CachedToken>,
}

impl TokenManager {
    /// Fetch the initial token unconditionally
    pub async fn new(provider: Arc<dyn TokenProvider>) -> Result<Self, FcmError> {
        let token = fetch(provider.as_ref()).await?;
        let cached = CachedToken::issued(token, Utc::now())?;

        info!(expires_at = %cached.expires_at, "Obtained initial FCM access token");

        Ok(Self {
            provider,
            cache: Mutex::new(cached),
        })
    }

    /// Return a token that stays valid for at least the refresh margin
    pub async fn ensure_fresh(&self) -> Result<String, FcmError> {
        {
            let cached = self.cache.lock();
            if !cached.needs_refresh(Utc::now()) {
                debug!(expires_at = %cached.expires_at, "Using cached FCM access token");
                return Ok(cached.access_token.clone());
            }
        }

        self.refresh().await
    }

    /// Unconditionally replace the cached token
    pub async fn refresh(&self) -> Result<String, FcmError> {
        let token = fetch(self.provider.as_ref()).await?;
        let fresh = CachedToken::issued(token, Utc::now())?;
        let access_token = fresh.access_token.clone();

        info!(expires_at = %fresh.expires_at, "Refreshed FCM access token");
        *self.cache.lock() = fresh;

        Ok(access_token)
    }

    /// Snapshot of the cached credential
    pub fn current(&self) -> CachedToken {
        self.cache.lock().clone()
    }
}

async fn fetch(provider: &dyn TokenProvider) -> Result<AccessToken, FcmError> {
    provider.fetch_token().await.map_err(|e| {
        warn!(error = %e, "FCM access token request failed");
        match e {
            FcmError::Authentication(_) => e,
            other => FcmError::Authentication(other.to_string()),
        }
    })
}
