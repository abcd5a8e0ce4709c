//! Upload token caching.
//!
//! Asset endpoints are authorized with a short-lived JWT obtained from the
//! project's upload-token endpoint. The token is cached per client and reused
//! until shortly before it expires.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{ApiError, PagesError, Result};

/// Lifetime assumed when the token carries no `exp` claim, and the longest one trusted.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// How long before expiry a token stops being reused.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// A cached upload token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: Instant,
}

impl AuthToken {
    /// Creates a token that stops being reused at `expires_at`.
    #[must_use]
    pub const fn new(value: String, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    /// The bearer value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Instant after which the token is refreshed.
    #[must_use]
    pub const fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true if the token may still be used at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Owner of the cached upload token.
///
/// The cache slot is locked for the whole refresh, so concurrent callers wait
/// for a single refresh instead of racing their own.
#[derive(Debug)]
pub struct TokenManager {
    cached: Mutex<Option<AuthToken>>,
    default_lifetime: Duration,
    safety_margin: Duration,
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LIFETIME, DEFAULT_SAFETY_MARGIN)
    }
}

impl TokenManager {
    /// Creates an empty token manager.
    #[must_use]
    pub fn new(default_lifetime: Duration, safety_margin: Duration) -> Self {
        Self {
            cached: Mutex::new(None),
            default_lifetime,
            safety_margin,
        }
    }

    /// Returns the cached token if still valid, otherwise calls `fetch` and caches the result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthenticationFailed`] if `fetch` fails or yields an
    /// empty token. The previously cached token is left in place.
    pub async fn acquire<F, Fut>(&self, fetch: F) -> Result<AuthToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(Instant::now())) {
            trace!("Reusing cached upload token");
            return Ok(token.clone());
        }

        debug!("Requesting a new upload token");
        let value = fetch().await.map_err(|e| match e {
            PagesError::Api(ApiError::AuthenticationFailed { .. }) => e,
            other => ApiError::auth(format!("could not obtain upload token: {other}")).into(),
        })?;

        if value.trim().is_empty() {
            return Err(ApiError::auth("upload token endpoint returned an empty token").into());
        }

        let lifetime = jwt_lifetime(&value)
            .map_or(self.default_lifetime, |l| l.min(self.default_lifetime));
        let expires_at = Instant::now() + lifetime.saturating_sub(self.safety_margin);
        let token = AuthToken::new(value, expires_at);
        debug!(
            "Upload token cached for {:?}",
            token.expires_at().saturating_duration_since(Instant::now())
        );

        *cached = Some(token.clone());
        Ok(token)
    }

    /// Returns the cached token, valid or not.
    pub async fn current(&self) -> Option<AuthToken> {
        self.cached.lock().await.clone()
    }
}

/// Remaining lifetime declared by the `exp` claim of a JWT, if it has one.
fn jwt_lifetime(token: &str) -> Option<Duration> {
    #[derive(Deserialize)]
    struct Claims {
        exp: Option<i64>,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let remaining = claims.exp?.checked_sub(Utc::now().timestamp())?;

    Some(Duration::from_secs(u64::try_from(remaining).unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fake_jwt(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
        format!("{header}.{claims}.signature")
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let manager = TokenManager::default();
        let calls = &AtomicUsize::new(0);

        for _ in 0..2 {
            let token = manager
                .acquire(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, PagesError>(String::from("jwt-1"))
                })
                .await
                .expect("acquire failed");
            assert_eq!(token.value(), "jwt-1");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        // Margin equal to the lifetime: every cached token is already expired.
        let manager = TokenManager::new(Duration::from_secs(60), Duration::from_secs(60));
        let calls = &AtomicUsize::new(0);

        let first = manager
            .acquire(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PagesError>(String::from("jwt-1"))
            })
            .await
            .expect("first acquire failed");
        assert!(!first.is_valid_at(Instant::now()));

        let second = manager
            .acquire(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PagesError>(String::from("jwt-2"))
            })
            .await
            .expect("second acquire failed");

        assert_eq!(second.value(), "jwt-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let manager = TokenManager::new(Duration::ZERO, Duration::ZERO);
        manager
            .acquire(|| async { Ok::<_, PagesError>(String::from("jwt-old")) })
            .await
            .expect("acquire failed");

        let result = manager
            .acquire(|| async {
                Err(PagesError::from(ApiError::Timeout {
                    endpoint: "upload-token",
                }))
            })
            .await;

        assert!(matches!(
            result,
            Err(PagesError::Api(ApiError::AuthenticationFailed { .. }))
        ));
        let current = manager.current().await.expect("token should remain cached");
        assert_eq!(current.value(), "jwt-old");
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let manager = TokenManager::default();
        let result = manager.acquire(|| async { Ok::<_, PagesError>(String::new()) }).await;

        assert!(result.is_err());
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let manager = Arc::new(TokenManager::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                manager
                    .acquire(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, PagesError>(String::from("jwt-shared"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let token = handle.await.expect("task panicked").expect("acquire failed");
            assert_eq!(token.value(), "jwt-shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jwt_lifetime_extreme_exp_claims() {
        assert_eq!(jwt_lifetime(&fake_jwt(i64::MIN)), None);
        assert!(jwt_lifetime(&fake_jwt(i64::MAX)).is_some());
    }

    #[tokio::test]
    async fn test_token_lifetime_is_capped_by_default() {
        let manager = TokenManager::new(Duration::from_secs(300), Duration::from_secs(60));

        let token = manager
            .acquire(|| async { Ok::<_, PagesError>(fake_jwt(i64::MAX)) })
            .await
            .expect("acquire failed");
        assert!(token.expires_at() <= Instant::now() + Duration::from_secs(240));

        let manager = TokenManager::new(Duration::from_secs(300), Duration::from_secs(60));
        let token = manager
            .acquire(|| async { Ok::<_, PagesError>(fake_jwt(i64::MIN)) })
            .await
            .expect("acquire failed");
        assert!(token.is_valid_at(Instant::now()));
    }

    #[test]
    fn test_jwt_lifetime_from_exp_claim() {
        let exp = Utc::now().timestamp() + 600;
        let lifetime = jwt_lifetime(&fake_jwt(exp)).expect("exp should be read");
        assert!(lifetime > Duration::from_secs(590) && lifetime <= Duration::from_secs(600));

        let expired = jwt_lifetime(&fake_jwt(Utc::now().timestamp() - 10));
        assert_eq!(expired, Some(Duration::ZERO));

        assert_eq!(jwt_lifetime("not-a-jwt"), None);
    }
}
