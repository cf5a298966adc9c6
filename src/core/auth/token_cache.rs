// =============================================================================
// TOKEN CACHE
// =============================================================================
//
// Holds the most recent access token for the process and coordinates refreshes.
//
// **State machine:**
//   Empty -> Fetching -> Valid -> (near expiry) -> Fetching -> Valid -> ...
//   Fetching -> failed -> back to Empty (or to the old, now unusable token)
//
// **Single flight:**
// The state sits behind one mutex. The first caller that finds no usable token
// records an in-flight refresh (a `watch` receiver) and spawns the refresh.
// Everyone arriving while it runs clones that receiver and waits on the same
// result, so N concurrent callers cause exactly one exchange. The refresh runs
// on its own task, so a caller that gives up (timeout, dropped future) does not
// strand the others.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{watch, Mutex};

use crate::core::auth::Clock;
use crate::core::errors::ClassifiedError;

/// Default headroom before expiry at which a token stops being handed out.
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 60;

/// An access token plus what we need to know when it stops being usable.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub acquired_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn expiry(&self) -> DateTime<Utc> {
        i64::try_from(self.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.acquired_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True while `now < expiry - margin`. A margin reaching past the start
    /// of time means never usable.
    pub fn is_usable_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expiry()
            .checked_sub_signed(margin)
            .is_some_and(|refresh_at| now < refresh_at)
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}

type RefreshResult = Result<CachedToken, ClassifiedError>;

struct StoredToken {
    identity: String,
    token: CachedToken,
}

struct InFlight {
    identity: String,
    result: watch::Receiver<Option<RefreshResult>>,
}

impl InFlight {
    /// The sender only disappears without a value if the refresh task died.
    fn is_live(&self) -> bool {
        self.result.has_changed().is_ok()
    }
}

#[derive(Default)]
struct CacheState {
    token: Option<StoredToken>,
    inflight: Option<InFlight>,
    generation: u64,
}

/// Process-wide access token holder. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenCache {
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>, safety_margin: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            clock,
            safety_margin,
        }
    }

    /// Returns a usable token for `identity`, running `refresh` only when there
    /// is none and no refresh for that identity is already running.
    pub async fn get_token<F, Fut>(&self, identity: &str, refresh: F) -> RefreshResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshResult> + Send + 'static,
    {
        let mut receiver = {
            let mut state = self.state.lock().await;

            if let Some(stored) = &state.token {
                if stored.identity == identity
                    && stored.token.is_usable_at(self.clock.now(), self.safety_margin)
                {
                    return Ok(stored.token.clone());
                }
            }

            match &state.inflight {
                Some(inflight) if inflight.identity == identity && inflight.is_live() => {
                    tracing::debug!("Joining in-flight token refresh");
                    inflight.result.clone()
                }
                _ => self.start_refresh(&mut state, identity, refresh()),
            }
        };

        let outcome = match receiver.wait_for(|result| result.is_some()).await {
            Ok(result) => (*result).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(ClassifiedError::refresh_aborted()))
    }

    fn start_refresh<Fut>(
        &self,
        state: &mut CacheState,
        identity: &str,
        refresh: Fut,
    ) -> watch::Receiver<Option<RefreshResult>>
    where
        Fut: Future<Output = RefreshResult> + Send + 'static,
    {
        tracing::debug!("Refreshing service account access token");

        let (sender, receiver) = watch::channel(None);
        state.generation += 1;
        let generation = state.generation;
        state.inflight = Some(InFlight {
            identity: identity.to_string(),
            result: receiver.clone(),
        });

        let shared = Arc::clone(&self.state);
        let identity = identity.to_string();
        tokio::spawn(async move {
            let result = refresh.await;

            {
                let mut state = shared.lock().await;
                // A reset or a refresh for another identity superseded us.
                if state.generation == generation {
                    match &result {
                        Ok(token) => {
                            tracing::info!(
                                expires_in = token.expires_in,
                                "Access token refreshed"
                            );
                            state.token = Some(StoredToken {
                                identity,
                                token: token.clone(),
                            });
                        }
                        Err(err) => {
                            tracing::warn!(kind = %err.kind, "Access token refresh failed: {}", err.message);
                        }
                    }
                    state.inflight = None;
                }
            }

            let _ = sender.send(Some(result));
        });

        receiver
    }

    /// Last stored token, usable or not. For inspection only.
    pub async fn peek(&self) -> Option<CachedToken> {
        self.state
            .lock()
            .await
            .token
            .as_ref()
            .map(|stored| stored.token.clone())
    }

    /// Drops the stored token so the next request refreshes. A refresh that is
    /// already running is left alone.
    pub async fn invalidate(&self) {
        self.state.lock().await.token = None;
    }

    /// Like `invalidate`, but only if the stored token is still `rejected`.
    /// A token some other caller already refreshed is kept.
    pub async fn invalidate_if_current(&self, rejected: &CachedToken) {
        let mut state = self.state.lock().await;
        let is_current = state
            .token
            .as_ref()
            .is_some_and(|stored| stored.token.access_token == rejected.access_token);
        if is_current {
            state.token = None;
        }
    }

    /// Back to `Empty`. Any refresh still running will not write its result.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        state.inflight = None;
        state.generation += 1;
    }
}
