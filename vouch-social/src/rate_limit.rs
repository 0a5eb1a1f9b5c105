//! Sliding-window rate limiting over a pool of API credentials.
//!
//! Every outbound call to the social API first acquires a credential. The pool
//! hands credentials out round-robin and keeps, per credential, the instants of
//! the calls made (or reserved) within the current window. A saturated
//! credential makes the caller wait until its oldest call leaves the window.
//!
//! The wait happens after the pool lock is released: a slot is reserved under
//! the lock and the calling task then sleeps on its own, so one waiting miner
//! pipeline never blocks another.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::service::SocialError;

/// A bearer token for the social API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the Authorization header.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "Credential({}***)", visible)
    }
}

/// Call budget for a single credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum calls inside one window
    pub max_calls: usize,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_calls: 15,
            window: Duration::from_secs(15 * 60),
        }
    }
}

struct PoolState {
    /// Index of the credential handed out next
    cursor: usize,
    /// Call instants per credential, oldest first
    windows: Vec<VecDeque<Instant>>,
}

/// Round-robin credential pool with a sliding window per credential.
pub struct CredentialPool {
    credentials: Vec<Credential>,
    limit: RateLimit,
    state: Mutex<PoolState>,
}

impl CredentialPool {
    /// Create a pool over the given credentials.
    pub fn new(credentials: Vec<Credential>, limit: RateLimit) -> Result<Self, SocialError> {
        if credentials.is_empty() {
            return Err(SocialError::NoCredentials);
        }
        if limit.max_calls == 0 || limit.window.is_zero() {
            return Err(SocialError::InvalidRateLimit(format!(
                "{} calls per {:?}",
                limit.max_calls, limit.window
            )));
        }

        let windows = credentials.iter().map(|_| VecDeque::new()).collect();

        Ok(Self {
            credentials,
            limit,
            state: Mutex::new(PoolState { cursor: 0, windows }),
        })
    }

    /// Build a pool from a `;`-separated token list.
    pub fn from_token_list(tokens: &str, limit: RateLimit) -> Result<Self, SocialError> {
        let credentials = tokens
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .collect();
        Self::new(credentials, limit)
    }

    /// Number of credentials in the pool.
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; an empty pool cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The per-credential budget.
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Take the next credential, waiting if its window is saturated.
    pub async fn acquire(&self) -> Credential {
        let (index, slot) = {
            let mut state = self.state.lock().await;
            let index = state.cursor;
            state.cursor = (state.cursor + 1) % self.credentials.len();

            let now = Instant::now();
            let window = &mut state.windows[index];
            while let Some(oldest) = window.front() {
                if *oldest + self.limit.window <= now {
                    window.pop_front();
                } else {
                    break;
                }
            }

            // Slots are handed out in non-decreasing order, so any slot
            // `max_calls` positions back is the one that must expire first.
            let slot = if window.len() < self.limit.max_calls {
                now
            } else {
                let expiring = window[window.len() - self.limit.max_calls];
                (expiring + self.limit.window).max(now)
            };
            window.push_back(slot);
            (index, slot)
        };

        let now = Instant::now();
        if slot > now {
            let wait = slot - now;
            warn!(
                credential = index,
                wait_secs = wait.as_secs_f64(),
                "Rate limit reached, waiting for credential window"
            );
            tokio::time::sleep_until(slot).await;
        } else {
            debug!(credential = index, "Credential acquired");
        }

        self.credentials[index].clone()
    }
}
