//! Session state shared by the login flow, fetch workers, and the render loop.
//!
//! Every field lives behind one mutex. Each mutator is a single critical
//! section, so a reader never sees half of an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Bearer token returned by the exchange. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: String,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price: price.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub access_token: String,
    pub status_message: String,
    pub fetching: bool,
    pub items: Vec<Quote>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct SharedSessionState {
    inner: Arc<Mutex<SessionSnapshot>>,
}

impl SharedSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    pub fn set_fetching(&self, fetching: bool) {
        self.lock().fetching = fetching;
    }

    /// Claims the fetch slot. Returns false if another worker holds it.
    pub fn try_begin_fetch(&self) -> bool {
        let mut state = self.lock();
        if state.fetching {
            return false;
        }
        state.fetching = true;
        true
    }

    /// Applies a fetch result and releases the fetch slot in one step.
    /// A failed fetch keeps the previous items visible. A result that lands
    /// after logout is discarded.
    pub fn finish_fetch(&self, result: Result<Vec<Quote>, String>) {
        let mut state = self.lock();
        if !state.authenticated {
            tracing::debug!("Discarding fetch result for signed-out session");
        } else {
            match result {
                Ok(items) => {
                    state.items = items;
                    state.status_message.clear();
                    state.updated_at = Some(Utc::now());
                }
                Err(status) => state.status_message = status,
            }
        }
        state.fetching = false;
    }

    pub fn publish_authenticated(&self, token: &AccessToken) {
        let mut state = self.lock();
        state.access_token = token.as_str().to_string();
        state.authenticated = true;
        state.status_message.clear();
    }

    pub fn publish_status(&self, message: impl Into<String>) {
        self.lock().status_message = message.into();
    }

    pub fn publish_items(&self, items: Vec<Quote>) {
        let mut state = self.lock();
        state.items = items;
        state.status_message.clear();
        state.updated_at = Some(Utc::now());
    }

    /// Drops credentials and cached quotes. The fetching flag is left to its worker.
    pub fn logout(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.authenticated = false;
        state.access_token.clear();
        state.items.clear();
        state.updated_at = None;
        state.status_message = message.into();
    }

    #[track_caller]
    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    file = loc.file(),
                    line = loc.line(),
                    "Session state mutex poisoned; recovering last written state"
                );
                poisoned.into_inner()
            }
        }
    }
}
