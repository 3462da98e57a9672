use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_REDIRECT_PORT: u16 = 54321;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_port: u16,
    pub callback_timeout_secs: u64,
    pub exchange_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: "github".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            callback_timeout_secs: 120,
            exchange_timeout_secs: 30,
        }
    }
}

impl AuthConfig {
    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_port", &self.redirect_port)
            .field("callback_timeout_secs", &self.callback_timeout_secs)
            .field("exchange_timeout_secs", &self.exchange_timeout_secs)
            .finish()
    }
}
