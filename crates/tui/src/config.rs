use gainers_auth::{AuthConfig, ScreenerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PROVIDER: &str = "OAUTH_PROVIDER";
pub const ENV_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "OAUTH_CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub oauth: AuthConfig,
    pub screener: ScreenerConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default config ({}): {e}", path.display());
                Self::default()
            }
        }
    }

    /// Applies `OAUTH_*` variables from the process environment on top of the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = value(ENV_PROVIDER) {
            self.oauth.provider = provider;
        }
        if let Some(client_id) = value(ENV_CLIENT_ID) {
            self.oauth.client_id = client_id;
        }
        if let Some(client_secret) = value(ENV_CLIENT_SECRET) {
            self.oauth.client_secret = client_secret;
        }
    }
}

/// Loads `.env` from the working directory, then from its parent if the
/// credentials are still missing. Variables already set in the environment win.
pub fn load_dotenv() -> Option<PathBuf> {
    let mut loaded = dotenvy::dotenv().ok();

    let missing = |key: &str| std::env::var(key).map_or(true, |v| v.is_empty());
    if missing(ENV_CLIENT_ID) || missing(ENV_CLIENT_SECRET) {
        let parent = PathBuf::from("../.env");
        if dotenvy::from_path(&parent).is_ok() {
            loaded = Some(parent);
        }
    }
    loaded
}
