use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    Google,
}

impl Provider {
    pub fn token_url(&self) -> &'static str {
        match self {
            Provider::GitHub => GITHUB_TOKEN_URL,
            Provider::Google => GOOGLE_TOKEN_URL,
        }
    }

    /// Browser URL that starts the consent screen and redirects back to `redirect_uri`.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str) -> String {
        let (base, params): (&str, Vec<(&str, &str)>) = match self {
            Provider::GitHub => (
                GITHUB_AUTHORIZE_URL,
                vec![
                    ("client_id", client_id),
                    ("redirect_uri", redirect_uri),
                    ("scope", "read:user"),
                ],
            ),
            Provider::Google => (
                GOOGLE_AUTHORIZE_URL,
                vec![
                    ("response_type", "code"),
                    ("client_id", client_id),
                    ("redirect_uri", redirect_uri),
                    ("scope", "openid email profile"),
                    ("access_type", "offline"),
                    ("prompt", "consent"),
                ],
            ),
        };
        match Url::parse_with_params(base, &params) {
            Ok(url) => url.to_string(),
            Err(_) => base.to_string(),
        }
    }

    /// Form fields for the code exchange, in the order the provider documents them.
    pub fn token_form<'a>(
        &self,
        client_id: &'a str,
        client_secret: &'a str,
        code: &'a str,
        redirect_uri: &'a str,
    ) -> Vec<(&'static str, &'a str)> {
        match self {
            Provider::GitHub => vec![
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            Provider::Google => vec![
                ("code", code),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ],
        }
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(Provider::GitHub),
            "google" => Ok(Provider::Google),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GitHub => write!(f, "github"),
            Provider::Google => write!(f, "google"),
        }
    }
}
