use crate::error::{AuthError, AuthResult};
use crate::http::{HttpClient, HttpRequest};
use crate::provider::Provider;
use crate::session::AccessToken;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static JSON_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""access_token"\s*:\s*"([^"]+)""#).expect("valid json token pattern")
});
static FORM_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"access_token=([^&\r\n]+)").expect("valid form token pattern"));

pub type TokenResult = AuthResult<AccessToken>;

#[derive(Clone)]
pub struct TokenExchanger {
    http: Arc<dyn HttpClient>,
}

impl TokenExchanger {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Trades an authorization code for an access token with one request. No retries.
    pub async fn exchange(
        &self,
        provider: Provider,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> TokenResult {
        let form = provider.token_form(client_id, client_secret, code, redirect_uri);
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let request = HttpRequest::post(provider.token_url(), body)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json");

        let response = self.http.perform_request(request).await.map_err(|e| {
            warn!(%provider, "Token exchange transport failure: {e}");
            AuthError::Transport(e)
        })?;
        debug!(%provider, status = response.status, "Token endpoint responded");

        extract_access_token(&response.body).ok_or_else(|| {
            warn!(%provider, status = response.status, "Token endpoint response had no access_token");
            AuthError::TokenNotFound
        })
    }
}

/// JSON shape first, then the form-encoded shape some providers still send.
pub fn extract_access_token(body: &str) -> Option<AccessToken> {
    [&*JSON_TOKEN_RE, &*FORM_TOKEN_RE]
        .iter()
        .find_map(|re| re.captures(body))
        .and_then(|caps| AccessToken::new(&caps[1]))
}
