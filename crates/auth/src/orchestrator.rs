//! Login flow: listener up, browser out, code in, token exchanged, session published.
//!
//! ```text
//! Idle -> AwaitingCode -> ExchangingToken -> Authenticated
//!              |                 |
//!              +-----------------+--------> Failed
//! ```
//!
//! One flow at a time. The shared session is locked only for each write,
//! never across the callback wait or the token request.

use crate::browser::BrowserOpener;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenExchanger;
use crate::fetch::{FetchOutcome, FetchWorker, ScreenerConfig};
use crate::http::HttpClient;
use crate::listener::{RedirectListener, RedirectOutcome};
use crate::provider::Provider;
use crate::session::SharedSessionState;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingCode,
    ExchangingToken,
    Authenticated,
    Failed,
}

impl FlowState {
    pub fn is_active(&self) -> bool {
        matches!(self, FlowState::AwaitingCode | FlowState::ExchangingToken)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlowState::Idle => "signed out",
            FlowState::AwaitingCode => "waiting for browser",
            FlowState::ExchangingToken => "exchanging token",
            FlowState::Authenticated => "signed in",
            FlowState::Failed => "login failed",
        }
    }
}

/// Terminal result of one login attempt.
#[derive(Debug)]
pub struct FlowReport {
    pub state: FlowState,
    pub error: Option<AuthError>,
    /// The fetch started by a successful login, if the fetch slot was free.
    pub fetch: Option<JoinHandle<FetchOutcome>>,
}

pub struct FlowHandle {
    task: JoinHandle<FlowReport>,
}

impl FlowHandle {
    pub async fn wait(self) -> FlowReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!("Login flow task ended abnormally: {e}");
                FlowReport {
                    state: FlowState::Failed,
                    error: None,
                    fetch: None,
                }
            }
        }
    }
}

/// Leaves the flow in `Failed` if the task stops before reaching a terminal state.
struct ActiveFlow {
    flow: Arc<Mutex<FlowState>>,
}

impl Drop for ActiveFlow {
    fn drop(&mut self) {
        let mut flow = lock_flow(&self.flow);
        if flow.is_active() {
            *flow = FlowState::Failed;
        }
    }
}

#[derive(Clone)]
pub struct AuthOrchestrator {
    config: AuthConfig,
    exchanger: TokenExchanger,
    browser: Arc<dyn BrowserOpener>,
    state: SharedSessionState,
    fetcher: FetchWorker,
    flow: Arc<Mutex<FlowState>>,
}

impl AuthOrchestrator {
    pub fn new(
        config: AuthConfig,
        http: Arc<dyn HttpClient>,
        browser: Arc<dyn BrowserOpener>,
        state: SharedSessionState,
        screener: ScreenerConfig,
    ) -> Self {
        let fetcher = FetchWorker::new(http.clone(), state.clone(), screener);
        Self {
            config,
            exchanger: TokenExchanger::new(http),
            browser,
            state,
            fetcher,
            flow: Arc::new(Mutex::new(FlowState::Idle)),
        }
    }

    pub fn session(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn fetcher(&self) -> &FetchWorker {
        &self.fetcher
    }

    pub fn flow_state(&self) -> FlowState {
        *lock_flow(&self.flow)
    }

    /// Starts a login on a background task.
    ///
    /// Rejections (already signed in, flow running, bad configuration) are
    /// published as status and returned immediately; nothing is bound or opened.
    pub fn start(&self) -> AuthResult<FlowHandle> {
        let provider = {
            let mut flow = lock_flow(&self.flow);
            let rejection = if self.state.is_authenticated() {
                Some(AuthError::AlreadyAuthenticated)
            } else if flow.is_active() {
                Some(AuthError::FlowActive)
            } else {
                None
            };
            if let Some(e) = rejection {
                info!("Login request rejected: {e}");
                self.state.publish_status(e.user_message());
                return Err(e);
            }

            match self.validate() {
                Ok(provider) => {
                    *flow = FlowState::AwaitingCode;
                    provider
                }
                Err(e) => {
                    warn!("Login configuration invalid: {e}");
                    *flow = FlowState::Failed;
                    self.state.publish_status(e.user_message());
                    return Err(e);
                }
            }
        };

        info!(%provider, "Login flow started");
        let orchestrator = self.clone();
        let active = ActiveFlow {
            flow: self.flow.clone(),
        };
        let task = tokio::spawn(async move {
            let _active = active;
            match orchestrator.run_flow(provider).await {
                Ok(fetch) => FlowReport {
                    state: FlowState::Authenticated,
                    error: None,
                    fetch,
                },
                Err(e) => orchestrator.fail(e),
            }
        });
        Ok(FlowHandle { task })
    }

    /// Signs out. Refused while a login is in flight.
    pub fn logout(&self) -> AuthResult<()> {
        let mut flow = lock_flow(&self.flow);
        if flow.is_active() {
            self.state.publish_status(AuthError::FlowActive.user_message());
            return Err(AuthError::FlowActive);
        }
        *flow = FlowState::Idle;
        self.state.logout("Logged out");
        info!("Logged out");
        Ok(())
    }

    fn validate(&self) -> AuthResult<Provider> {
        if !self.config.has_credentials() {
            return Err(AuthError::Configuration(
                "Set OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET environment variables.".to_string(),
            ));
        }
        self.config.provider.parse()
    }

    async fn run_flow(&self, provider: Provider) -> AuthResult<Option<JoinHandle<FetchOutcome>>> {
        let (ready_tx, ready_rx) = oneshot::channel::<AuthResult<u16>>();
        let (code_tx, code_rx) = oneshot::channel::<AuthResult<RedirectOutcome>>();
        let port = self.config.redirect_port;
        let callback_timeout = self.config.callback_timeout();

        let listener_task = tokio::spawn(async move {
            let listener = match RedirectListener::bind(port) {
                Ok(listener) => listener,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(listener.port()));
            let _ = code_tx.send(listener.await_code(callback_timeout).await);
        });

        // The browser must not open before the port is accepting connections.
        let bound_port = ready_rx.await.map_err(|_| listener_stopped())??;
        let redirect_uri = format!("http://127.0.0.1:{bound_port}/callback");
        let auth_url = provider.authorize_url(&self.config.client_id, &redirect_uri);
        self.state
            .publish_status("Opening browser for authentication...");
        self.browser.open_external(&auth_url);

        let outcome = code_rx.await.map_err(|_| listener_stopped())?;
        let _ = listener_task.await;
        let code = outcome?.into_code()?;

        self.set_flow(FlowState::ExchangingToken);
        self.state.publish_status("Exchanging authorization code...");
        info!(%provider, "Authorization code received");

        let token = tokio::time::timeout(
            self.config.exchange_timeout(),
            self.exchanger.exchange(
                provider,
                &self.config.client_id,
                &self.config.client_secret,
                &code,
                &redirect_uri,
            ),
        )
        .await
        .map_err(|_| AuthError::ExchangeTimeout)??;

        self.state.publish_authenticated(&token);
        self.set_flow(FlowState::Authenticated);
        info!(%provider, "Login succeeded");

        Ok(self.fetcher.spawn())
    }

    fn fail(&self, e: AuthError) -> FlowReport {
        warn!("Login flow failed: {e}");
        self.set_flow(FlowState::Failed);
        self.state.publish_status(e.user_message());
        FlowReport {
            state: FlowState::Failed,
            error: Some(e),
            fetch: None,
        }
    }

    fn set_flow(&self, next: FlowState) {
        *lock_flow(&self.flow) = next;
    }
}

fn listener_stopped() -> AuthError {
    AuthError::Accept(std::io::Error::other("callback listener stopped"))
}

fn lock_flow(flow: &Mutex<FlowState>) -> MutexGuard<'_, FlowState> {
    flow.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
