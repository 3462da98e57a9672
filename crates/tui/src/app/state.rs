use super::types::AppAsyncEvent;
use crate::config::Config;
use crate::keybinds::Keybinds;
use gainers_auth::browser::{BrowserOpener, SystemBrowser};
use gainers_auth::http::{HttpClient, ReqwestClient};
use gainers_auth::{AuthOrchestrator, SharedSessionState};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct App {
    pub should_quit: bool,
    pub show_help: bool,
    pub last_error: Option<String>,
    pub keybinds: Keybinds,
    pub auth: AuthOrchestrator,
    pub(super) app_async_tx: Option<mpsc::UnboundedSender<AppAsyncEvent>>,
    pub(super) app_async_rx: Option<mpsc::UnboundedReceiver<AppAsyncEvent>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let http = Arc::new(ReqwestClient::new(config.oauth.exchange_timeout()));
        Self::with_collaborators(config, http, Arc::new(SystemBrowser))
    }

    pub fn with_collaborators(
        config: Config,
        http: Arc<dyn HttpClient>,
        browser: Arc<dyn BrowserOpener>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let auth = AuthOrchestrator::new(
            config.oauth,
            http,
            browser,
            SharedSessionState::new(),
            config.screener,
        );

        Self {
            should_quit: false,
            show_help: false,
            last_error: None,
            keybinds: Keybinds,
            auth,
            app_async_tx: Some(tx),
            app_async_rx: Some(rx),
        }
    }
}
