use std::future::Future;

mod input;
mod render;
mod state;
mod types;

pub use input::LOGIN_FIRST;
pub use render::{body_lines, NO_DATA};
pub use state::App;
pub use types::AppAsyncEvent;

impl App {
    pub(super) fn report_error(&mut self, context: &str, error: impl std::fmt::Display) {
        let message = format!("{context}: {}", Self::redact_sensitive(&error.to_string()));
        self.last_error = Some(message.clone());
        tracing::warn!("{message}");
    }

    pub(super) fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn redact_sensitive(input: &str) -> String {
        const REDACTED: &str = "[REDACTED]";
        let mut out = input.to_string();
        for marker in ["access_token=", "client_secret=", "Bearer "] {
            let mut from = 0;
            while let Some(offset) = out[from..].find(marker) {
                let value_start = from + offset + marker.len();
                let value_end = out[value_start..]
                    .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
                    .map_or(out.len(), |i| value_start + i);
                out.replace_range(value_start..value_end, REDACTED);
                from = value_start + REDACTED.len();
            }
        }
        out
    }

    pub(super) fn spawn_app_task<F>(&self, future: F)
    where
        F: Future<Output = AppAsyncEvent> + Send + 'static,
    {
        if let Some(tx) = self.app_async_tx.clone() {
            tokio::spawn(async move {
                let event = future.await;
                let _ = tx.send(event);
            });
        }
    }

    /// Drains finished background work. Called once per UI tick.
    pub fn process_async_events(&mut self) {
        let mut events = Vec::new();
        if let Some(rx) = self.app_async_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        for event in events {
            match event {
                AppAsyncEvent::LoginFinished {
                    state,
                    error,
                    fetch,
                } => {
                    tracing::info!(state = state.label(), ?fetch, "Login flow finished");
                    match error {
                        Some(error) => self.report_error("Login failed", error),
                        None => self.clear_error(),
                    }
                }
                AppAsyncEvent::FetchFinished { outcome } => {
                    tracing::debug!(?outcome, "Refresh finished");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::Utc;
    use gainers_auth::browser::BrowserOpener;
    use gainers_auth::fetch::FetchError;
    use gainers_auth::http::{HttpClient, HttpRequest, HttpResponse};
    use gainers_auth::{AccessToken, FetchOutcome, FlowState, Quote, SessionSnapshot, TransportError};
    use futures::future::BoxFuture;
    use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHttp {
        calls: AtomicUsize,
    }

    impl HttpClient for CountingHttp {
        fn perform_request(
            &self,
            _request: HttpRequest,
        ) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                Ok(HttpResponse {
                    status: 200,
                    body: r#"{"data":{"table":{"rows":[{"symbol":"NVDA","lastsale":"$178.91"}]}}}"#
                        .to_string(),
                })
            })
        }
    }

    #[derive(Default)]
    struct NoBrowser {
        opened: AtomicUsize,
    }

    impl BrowserOpener for NoBrowser {
        fn open_external(&self, _url: &str) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app_with(config: Config) -> (App, Arc<CountingHttp>, Arc<NoBrowser>) {
        let http = Arc::new(CountingHttp::default());
        let browser = Arc::new(NoBrowser::default());
        let app = App::with_collaborators(config, http.clone(), browser.clone());
        (app, http, browser)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap()
    }

    #[tokio::test]
    async fn refresh_while_signed_out_asks_for_login() {
        let (mut app, http, _) = app_with(Config::default());

        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.auth.session().read().status_message, LOGIN_FIRST);
        assert_eq!(http.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn login_without_credentials_reports_status_and_opens_nothing() {
        let (mut app, _, browser) = app_with(Config::default());

        press(&mut app, KeyCode::Char('l'));

        assert_eq!(
            app.auth.session().read().status_message,
            "Set OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET environment variables."
        );
        assert_eq!(app.auth.flow_state(), FlowState::Failed);
        assert_eq!(browser.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_when_signed_in_fetches_quotes() {
        let (mut app, http, _) = app_with(Config::default());
        app.auth
            .session()
            .publish_authenticated(&AccessToken::new("TOK").unwrap());

        press(&mut app, KeyCode::Char('r'));

        for _ in 0..100 {
            if !app.auth.session().read().fetching {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let snapshot = app.auth.session().read();
        assert_eq!(snapshot.items, vec![Quote::new("NVDA", "178.91")]);
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_key_signs_out() {
        let (mut app, _, _) = app_with(Config::default());
        app.auth
            .session()
            .publish_authenticated(&AccessToken::new("TOK").unwrap());

        press(&mut app, KeyCode::Char('o'));

        let snapshot = app.auth.session().read();
        assert!(!snapshot.authenticated);
        assert_eq!(app.auth.flow_state(), FlowState::Idle);
    }

    #[tokio::test]
    async fn esc_closes_help_before_quitting() {
        let (mut app, _, _) = app_with(Config::default());

        assert!(!press(&mut app, KeyCode::Char('?')));
        assert!(app.show_help);
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(!app.show_help);
        assert!(press(&mut app, KeyCode::Esc));
    }

    #[tokio::test]
    async fn login_failure_event_sets_redacted_error() {
        let (mut app, _, _) = app_with(Config::default());
        let tx = app.app_async_tx.clone().unwrap();
        tx.send(AppAsyncEvent::LoginFinished {
            state: FlowState::Failed,
            error: Some("Token exchange failed: body access_token=gho_leak&scope=repo".into()),
            fetch: None,
        })
        .unwrap();
        tx.send(AppAsyncEvent::FetchFinished {
            outcome: Some(FetchOutcome::Failed(FetchError::NoData)),
        })
        .unwrap();

        app.process_async_events();

        let error = app.last_error.clone().unwrap();
        assert!(error.starts_with("Login failed: Token exchange failed"));
        assert!(!error.contains("gho_leak"));
        assert!(error.contains("&scope=repo"));
    }

    #[test]
    fn redaction_covers_every_occurrence() {
        let redacted = App::redact_sensitive(
            "first access_token=gho_one&x=1 then access_token=gho_two, Bearer abc Bearer def",
        );

        assert!(!redacted.contains("gho_one"));
        assert!(!redacted.contains("gho_two"));
        assert!(!redacted.contains("abc"));
        assert!(!redacted.contains("def"));
        assert_eq!(redacted.matches("[REDACTED]").count(), 4);
    }

    #[test]
    fn body_shows_first_matching_case() {
        let mut snapshot = SessionSnapshot {
            fetching: true,
            status_message: "Network fetch failed.".into(),
            ..Default::default()
        };
        assert_eq!(body_lines(&snapshot), vec!["Fetching..."]);

        snapshot.fetching = false;
        assert_eq!(body_lines(&snapshot), vec!["Network fetch failed."]);

        snapshot.status_message.clear();
        assert_eq!(body_lines(&snapshot), vec![NO_DATA]);
    }

    #[test]
    fn body_numbers_quotes() {
        let snapshot = SessionSnapshot {
            authenticated: true,
            items: vec![Quote::new("NVDA", "178.91"), Quote::new("F", "12.01")],
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        let lines = body_lines(&snapshot);
        assert_eq!(lines[0], "1. NVDA   $178.91");
        assert_eq!(lines[1], "2. F      $12.01");
        assert!(lines.last().unwrap().starts_with("Updated "));
    }
}
