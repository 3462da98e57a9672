use super::types::AppAsyncEvent;
use super::App;
use crate::keybinds::Action;
use anyhow::Result;
use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

pub const LOGIN_FIRST: &str = "Please login first (press 'l').";

impl App {
    /// Returns true when the app should exit.
    pub fn handle_event(&mut self, event: Event) -> Result<bool> {
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key_event(key);
            }
        }
        Ok(self.should_quit)
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.show_help && matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            self.show_help = false;
            return;
        }

        match self.keybinds.action_for(&key) {
            Some(Action::Login) => self.login(),
            Some(Action::Refresh) => self.refresh(),
            Some(Action::Logout) => self.logout(),
            Some(Action::ToggleHelp) => self.show_help = !self.show_help,
            Some(Action::Quit) => self.should_quit = true,
            None => {}
        }
    }

    pub fn login(&mut self) {
        self.clear_error();
        let handle = match self.auth.start() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::debug!("Login not started: {e}");
                return;
            }
        };

        self.spawn_app_task(async move {
            let report = handle.wait().await;
            let fetch = match report.fetch {
                Some(task) => task.await.ok(),
                None => None,
            };
            AppAsyncEvent::LoginFinished {
                state: report.state,
                error: report.error.map(|e| {
                    if e.is_retryable() {
                        format!("{} Press 'l' to retry.", e.user_message())
                    } else {
                        e.user_message()
                    }
                }),
                fetch,
            }
        });
    }

    pub fn refresh(&mut self) {
        let session = self.auth.session();
        if !session.is_authenticated() {
            session.publish_status(LOGIN_FIRST);
            return;
        }

        let Some(task) = self.auth.fetcher().spawn() else {
            tracing::debug!("Refresh ignored; fetch already running");
            return;
        };
        self.spawn_app_task(async move {
            AppAsyncEvent::FetchFinished {
                outcome: task.await.ok(),
            }
        });
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.auth.logout() {
            tracing::debug!("Logout refused: {e}");
            return;
        }
        self.clear_error();
    }
}
