use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Refresh,
    Logout,
    ToggleHelp,
    Quit,
}

#[derive(Debug, Default)]
pub struct Keybinds;

impl Keybinds {
    pub fn action_for(&self, key: &KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('q') | KeyCode::Char('c') => Some(Action::Quit),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('l') | KeyCode::Char('L') => Some(Action::Login),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Refresh),
            KeyCode::Char('o') | KeyCode::Char('O') => Some(Action::Logout),
            KeyCode::Char('?') => Some(Action::ToggleHelp),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }

    pub fn help_text(&self) -> String {
        r#"Keyboard Shortcuts:

Session:
  l             Log in through the browser
  o             Log out

Quotes:
  r             Refresh top gainers

General:
  ?             Toggle this help
  Esc           Quit (closes help first)
  Ctrl + Q      Quit
"#
        .to_string()
    }

    pub fn footer(&self) -> &'static str {
        "[l] login  [r] refresh  [o] logout  [?] help  [Esc] quit"
    }
}
