use super::App;
use gainers_auth::{FlowState, SessionSnapshot};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub const NO_DATA: &str = "No data available (network or parse error)";

impl App {
    pub fn render(&mut self, frame: &mut Frame) {
        let snapshot = self.auth.session().read();
        let flow = self.auth.flow_state();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0], &snapshot, flow);
        self.render_quotes(frame, chunks[1], &snapshot);
        self.render_footer(frame, chunks[2]);

        if self.show_help {
            self.render_help(frame, frame.area());
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, snapshot: &SessionSnapshot, flow: FlowState) {
        let session_style = if snapshot.authenticated {
            Style::default().fg(Color::Green)
        } else if flow == FlowState::Failed {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Yellow)
        };

        let line = Line::from(vec![
            Span::styled(
                "Top US Gainers",
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  |  "),
            Span::styled(flow.label(), session_style),
        ]);

        frame.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(" gainers ")),
            area,
        );
    }

    fn render_quotes(&self, frame: &mut Frame, area: Rect, snapshot: &SessionSnapshot) {
        let mut lines: Vec<Line> = body_lines(snapshot).into_iter().map(Line::from).collect();
        if let Some(error) = &self.last_error {
            lines.push(Line::default());
            lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
        }

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(" Quotes ")),
            area,
        );
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Paragraph::new(self.keybinds.footer()).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 60, area);

        frame.render_widget(Clear, popup_area);
        frame.render_widget(
            Paragraph::new(self.keybinds.help_text()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help - Press ? to close "),
            ),
            popup_area,
        );
    }
}

/// Body text for one frame. Only the first matching case is shown: an
/// in-flight fetch, then a status message, then the empty notice, then quotes.
pub fn body_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    if snapshot.fetching {
        return vec!["Fetching...".to_string()];
    }
    if !snapshot.status_message.is_empty() {
        return vec![snapshot.status_message.clone()];
    }
    if snapshot.items.is_empty() {
        return vec![NO_DATA.to_string()];
    }

    let mut lines: Vec<String> = snapshot
        .items
        .iter()
        .enumerate()
        .map(|(i, quote)| format!("{}. {:<6} ${}", i + 1, quote.symbol, quote.price))
        .collect();
    if let Some(updated_at) = snapshot.updated_at {
        lines.push(String::new());
        lines.push(format!(
            "Updated {}",
            updated_at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ));
    }
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
