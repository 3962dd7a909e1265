//! Status bar
//!
//! Displays the link status, transcript fill and any transient notice.

use houston_core::LinkState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::App;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let style = match app.link_state() {
        LinkState::Ready => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        LinkState::Idle | LinkState::Failed(_) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Yellow),
    };

    let mut spans = vec![Span::raw(" "), Span::styled(app.status(), style)];

    let transcript = app.transcript();
    if !transcript.is_empty() {
        spans.push(Span::styled(
            format!(" | {}/{} lines", transcript.len(), transcript.max_lines()),
            Style::default().fg(Color::Gray),
        ));
    }

    if let Some(notice) = app.notice() {
        spans.push(Span::styled(format!(" | {notice}"), Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use houston_app::{AppEvent, KeyInput};
    use houston_core::LinkConfig;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn status_row(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).expect("terminal");
        terminal.draw(|frame| render(frame, app, frame.area())).expect("draw");
        let buffer = terminal.backend().buffer();
        let row: String = (0..buffer.area.width).map(|x| buffer[(x, 0)].symbol()).collect();
        row.trim_end().to_string()
    }

    #[test]
    fn notice_follows_status() {
        let mut app: App = App::new(LinkConfig::default());
        for key in [KeyInput::Char('h'), KeyInput::Char('i'), KeyInput::Enter] {
            let _ = app.handle(AppEvent::Key(key), Instant::now());
        }

        insta::assert_snapshot!(
            status_row(&app),
            @" Bluetooth is not available | 1/100 lines | Not connected: text not sent"
        );
    }

    #[test]
    fn status_is_colored_by_state() {
        let app: App = App::new(LinkConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(30, 1)).expect("terminal");
        terminal.draw(|frame| render(frame, &app, frame.area())).expect("draw");
        assert_eq!(terminal.backend().buffer()[(1, 0)].fg, Color::Red);
    }
}
