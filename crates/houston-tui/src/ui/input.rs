//! Input line
//!
//! Displays the line being typed with the cursor.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::App;

const PROMPT_WIDTH: u16 = 3; // border + "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const RIGHT_PADDING: u16 = 1; // inside right border

/// Render the input line.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let input = app.input();
    let block = Block::default().borders(Borders::ALL);

    let input_text = format!("> {}", input.buffer());
    let paragraph =
        Paragraph::new(input_text).style(Style::default().fg(Color::White)).block(block);

    frame.render_widget(paragraph, area);

    let available_width = area.width.saturating_sub(PROMPT_WIDTH + RIGHT_PADDING);
    let cursor_offset = u16::try_from(input.cursor()).unwrap_or(u16::MAX).min(available_width);

    let cursor_x = area.x.saturating_add(PROMPT_WIDTH).saturating_add(cursor_offset);
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
    let max_x = area.x.saturating_add(area.width).saturating_sub(RIGHT_PADDING);
    let cursor_x = cursor_x.min(max_x);

    frame.set_cursor_position((cursor_x, cursor_y));
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use houston_app::{AppEvent, KeyInput};
    use houston_core::LinkConfig;
    use ratatui::{Terminal, backend::TestBackend, layout::Position};

    use super::*;

    #[test]
    fn cursor_follows_characters_not_bytes() {
        let mut app: App = App::new(LinkConfig::default());
        for c in "°C!".chars() {
            let _ = app.handle(AppEvent::Key(KeyInput::Char(c)), Instant::now());
        }
        let _ = app.handle(AppEvent::Key(KeyInput::Left), Instant::now());

        let mut terminal = Terminal::new(TestBackend::new(20, 3)).expect("terminal");
        terminal.draw(|frame| render(frame, &app, frame.area())).expect("draw");

        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(3, 1)].symbol(), "°");
        terminal.backend_mut().assert_cursor_position(Position::new(5, 1));
    }
}
