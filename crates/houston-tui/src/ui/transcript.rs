//! Transcript area
//!
//! Displays the newest transcript lines, pinned to the bottom. Lines wider
//! than the area wrap at the column boundary onto extra rows.

use std::mem;

use houston_core::{DisplayLine, Origin};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthChar;

use crate::App;

const BORDER_SIZE: u16 = 2;

/// Render the transcript area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" {} ", app.link().config().device_name);
    let block = Block::default().borders(Borders::ALL).title(title);

    let transcript = app.transcript();
    let rows: Vec<Line> = if transcript.is_empty() {
        vec![Line::from(Span::styled("Waiting for data", Style::default().fg(Color::DarkGray)))]
    } else {
        let width = usize::from(area.width.saturating_sub(BORDER_SIZE));
        let height = usize::from(area.height.saturating_sub(BORDER_SIZE));

        // Every line takes at least one row, so older lines can never show.
        let rows: Vec<Line> =
            transcript.tail(height).flat_map(|line| wrapped_rows(line, width)).collect();
        let hidden = rows.len().saturating_sub(height);
        rows.into_iter().skip(hidden).collect()
    };

    frame.render_widget(Paragraph::new(rows).block(block), area);
}

fn origin_style(origin: Origin) -> Style {
    match origin {
        Origin::Inbound => Style::default(),
        Origin::OutboundOk => Style::default().fg(Color::Green),
        Origin::OutboundFailed => Style::default().fg(Color::Red),
    }
}

/// Split a prefixed line into rows of at most `width` display columns.
///
/// Breaks at exact column boundaries, not words. A zero width yields the
/// whole line as one row.
fn wrapped_rows(line: &DisplayLine, width: usize) -> Vec<Line<'static>> {
    let style = origin_style(line.origin);
    let pieces = [
        (line.origin.prefix(), style.add_modifier(Modifier::BOLD)),
        (line.text.as_str(), style),
    ];

    let mut rows = Vec::new();
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut used = 0;

    for (text, piece_style) in pieces {
        for ch in text.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if width > 0 && used > 0 && used + ch_width > width {
                if !current.is_empty() {
                    spans.push(Span::styled(mem::take(&mut current), piece_style));
                }
                rows.push(Line::from(mem::take(&mut spans)));
                used = 0;
            }
            current.push(ch);
            used += ch_width;
        }
        if !current.is_empty() {
            spans.push(Span::styled(mem::take(&mut current), piece_style));
        }
    }
    rows.push(Line::from(spans));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(rows: &[Line]) -> Vec<String> {
        rows.iter().map(|row| row.spans.iter().map(|s| s.content.as_ref()).collect()).collect()
    }

    #[test]
    fn short_line_is_one_row() {
        let rows = wrapped_rows(&DisplayLine::inbound("hello"), 20);
        assert_eq!(texts(&rows), ["<< hello"]);
    }

    #[test]
    fn long_line_breaks_at_width() {
        let rows = wrapped_rows(&DisplayLine::outbound("abcdefghij"), 5);
        assert_eq!(texts(&rows), [">> ab", "cdefg", "hij"]);
    }

    #[test]
    fn prefix_keeps_its_style_across_a_break() {
        let rows = wrapped_rows(&DisplayLine::failed("xy"), 2);
        assert_eq!(texts(&rows), ["x>", " x", "y"]);
        assert!(rows[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(!rows[1].spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn wide_characters_count_double() {
        let rows = wrapped_rows(&DisplayLine::inbound("日本語"), 6);
        assert_eq!(texts(&rows), ["<< 日", "本語"]);
    }

    #[test]
    fn zero_width_area_keeps_one_row() {
        let rows = wrapped_rows(&DisplayLine::inbound("abc"), 0);
        assert_eq!(rows.len(), 1);
    }
}
