//! Terminal-agnostic keyboard input and the single-line editor.

/// Keyboard input abstraction.
///
/// Decouples application logic from terminal libraries (crossterm, termion,
/// etc.) enabling deterministic simulation testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (submit).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Escape key (quit).
    Esc,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key (cursor to start).
    Home,
    /// End key (cursor to end).
    End,
}

/// Outcome of feeding one key to an [`InputLine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    /// Buffer or cursor changed.
    Edited,
    /// Key had no effect.
    Unchanged,
    /// Enter pressed on a non-empty line. Carries the submitted text; the
    /// buffer is now empty.
    Submit(String),
    /// Quit requested.
    Quit,
}

/// Single-line text editor.
///
/// The cursor counts characters, not bytes, so multi-byte input edits
/// cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    buffer: String,
    cursor: usize,
}

impl InputLine {
    /// Create an empty line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one key.
    pub fn handle_key(&mut self, key: KeyInput) -> LineEdit {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor += 1;
                LineEdit::Edited
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return LineEdit::Unchanged;
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                LineEdit::Edited
            },
            KeyInput::Delete => {
                if self.cursor >= self.char_len() {
                    return LineEdit::Unchanged;
                }
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
                LineEdit::Edited
            },
            KeyInput::Left => self.move_to(self.cursor.saturating_sub(1)),
            KeyInput::Right => self.move_to((self.cursor + 1).min(self.char_len())),
            KeyInput::Home => self.move_to(0),
            KeyInput::End => self.move_to(self.char_len()),
            KeyInput::Enter => {
                if self.buffer.is_empty() {
                    return LineEdit::Unchanged;
                }
                self.cursor = 0;
                LineEdit::Submit(std::mem::take(&mut self.buffer))
            },
            KeyInput::Esc => LineEdit::Quit,
            KeyInput::Up | KeyInput::Down => LineEdit::Unchanged,
        }
    }

    fn move_to(&mut self, cursor: usize) -> LineEdit {
        if cursor == self.cursor {
            return LineEdit::Unchanged;
        }
        self.cursor = cursor;
        LineEdit::Edited
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputLine {
        let mut line = InputLine::new();
        for c in text.chars() {
            line.handle_key(KeyInput::Char(c));
        }
        line
    }

    #[test]
    fn insert_at_cursor() {
        let mut line = typed("ac");
        line.handle_key(KeyInput::Left);
        line.handle_key(KeyInput::Char('b'));
        assert_eq!(line.buffer(), "abc");
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn backspace_and_delete() {
        let mut line = typed("abcd");
        line.handle_key(KeyInput::Backspace);
        assert_eq!(line.buffer(), "abc");

        line.handle_key(KeyInput::Home);
        line.handle_key(KeyInput::Delete);
        assert_eq!(line.buffer(), "bc");
        assert_eq!(line.cursor(), 0);

        assert_eq!(line.handle_key(KeyInput::Backspace), LineEdit::Unchanged);
    }

    #[test]
    fn multibyte_characters_edit_cleanly() {
        let mut line = typed("°C");
        line.handle_key(KeyInput::Left);
        line.handle_key(KeyInput::Backspace);
        assert_eq!(line.buffer(), "C");

        line.handle_key(KeyInput::End);
        line.handle_key(KeyInput::Char('é'));
        assert_eq!(line.buffer(), "Cé");
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut line = typed("ab");
        assert_eq!(line.handle_key(KeyInput::Right), LineEdit::Unchanged);
        line.handle_key(KeyInput::Home);
        assert_eq!(line.handle_key(KeyInput::Left), LineEdit::Unchanged);
        assert_eq!(line.handle_key(KeyInput::Delete), LineEdit::Edited);
        assert_eq!(line.buffer(), "b");
    }

    #[test]
    fn enter_submits_and_clears() {
        let mut line = typed("ping");
        assert_eq!(line.handle_key(KeyInput::Enter), LineEdit::Submit("ping".into()));
        assert_eq!(line.buffer(), "");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn enter_on_empty_line_does_nothing() {
        let mut line = InputLine::new();
        assert_eq!(line.handle_key(KeyInput::Enter), LineEdit::Unchanged);
    }

    #[test]
    fn escape_quits() {
        assert_eq!(typed("x").handle_key(KeyInput::Esc), LineEdit::Quit);
    }
}
