//! Bounded transcript of displayed lines.
//!
//! The transcript is an append log with a line cap. Appends go to the tail
//! and, once the cap is exceeded, whole lines are evicted from the head. A
//! merge extends the tail line in place and never evicts, since it does not
//! change the line count.
//!
//! # Invariants
//!
//! - `len() <= max_lines()` after every append
//! - eviction only removes the head; surviving lines keep their order

use std::{collections::VecDeque, fmt};

use crate::framer::{Fragment, FragmentKind};

/// Where a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Received from the peripheral.
    Inbound,
    /// Written to the peripheral.
    OutboundOk,
    /// Typed while the link was not ready; nothing was written.
    OutboundFailed,
}

impl Origin {
    /// Render prefix for this origin.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Inbound => "<< ",
            Self::OutboundOk => ">> ",
            Self::OutboundFailed => "x> ",
        }
    }
}

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    /// Line text without prefix or terminator.
    pub text: String,
    /// Line origin.
    pub origin: Origin,
}

impl DisplayLine {
    /// Inbound line.
    pub fn inbound(text: impl Into<String>) -> Self {
        Self { text: text.into(), origin: Origin::Inbound }
    }

    /// Successfully written outbound line.
    pub fn outbound(text: impl Into<String>) -> Self {
        Self { text: text.into(), origin: Origin::OutboundOk }
    }

    /// Outbound line that was not written.
    pub fn failed(text: impl Into<String>) -> Self {
        Self { text: text.into(), origin: Origin::OutboundFailed }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin.prefix(), self.text)
    }
}

/// Bounded, ordered scrollback.
#[derive(Debug, Clone)]
pub struct Transcript {
    lines: VecDeque<DisplayLine>,
    max_lines: usize,
}

impl Transcript {
    /// Create an empty transcript holding at most `max_lines` lines.
    pub fn new(max_lines: usize) -> Self {
        Self { lines: VecDeque::new(), max_lines }
    }

    /// Append a line at the tail, then trim.
    pub fn append(&mut self, line: DisplayLine) {
        self.lines.push_back(line);
        self.trim();
    }

    /// Concatenate `text` onto the tail line.
    ///
    /// Only inbound lines accept continuations. With no inbound tail the text
    /// is appended as a fresh inbound line instead, which keeps an outbound
    /// echo from ever absorbing device output.
    pub fn merge(&mut self, text: &str) {
        match self.lines.back_mut() {
            Some(tail) if tail.origin == Origin::Inbound => tail.text.push_str(text),
            _ => self.append(DisplayLine::inbound(text)),
        }
    }

    /// Apply framer output in order.
    pub fn apply(&mut self, fragments: Vec<Fragment>) {
        for fragment in fragments {
            match fragment.kind {
                FragmentKind::Continuation => self.merge(&fragment.text),
                FragmentKind::New => self.append(DisplayLine::inbound(fragment.text)),
            }
        }
    }

    /// Evict head lines until the cap holds.
    pub fn trim(&mut self) {
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    /// Lines in arrival order, oldest first.
    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &DisplayLine> + ExactSizeIterator {
        self.lines.iter()
    }

    /// The newest `count` lines, oldest first.
    ///
    /// Renderers use this to keep the view pinned to the tail.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &DisplayLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(count))
    }

    /// Most recent line. `None` if empty.
    pub fn last(&self) -> Option<&DisplayLine> {
        self.lines.back()
    }

    /// Number of lines currently held.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if no lines are held.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Capacity in lines.
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Render every line with its origin prefix, one per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(line.origin.prefix());
            out.push_str(&line.text);
        }
        out
    }
}
