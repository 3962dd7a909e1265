//! Line framer for the inbound byte stream.
//!
//! The serial bridge delivers notifications of arbitrary size with no message
//! boundaries. Line terminators are advisory. The framer decides, chunk by
//! chunk, which text continues the line already on screen and which text
//! starts a new one:
//!
//! - a chunk may continue at most one prior line, and only with its first
//!   fragment
//! - continuation requires the open line to be younger than the idle
//!   threshold and not explicitly terminated
//! - a chunk that starts with a terminator always starts a new line
//!
//! Carriage returns are stripped before framing, so `\r\n` and `\n` behave
//! identically. Fragments that are empty or begin with NUL are dropped; the
//! bridge pads notifications with them, and a chunk made only of such padding
//! leaves the open line as it was.

use std::{borrow::Cow, ops::Sub, time::Duration};

const TERMINATOR: char = '\n';

/// How a fragment relates to the line already on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Concatenate onto the open line.
    Continuation,
    /// Start a new line.
    New,
}

/// One displayable piece of an inbound chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Fragment text without terminator.
    pub text: String,
    /// Placement relative to the open line.
    pub kind: FragmentKind,
}

/// Stateful chunk-to-line framer.
///
/// Generic over the instant type so the idle threshold can be tested on a
/// virtual clock.
#[derive(Debug, Clone)]
pub struct Framer<I> {
    threshold: Duration,
    /// Arrival time of the last unterminated chunk. `None` once the open
    /// line has been closed by a terminator, an outbound line or a reset.
    last_activity: Option<I>,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
}

impl<I> Framer<I>
where
    I: Copy + Sub<Output = Duration>,
{
    /// Create a framer with the given continuation threshold.
    pub fn new(threshold: Duration) -> Self {
        Self { threshold, last_activity: None, pending: Vec::new() }
    }

    /// Frame one inbound chunk that arrived at `now`.
    pub fn push(&mut self, bytes: &[u8], now: I) -> Vec<Fragment> {
        let decoded = self.decode(bytes);
        let text: Cow<'_, str> = if decoded.contains('\r') {
            Cow::Owned(decoded.replace('\r', ""))
        } else {
            Cow::Borrowed(&decoded)
        };
        if text.is_empty() {
            return vec![];
        }

        let mut can_continue = !text.starts_with(TERMINATOR) && self.within_open_line(now);

        let mut fragments = Vec::new();
        for raw in text.split(TERMINATOR) {
            if raw.is_empty() || raw.starts_with('\0') {
                continue;
            }

            let kind = if can_continue { FragmentKind::Continuation } else { FragmentKind::New };
            fragments.push(Fragment { text: raw.to_string(), kind });
            can_continue = false;
        }

        if text.ends_with(TERMINATOR) {
            self.last_activity = None;
        } else if !fragments.is_empty() {
            self.last_activity = Some(now);
        }

        fragments
    }

    /// Close the open line so the next chunk starts fresh.
    pub fn close_line(&mut self) {
        self.last_activity = None;
    }

    /// Forget all state, including any partial UTF-8 sequence.
    pub fn reset(&mut self) {
        self.last_activity = None;
        self.pending.clear();
    }

    /// True if a chunk arriving at `now` may continue the open line.
    pub fn within_open_line(&self, now: I) -> bool {
        self.last_activity.is_some_and(|last| now - last < self.threshold)
    }

    /// Decode `bytes`, holding back an incomplete trailing UTF-8 sequence for
    /// the next chunk. Invalid sequences decode to U+FFFD.
    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                },
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = tail.get(len..).unwrap_or_default();
                        },
                        None => {
                            self.pending = tail.to_vec();
                            break;
                        },
                    }
                },
            }
        }
        out
    }
}
