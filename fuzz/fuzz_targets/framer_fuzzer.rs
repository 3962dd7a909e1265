//! Fuzz target for the line framer and transcript
//!
//! Notification payloads are arbitrary bytes from an arbitrary device
//! (HIGH priority)
//!
//! # Strategy
//!
//! - Random chunks: arbitrary bytes, including NUL, CR and broken UTF-8
//! - Random gaps: inter-chunk delays on both sides of the idle threshold
//! - Small capacity: transcript cap between 1 and 16 so eviction is constant
//!
//! # Invariants
//!
//! - Transcript never exceeds its cap after a trim
//! - No stored line contains a line feed or carriage return
//! - No stored line starts with NUL or is empty
//! - Every surviving line is inbound
//! - NEVER panic on malformed input

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use houston_core::{Framer, Origin, Transcript};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Chunk {
    gap_ms: u16,
    bytes: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    max_lines: u8,
    threshold_ms: u16,
    chunks: Vec<Chunk>,
}

fuzz_target!(|input: Input| {
    let max_lines = usize::from(input.max_lines % 16) + 1;
    let mut framer = Framer::new(Duration::from_millis(u64::from(input.threshold_ms)));
    let mut transcript = Transcript::new(max_lines);
    let mut now = Duration::ZERO;

    for chunk in input.chunks {
        now += Duration::from_millis(u64::from(chunk.gap_ms));
        let fragments = framer.push(&chunk.bytes, now);
        transcript.apply(fragments);
        transcript.trim();

        assert!(transcript.len() <= max_lines, "transcript exceeded its cap");
    }

    for line in transcript.lines() {
        assert_eq!(line.origin, Origin::Inbound);
        assert!(!line.text.contains(['\n', '\r']), "terminator leaked: {:?}", line.text);
        assert!(!line.text.is_empty() && !line.text.starts_with('\0'), "padding kept: {:?}", line.text);
    }
});
