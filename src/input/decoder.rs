//! Byte stream to key event decoder
//!
//! The decoder is driven by its owner: bytes go in through [`KeyDecoder::feed`],
//! and when a lone escape byte (or an unfinished escape sequence) is buffered
//! the decoder arms a deadline instead of deciding. The owner sleeps until
//! [`KeyDecoder::deadline`] and then calls [`KeyDecoder::expire`]. New input
//! always cancels the deadline before the buffer is looked at again, so a
//! late wake-up can never classify bytes that fresh data already completed.
//!
//! ```text
//! IDLE ──ESC──▶ ESCAPE_PENDING ──more bytes──▶ ESCAPE_SEQUENCE
//!   ▲                │ timeout                    │ match / impossible / timeout
//!   └────────────────┴────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::time::Instant;

use super::key::KeyEvent;
use super::table::{self, ESC};

/// Default window for telling a bare ESC apart from a sequence prefix
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// An unmatched `ESC [` / `ESC O` buffer shorter than this may still complete
const MAX_PENDING_SEQUENCE: usize = 6;

/// Result of classifying the front of a non-escape buffer
enum Step {
    /// Emit a key, consuming this many bytes
    Emit(KeyEvent, usize),
    /// Drop this many bytes
    Skip(usize),
    /// A UTF-8 character is split across chunks
    Incomplete,
}

/// Decoder state: pending bytes plus at most one armed deadline.
#[derive(Debug)]
pub struct KeyDecoder {
    buffer: Vec<u8>,
    deadline: Option<Instant>,
    timeout: Duration,
    destroyed: bool,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::with_timeout(ESCAPE_TIMEOUT)
    }

    /// Create a decoder with a custom escape disambiguation window
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            buffer: Vec::with_capacity(16),
            deadline: None,
            timeout,
            destroyed: false,
        }
    }

    /// Feed a chunk of raw bytes.
    ///
    /// Returns every key that can be decided now, in input order. Bytes that
    /// may still belong to an escape sequence stay buffered and arm the
    /// deadline.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        if self.destroyed {
            return events;
        }

        // Cancel before re-evaluating
        self.deadline = None;
        self.buffer.extend_from_slice(bytes);
        self.process(now, &mut events);
        events
    }

    /// When the owner should call [`expire`](Self::expire), if at all
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire the disambiguation timer if it is due.
    ///
    /// Everything still buffered is flushed byte by byte: a lone ESC becomes
    /// `Escape`, an unrecognized sequence degrades to its characters.
    pub fn expire(&mut self, now: Instant) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        match self.deadline {
            Some(deadline) if now >= deadline && !self.destroyed => {}
            _ => return events,
        }

        self.deadline = None;
        tracing::trace!(pending = self.buffer.len(), "escape timeout, flushing buffer");
        self.flush(&mut events);
        events
    }

    /// Cancel the deadline and discard buffered bytes. Idempotent.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.deadline = None;
        self.buffer.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Bytes not yet classified
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn arm(&mut self, now: Instant) {
        let deadline = now
            .checked_add(self.timeout)
            .or_else(|| now.checked_add(ESCAPE_TIMEOUT))
            .unwrap_or(now);
        self.deadline = Some(deadline);
    }

    fn process(&mut self, now: Instant, events: &mut Vec<KeyEvent>) {
        let mut pos = 0;

        while pos < self.buffer.len() {
            let rest = &self.buffer[pos..];

            if rest[0] == ESC {
                if rest.len() == 1 {
                    // ESCAPE_PENDING
                    self.arm(now);
                    break;
                }
                if let Some((key, len)) = table::match_sequence(rest) {
                    events.push(key);
                    pos += len;
                    continue;
                }
                if Self::may_complete(rest) {
                    self.arm(now);
                    break;
                }
                // Cannot become a known sequence: the ESC stands alone
                events.push(KeyEvent::Escape);
                pos += 1;
                continue;
            }

            match Self::classify(rest) {
                Step::Emit(key, len) => {
                    events.push(key);
                    pos += len;
                }
                Step::Skip(len) => pos += len,
                Step::Incomplete => break,
            }
        }

        self.buffer.drain(..pos);
    }

    fn flush(&mut self, events: &mut Vec<KeyEvent>) {
        let mut pos = 0;

        while pos < self.buffer.len() {
            let rest = &self.buffer[pos..];
            if rest[0] == ESC {
                events.push(KeyEvent::Escape);
                pos += 1;
                continue;
            }
            match Self::classify(rest) {
                Step::Emit(key, len) => {
                    events.push(key);
                    pos += len;
                }
                Step::Skip(len) => pos += len,
                Step::Incomplete => break,
            }
        }

        self.buffer.clear();
    }

    /// Short `ESC [` / `ESC O` buffers may still grow into a known sequence
    fn may_complete(rest: &[u8]) -> bool {
        rest.len() < MAX_PENDING_SEQUENCE && matches!(rest.get(1), Some(b'[') | Some(b'O'))
    }

    /// Classify the first character of a buffer that does not start with ESC
    fn classify(rest: &[u8]) -> Step {
        let b = rest[0];

        // ASCII
        if b < 0x80 {
            if (0x20..0x7F).contains(&b) {
                return Step::Emit(KeyEvent::Char(b as char), 1);
            }
            return match table::control_key(b) {
                Some(key) => Step::Emit(key, 1),
                None => Step::Skip(1),
            };
        }

        // UTF-8 multi-byte sequence
        let seq_len = if b & 0xE0 == 0xC0 {
            2
        } else if b & 0xF0 == 0xE0 {
            3
        } else if b & 0xF8 == 0xF0 {
            4
        } else {
            // Stray continuation or invalid lead byte
            return Step::Skip(1);
        };

        if rest.len() < seq_len {
            // Only continuation bytes can still complete the character
            if rest[1..].iter().all(|&c| c & 0xC0 == 0x80) {
                return Step::Incomplete;
            }
            return Step::Skip(1);
        }

        match std::str::from_utf8(&rest[..seq_len]).ok().and_then(|s| s.chars().next()) {
            Some(ch) if ch.is_control() => Step::Skip(seq_len),
            Some(ch) => Step::Emit(KeyEvent::Char(ch), seq_len),
            None => Step::Skip(1),
        }
    }
}
