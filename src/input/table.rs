//! Byte tables for the key decoder
//!
//! Multi-byte sequences are what xterm-compatible clients send for the
//! keys below, in both normal and application cursor mode.

use std::sync::LazyLock;

use super::key::{FunctionKey, KeyEvent};

/// Escape byte
pub const ESC: u8 = 0x1B;

/// Known escape sequences, in declaration order.
const SEQUENCES: &[(&[u8], KeyEvent)] = &[
    // Arrows: normal mode, then application cursor mode
    (b"\x1b[A", KeyEvent::Up),
    (b"\x1b[B", KeyEvent::Down),
    (b"\x1b[C", KeyEvent::Right),
    (b"\x1b[D", KeyEvent::Left),
    (b"\x1bOA", KeyEvent::Up),
    (b"\x1bOB", KeyEvent::Down),
    (b"\x1bOC", KeyEvent::Right),
    (b"\x1bOD", KeyEvent::Left),
    // Navigation
    (b"\x1b[H", KeyEvent::Home),
    (b"\x1bOH", KeyEvent::Home),
    (b"\x1b[1~", KeyEvent::Home),
    (b"\x1b[7~", KeyEvent::Home),
    (b"\x1b[F", KeyEvent::End),
    (b"\x1bOF", KeyEvent::End),
    (b"\x1b[4~", KeyEvent::End),
    (b"\x1b[8~", KeyEvent::End),
    (b"\x1b[2~", KeyEvent::Insert),
    (b"\x1b[3~", KeyEvent::Delete),
    (b"\x1b[5~", KeyEvent::PageUp),
    (b"\x1b[6~", KeyEvent::PageDown),
    // Function keys
    (b"\x1bOP", KeyEvent::F(FunctionKey::F1)),
    (b"\x1bOQ", KeyEvent::F(FunctionKey::F2)),
    (b"\x1bOR", KeyEvent::F(FunctionKey::F3)),
    (b"\x1bOS", KeyEvent::F(FunctionKey::F4)),
    (b"\x1b[11~", KeyEvent::F(FunctionKey::F1)),
    (b"\x1b[12~", KeyEvent::F(FunctionKey::F2)),
    (b"\x1b[13~", KeyEvent::F(FunctionKey::F3)),
    (b"\x1b[14~", KeyEvent::F(FunctionKey::F4)),
    (b"\x1b[15~", KeyEvent::F(FunctionKey::F5)),
    (b"\x1b[17~", KeyEvent::F(FunctionKey::F6)),
    (b"\x1b[18~", KeyEvent::F(FunctionKey::F7)),
    (b"\x1b[19~", KeyEvent::F(FunctionKey::F8)),
    (b"\x1b[20~", KeyEvent::F(FunctionKey::F9)),
    (b"\x1b[21~", KeyEvent::F(FunctionKey::F10)),
    (b"\x1b[23~", KeyEvent::F(FunctionKey::F11)),
    (b"\x1b[24~", KeyEvent::F(FunctionKey::F12)),
    // Shift + arrow: ESC [ 1 ; 2 <key>
    (b"\x1b[1;2A", KeyEvent::ShiftUp),
    (b"\x1b[1;2B", KeyEvent::ShiftDown),
    (b"\x1b[1;2C", KeyEvent::ShiftRight),
    (b"\x1b[1;2D", KeyEvent::ShiftLeft),
    // Ctrl + arrow: ESC [ 1 ; 5 <key>
    (b"\x1b[1;5A", KeyEvent::CtrlUp),
    (b"\x1b[1;5B", KeyEvent::CtrlDown),
    (b"\x1b[1;5C", KeyEvent::CtrlRight),
    (b"\x1b[1;5D", KeyEvent::CtrlLeft),
];

/// Sequences sorted longest-first, built once.
static BY_LENGTH: LazyLock<Vec<(&'static [u8], KeyEvent)>> = LazyLock::new(|| {
    let mut sorted = SEQUENCES.to_vec();
    // Stable sort keeps declaration order among equal lengths
    sorted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    sorted
});

/// All known sequences, longest first
pub fn sequences() -> &'static [(&'static [u8], KeyEvent)] {
    &BY_LENGTH
}

/// Longest known sequence that `buf` starts with.
///
/// Returns the event and the number of bytes it consumes.
pub fn match_sequence(buf: &[u8]) -> Option<(KeyEvent, usize)> {
    BY_LENGTH
        .iter()
        .find(|(seq, _)| buf.starts_with(seq))
        .map(|(seq, key)| (*key, seq.len()))
}

/// Map a single control byte. ESC is included for flushing.
pub fn control_key(byte: u8) -> Option<KeyEvent> {
    match byte {
        b'\r' | b'\n' => Some(KeyEvent::Enter),
        0x7F | 0x08 => Some(KeyEvent::Backspace),
        b'\t' => Some(KeyEvent::Tab),
        ESC => Some(KeyEvent::Escape),
        0x01 => Some(KeyEvent::CtrlA),
        0x02 => Some(KeyEvent::CtrlB),
        0x03 => Some(KeyEvent::CtrlC),
        0x04 => Some(KeyEvent::CtrlD),
        0x05 => Some(KeyEvent::CtrlE),
        0x06 => Some(KeyEvent::CtrlF),
        0x0B => Some(KeyEvent::CtrlK),
        0x15 => Some(KeyEvent::CtrlU),
        0x1A => Some(KeyEvent::CtrlZ),
        _ => None,
    }
}
