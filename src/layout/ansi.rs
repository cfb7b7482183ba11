//! ANSI-aware width arithmetic
//!
//! Escape sequences (CSI, OSC and two-byte ESC sequences) take no columns.
//! Everything else is measured in terminal columns.

use unicode_width::UnicodeWidthChar;

/// SGR reset
pub const RESET: &str = "\x1b[0m";

/// Byte length of the escape sequence at the start of `s`.
///
/// `s` must start with ESC. An unterminated sequence runs to the end.
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.get(1) {
        // CSI: parameters and intermediates, then a final byte in 0x40..=0x7E
        Some(b'[') => bytes[2..]
            .iter()
            .position(|b| (0x40..=0x7E).contains(b))
            .map_or(bytes.len(), |i| i + 3),
        // OSC: terminated by BEL or ST (ESC \)
        Some(b']') => {
            let mut i = 2;
            while i < bytes.len() {
                match bytes[i] {
                    0x07 => return i + 1,
                    0x1B if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
                    _ => i += 1,
                }
            }
            bytes.len()
        }
        Some(_) => {
            // ESC followed by one character
            s[1..].chars().next().map_or(1, |c| 1 + c.len_utf8())
        }
        None => 1,
    }
}

/// A run of a styled string
enum Segment<'a> {
    Code(&'a str),
    Text(char),
}

fn segments(s: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let ch = rest.chars().next()?;
        if ch == '\x1b' {
            let len = escape_len(rest);
            let (code, tail) = rest.split_at(len);
            rest = tail;
            Some(Segment::Code(code))
        } else {
            rest = &rest[ch.len_utf8()..];
            Some(Segment::Text(ch))
        }
    })
}

fn is_reset(code: &str) -> bool {
    code == "\x1b[0m" || code == "\x1b[m"
}

/// Columns `s` occupies on screen
pub fn visible_width(s: &str) -> usize {
    segments(s)
        .map(|seg| match seg {
            Segment::Code(_) => 0,
            Segment::Text(ch) => ch.width().unwrap_or(0),
        })
        .sum()
}

/// `s` with every escape sequence removed
pub fn strip_ansi(s: &str) -> String {
    segments(s)
        .filter_map(|seg| match seg {
            Segment::Code(_) => None,
            Segment::Text(ch) => Some(ch),
        })
        .collect()
}

/// Cut `s` to at most `width` visible columns.
///
/// Escape sequences are copied whole. If text was cut while a style was
/// active, a reset is appended so the style does not bleed past the cut.
pub fn truncate(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut used = 0;
    let mut styled = false;
    let mut cut = false;

    for seg in segments(s) {
        match seg {
            Segment::Code(code) => {
                styled = !is_reset(code);
                out.push_str(code);
            }
            Segment::Text(ch) => {
                let w = ch.width().unwrap_or(0);
                if used + w > width {
                    cut = true;
                    break;
                }
                used += w;
                out.push(ch);
            }
        }
    }

    if cut && styled {
        out.push_str(RESET);
    }
    out
}

/// Append spaces until `s` is `width` visible columns wide
pub fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_width(s));
    let mut out = String::with_capacity(s.len() + fill);
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(fill));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_width() {
        assert_eq!(visible_width("hello"), 5);
        assert_eq!(visible_width("\x1b[31mred\x1b[0m"), 3);
        assert_eq!(visible_width("\x1b[1;38;5;208mX\x1b[m"), 1);
        assert_eq!(visible_width("\x1b]0;title\x07ok"), 2);
        assert_eq!(visible_width("\x1b]8;;http://x\x1b\\link"), 4);
        assert_eq!(visible_width("日本"), 4);
        assert_eq!(visible_width(""), 0);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[32mgo\x1b[0m!"), "go!");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_truncate_keeps_codes() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("\x1b[31mabcdef", 2), "\x1b[31mab\x1b[0m");
        assert_eq!(truncate("\x1b[31mab\x1b[0mcdef", 3), "\x1b[31mab\x1b[0mc");
        // No cut, no reset
        assert_eq!(truncate("\x1b[31mab", 5), "\x1b[31mab");
    }

    #[test]
    fn test_truncate_wide_char_boundary() {
        assert_eq!(truncate("日本語", 3), "日");
        assert_eq!(visible_width(&truncate("日本語", 3)), 2);
    }

    #[test]
    fn test_pad_right() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("\x1b[1mab\x1b[0m", 3), "\x1b[1mab\x1b[0m ");
        assert_eq!(pad_right("abcd", 2), "abcd");
    }

    #[test]
    fn test_unterminated_escape() {
        assert_eq!(visible_width("ab\x1b[31"), 2);
        assert_eq!(visible_width("ab\x1b"), 2);
    }
}
