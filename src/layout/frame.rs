//! Bordered frame rendering
//!
//! All width arithmetic uses visible width, so content lines may carry
//! their own color codes.

use std::fmt;

use crossterm::style::ContentStyle;

use super::ansi::{pad_right, truncate, visible_width};
use super::border::BorderStyle;

/// How to draw a box around content lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderSpec {
    pub style: BorderStyle,
    /// Applied to the border glyphs
    pub color: ContentStyle,
    pub title: Option<String>,
    /// Fixed total width including both vertical borders
    pub width: Option<usize>,
    pub padding: usize,
}

impl Default for BorderSpec {
    fn default() -> Self {
        Self {
            style: BorderStyle::default(),
            color: ContentStyle::new(),
            title: None,
            width: None,
            padding: 1,
        }
    }
}

impl BorderSpec {
    pub fn new(style: BorderStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: BorderStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_color(mut self, color: ContentStyle) -> Self {
        self.color = color;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    /// Apply the border color to a run of glyphs
    fn paint(&self, glyphs: &str) -> String {
        if self.color == ContentStyle::new() {
            glyphs.to_string()
        } else {
            self.color.apply(glyphs).to_string()
        }
    }
}

/// Rendered rows, one per terminal line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    lines: Vec<String>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn height(&self) -> usize {
        self.lines.len()
    }

    /// Widest row in visible columns
    pub fn width(&self) -> usize {
        self.lines.iter().map(|l| visible_width(l)).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rows joined for a raw-mode terminal
    pub fn to_output(&self) -> String {
        self.lines.join("\r\n")
    }
}

impl From<Vec<String>> for Frame {
    fn from(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl IntoIterator for Frame {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Fill `width` columns with `fill`, centering ` label ` if given.
///
/// Odd leftover space goes to the right. Returns the left run, the label
/// and the right run separately so callers can color the runs only.
fn centered(fill: char, width: usize, label: Option<&str>) -> (String, String, String) {
    let label = match label {
        Some(text) if !text.is_empty() && width > 0 => truncate(&format!(" {} ", text), width),
        _ => String::new(),
    };
    let remaining = width.saturating_sub(visible_width(&label));
    let left = remaining / 2;
    let right = remaining - left;
    (
        std::iter::repeat(fill).take(left).collect(),
        label,
        std::iter::repeat(fill).take(right).collect(),
    )
}

/// Draw a border around `lines`.
pub fn draw_box<S: AsRef<str>>(lines: &[S], spec: &BorderSpec) -> Frame {
    let chars = spec.style.chars();

    let inner_width = match spec.width {
        Some(width) => width.saturating_sub(2),
        None => {
            let widest = lines.iter().map(|l| visible_width(l.as_ref())).max().unwrap_or(0);
            widest + spec.padding * 2
        }
    };
    let padding = spec.padding.min(inner_width / 2);
    let content_width = inner_width - padding * 2;
    let pad = " ".repeat(padding);

    let mut frame = Frame::new();

    // Top border
    let (left, title, right) = centered(chars.horizontal, inner_width, spec.title.as_deref());
    frame.push(format!(
        "{}{}{}",
        spec.paint(&format!("{}{}", chars.top_left, left)),
        title,
        spec.paint(&format!("{}{}", right, chars.top_right)),
    ));

    // Content
    let vertical = spec.paint(&chars.vertical.to_string());
    for line in lines {
        let line = line.as_ref();
        let body = if visible_width(line) > content_width {
            truncate(line, content_width)
        } else {
            line.to_string()
        };
        frame.push(format!(
            "{}{}{}{}{}",
            vertical,
            pad,
            pad_right(&body, content_width),
            pad,
            vertical
        ));
    }

    // Bottom border
    let run: String = std::iter::repeat(chars.horizontal).take(inner_width).collect();
    frame.push(spec.paint(&format!("{}{}{}", chars.bottom_left, run, chars.bottom_right)));

    frame
}

/// Draw a horizontal divider for a box with the given inner width.
pub fn draw_divider(inner_width: usize, spec: &BorderSpec, label: Option<&str>) -> String {
    let chars = spec.style.chars();
    let (left, label, right) = centered(chars.horizontal, inner_width, label);
    format!(
        "{}{}{}",
        spec.paint(&format!("{}{}", chars.t_right, left)),
        label,
        spec.paint(&format!("{}{}", right, chars.t_left)),
    )
}
