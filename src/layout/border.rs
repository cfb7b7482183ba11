//! Border glyph tables

use serde::{Deserialize, Serialize};

/// Border drawing style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Rounded,
    Sharp,
    Double,
    Heavy,
    Ascii,
}

impl BorderStyle {
    /// Look up a style by name. Unknown names fall back to rounded.
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "round" | "rounded" => BorderStyle::Rounded,
            "sharp" | "single" | "square" => BorderStyle::Sharp,
            "double" => BorderStyle::Double,
            "heavy" | "bold" | "thick" => BorderStyle::Heavy,
            "ascii" => BorderStyle::Ascii,
            _ => BorderStyle::Rounded,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BorderStyle::Rounded => "rounded",
            BorderStyle::Sharp => "sharp",
            BorderStyle::Double => "double",
            BorderStyle::Heavy => "heavy",
            BorderStyle::Ascii => "ascii",
        }
    }

    pub fn chars(&self) -> BorderChars {
        match self {
            BorderStyle::Rounded => BorderChars::rounded(),
            BorderStyle::Sharp => BorderChars::sharp(),
            BorderStyle::Double => BorderChars::double(),
            BorderStyle::Heavy => BorderChars::heavy(),
            BorderStyle::Ascii => BorderChars::ascii(),
        }
    }
}

/// Border characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
    pub t_down: char,
    pub t_up: char,
    /// Tee on the right edge, pointing left
    pub t_left: char,
    /// Tee on the left edge, pointing right
    pub t_right: char,
    pub cross: char,
}

impl BorderChars {
    pub fn rounded() -> Self {
        Self {
            top_left: '╭',
            top_right: '╮',
            bottom_left: '╰',
            bottom_right: '╯',
            ..Self::sharp()
        }
    }

    pub fn sharp() -> Self {
        Self {
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            horizontal: '─',
            vertical: '│',
            t_down: '┬',
            t_up: '┴',
            t_left: '┤',
            t_right: '├',
            cross: '┼',
        }
    }

    pub fn double() -> Self {
        Self {
            top_left: '╔',
            top_right: '╗',
            bottom_left: '╚',
            bottom_right: '╝',
            horizontal: '═',
            vertical: '║',
            t_down: '╦',
            t_up: '╩',
            t_left: '╣',
            t_right: '╠',
            cross: '╬',
        }
    }

    pub fn heavy() -> Self {
        Self {
            top_left: '┏',
            top_right: '┓',
            bottom_left: '┗',
            bottom_right: '┛',
            horizontal: '━',
            vertical: '┃',
            t_down: '┳',
            t_up: '┻',
            t_left: '┫',
            t_right: '┣',
            cross: '╋',
        }
    }

    pub fn ascii() -> Self {
        Self {
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
            horizontal: '-',
            vertical: '|',
            t_down: '+',
            t_up: '+',
            t_left: '+',
            t_right: '+',
            cross: '+',
        }
    }
}
