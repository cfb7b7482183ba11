//! Frame layout: bordered, padded, width-constrained text blocks.
//!
//! - **ansi**: visible-width arithmetic that ignores escape sequences
//! - **border**: glyph tables for the built-in border styles
//! - **frame**: `draw_box` / `draw_divider` and the `Frame` they produce

pub mod ansi;
pub mod border;
pub mod frame;

pub use ansi::{strip_ansi, visible_width};
pub use border::{BorderChars, BorderStyle};
pub use frame::{draw_box, draw_divider, BorderSpec, Frame};
