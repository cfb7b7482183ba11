//! Terminal input decoding.
//!
//! - **key**: the closed set of key events handed to applications
//! - **table**: single-byte control codes and known escape sequences
//! - **decoder**: byte stream state machine with escape disambiguation
//!
//! # Data Flow
//!
//! ```text
//! transport bytes ──▶ KeyDecoder::feed ──▶ Vec<KeyEvent>
//!                        │ deadline armed
//!                        ▼
//!              owner sleeps ──▶ KeyDecoder::expire ──▶ Vec<KeyEvent>
//! ```

pub mod decoder;
pub mod key;
pub mod table;

pub use decoder::{KeyDecoder, ESCAPE_TIMEOUT};
pub use key::{FunctionKey, KeyEvent, Modifiers};
