//! termwire - terminal I/O protocol layer for remote-shell TUIs
//!
//! Sits between a remote-shell transport and the screen logic of a text
//! application:
//!
//! ```text
//! transport bytes ──▶ input::KeyDecoder ──▶ KeyEvent ──▶ Application
//!                                                            │
//! transport output ◀── Session::render ◀── layout::draw_box ◀┘
//! ```
//!
//! # Modules
//!
//! - **input**: byte stream to key events, with ESC disambiguation
//! - **layout**: bordered frames measured in visible columns
//! - **session**: per-connection state and the shared registry
//! - **server**: connection lifecycle, one task per connection
//! - **transport**: channel boundary with the transport, raw TCP adapter
//! - **app**: trait implemented by the screen logic
//! - **config**: TOML configuration
//! - **demo**: menu application served by the binary

pub mod app;
pub mod config;
pub mod demo;
pub mod input;
pub mod layout;
pub mod server;
pub mod session;
pub mod transport;

pub use app::{factory, AppFactory, Application, Flow};
pub use config::{Config, ConfigError};
pub use input::{KeyDecoder, KeyEvent};
pub use layout::{draw_box, draw_divider, BorderSpec, BorderStyle, Frame};
pub use server::{Server, ServerConfig, ServerError};
pub use session::{Session, SessionError, SessionId, SessionRegistry};
pub use transport::{ConnectionEvent, Geometry, TransportCommand};
