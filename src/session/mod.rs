//! Session management
//!
//! A session is the server-side state of one interactive shell: output
//! handle, terminal geometry, its own key decoder and a destroyed flag.
//! The connection task is the only writer; the registry hands out shared
//! references for lookup.

pub mod registry;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::input::{KeyDecoder, KeyEvent};
use crate::layout::Frame;
use crate::transport::{Geometry, TransportCommand};

pub use registry::SessionRegistry;

/// Identifier of a session, unique for the lifetime of a registry
pub type SessionId = u64;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session {0} is destroyed")]
    Destroyed(SessionId),

    #[error("Output channel of session {0} is closed")]
    Closed(SessionId),

    #[error("Failed to encode output")]
    Encode(#[from] fmt::Error),
}

/// Mutable part of a session, guarded as one unit
#[derive(Debug)]
struct SessionState {
    geometry: Geometry,
    decoder: KeyDecoder,
    destroyed: bool,
}

/// An interactive shell session
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    output: mpsc::UnboundedSender<TransportCommand>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a new session
    pub fn new(
        id: SessionId,
        geometry: Geometry,
        escape_timeout: Duration,
        output: mpsc::UnboundedSender<TransportCommand>,
    ) -> Self {
        Self {
            id,
            output,
            state: Mutex::new(SessionState {
                geometry,
                decoder: KeyDecoder::with_timeout(escape_timeout),
                destroyed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn geometry(&self) -> Geometry {
        self.state().geometry
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    /// Update the geometry. No-op once destroyed.
    pub fn resize(&self, geometry: Geometry) -> bool {
        let mut state = self.state();
        if state.destroyed {
            return false;
        }
        state.geometry = geometry;
        true
    }

    /// Decode input bytes into key events
    pub fn feed(&self, bytes: &[u8], now: Instant) -> Vec<KeyEvent> {
        let mut state = self.state();
        if state.destroyed {
            return Vec::new();
        }
        state.decoder.feed(bytes, now)
    }

    /// Deadline of the decoder's escape timer, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.state().decoder.deadline()
    }

    /// Fire the decoder's escape timer if due
    pub fn expire(&self, now: Instant) -> Vec<KeyEvent> {
        let mut state = self.state();
        if state.destroyed {
            return Vec::new();
        }
        state.decoder.expire(now)
    }

    /// Send raw bytes to the client
    pub fn write(&self, bytes: impl Into<Vec<u8>>) -> Result<(), SessionError> {
        if self.is_destroyed() {
            return Err(SessionError::Destroyed(self.id));
        }
        self.output
            .send(TransportCommand::Write(bytes.into()))
            .map_err(|_| SessionError::Closed(self.id))
    }

    /// Replace the client's screen with `frame`
    pub fn render(&self, frame: &Frame) -> Result<(), SessionError> {
        let mut out = String::new();
        Clear(ClearType::All).write_ansi(&mut out)?;
        MoveTo(0, 0).write_ansi(&mut out)?;
        out.push_str(&frame.to_output());
        self.write(out)
    }

    /// Mark destroyed and stop the decoder.
    ///
    /// Returns true only for the call that actually destroyed the session.
    pub fn destroy(&self) -> bool {
        let mut state = self.state();
        if state.destroyed {
            return false;
        }
        state.destroyed = true;
        state.decoder.destroy();
        true
    }
}
