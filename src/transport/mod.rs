//! Boundary with the remote-shell transport.
//!
//! The transport (SSH library, raw socket, test harness) owns handshakes,
//! authentication and channel framing. It talks to a connection through a
//! pair of channels:
//!
//! ```text
//! TransportPeer ──ConnectionEvent──▶ TransportLink ──▶ Connection task
//! TransportPeer ◀──TransportCommand── Session / Connection
//! ```
//!
//! - **tcp**: raw TCP adapter used by the binary

pub mod tcp;

use tokio::sync::mpsc;

/// Terminal size in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl Geometry {
    /// Zero dimensions are clamped to 1
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }
}

/// What the transport reports about one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Authentication succeeded
    Ready,
    /// Pseudo-terminal negotiated with an initial size
    PtyRequest { geometry: Geometry },
    /// Interactive shell requested
    ShellRequest,
    /// Non-interactive command requested
    ExecRequest { command: String },
    /// Client window resized
    WindowChange { geometry: Geometry },
    /// Raw input bytes, arbitrarily chunked
    Data(Vec<u8>),
    /// Shell stream reached EOF
    StreamClosed,
    /// Shell stream failed
    StreamError(String),
    /// The whole connection is gone
    ConnectionClosed,
}

/// Request kinds that can be refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Shell,
    Exec,
}

/// What a connection asks of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    AcceptShell,
    Reject(RequestKind),
    /// Bytes for the client's terminal
    Write(Vec<u8>),
    /// Terminate the connection
    Close,
}

/// Server side of a transport connection
#[derive(Debug)]
pub struct TransportLink {
    pub events: mpsc::Receiver<ConnectionEvent>,
    pub commands: mpsc::UnboundedSender<TransportCommand>,
}

/// Transport side of a connection
#[derive(Debug)]
pub struct TransportPeer {
    pub events: mpsc::Sender<ConnectionEvent>,
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
}

impl TransportPeer {
    /// Report an event. Returns false once the connection task is gone.
    pub async fn send(&self, event: ConnectionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Next command, `None` once every sender is dropped
    pub async fn recv(&mut self) -> Option<TransportCommand> {
        self.commands.recv().await
    }

    /// Commands already queued, without waiting
    pub fn drain(&mut self) -> Vec<TransportCommand> {
        let mut out = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            out.push(command);
        }
        out
    }
}

/// Create a connected link/peer pair
pub fn link(capacity: usize) -> (TransportLink, TransportPeer) {
    let (event_tx, event_rx) = mpsc::channel(capacity);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    (
        TransportLink {
            events: event_rx,
            commands: command_tx,
        },
        TransportPeer {
            events: event_tx,
            commands: command_rx,
        },
    )
}
