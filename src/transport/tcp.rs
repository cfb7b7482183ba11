//! Raw TCP transport
//!
//! Each socket is treated as an already-authenticated connection that
//! immediately asks for a shell. There is no PTY negotiation on a raw
//! socket, so the configured default geometry is reported instead.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use super::{link, ConnectionEvent, Geometry, TransportCommand, TransportLink};

const READ_BUFFER: usize = 1024;
const EVENT_QUEUE: usize = 64;

/// Bridge a TCP stream to a transport link.
///
/// Spawns one reader and one writer task. The writer reports
/// `ConnectionClosed` once the connection asks to close or goes away.
pub fn attach(stream: TcpStream, geometry: Geometry) -> TransportLink {
    let (link, peer) = link(EVENT_QUEUE);
    let peer_addr = stream.peer_addr().ok();
    let (mut reader, mut writer) = stream.into_split();

    let events = peer.events.clone();
    let read_task = tokio::spawn(async move {
        let handshake = [
            ConnectionEvent::Ready,
            ConnectionEvent::PtyRequest { geometry },
            ConnectionEvent::ShellRequest,
        ];
        for event in handshake {
            if events.send(event).await.is_err() {
                return;
            }
        }

        let mut buffer = vec![0u8; READ_BUFFER];
        loop {
            let event = match reader.read(&mut buffer).await {
                Ok(0) => ConnectionEvent::StreamClosed,
                Ok(n) => ConnectionEvent::Data(buffer[..n].to_vec()),
                Err(e) => ConnectionEvent::StreamError(e.to_string()),
            };
            let last = !matches!(event, ConnectionEvent::Data(_));
            if events.send(event).await.is_err() || last {
                break;
            }
        }
    });

    let mut commands = peer.commands;
    let events = peer.events;
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                TransportCommand::Write(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        warn!("Write to {:?} failed: {}", peer_addr, e);
                    }
                }
                TransportCommand::Close => break,
                TransportCommand::AcceptShell => trace!("Shell accepted for {:?}", peer_addr),
                TransportCommand::Reject(kind) => debug!("Rejected {:?} request from {:?}", kind, peer_addr),
            }
        }

        read_task.abort();
        if let Err(e) = writer.shutdown().await {
            debug!("Shutdown of {:?} failed: {}", peer_addr, e);
        }
        let _ = events.send(ConnectionEvent::ConnectionClosed).await;
    });

    link
}
