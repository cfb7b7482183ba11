//! Server: accepts transport connections and runs one task per connection
//!
//! - **connection**: per-connection lifecycle state machine

pub mod connection;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::AppFactory;
use crate::session::SessionRegistry;
use crate::transport::{tcp, Geometry, TransportLink};

pub use connection::{Connection, ConnectionState, SessionSettings};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept connection")]
    Accept(#[source] io::Error),
}

/// Server-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerConfig {
    pub session: SessionSettings,
}

impl ServerConfig {
    pub fn new(default_geometry: Geometry, escape_timeout: Duration) -> Self {
        Self {
            session: SessionSettings {
                default_geometry,
                escape_timeout,
            },
        }
    }
}

pub struct Server {
    registry: Arc<SessionRegistry>,
    config: ServerConfig,
    factory: AppFactory,
}

impl Server {
    pub fn new(config: ServerConfig, factory: AppFactory) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            config,
            factory,
        }
    }

    /// Sessions currently alive across all connections
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start handling a transport connection on its own task
    pub fn accept(&self, link: TransportLink) -> JoinHandle<()> {
        let connection = Connection::new(
            Arc::clone(&self.registry),
            self.config.session,
            Arc::clone(&self.factory),
            link.commands,
        );
        tokio::spawn(connection.run(link.events))
    }

    pub async fn bind_tcp<A>(addr: A) -> Result<TcpListener, ServerError>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let label = addr.to_string();
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr: label, source })
    }

    /// Accept raw TCP connections until the listener fails
    pub async fn serve_tcp(&self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            info!("Listening on {}", addr);
        }

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
                Err(e) => return Err(ServerError::Accept(e)),
            };
            self.spawn_tcp(stream, peer);
        }
    }

    fn spawn_tcp(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay for {} failed: {}", peer, e);
        }
        info!("Connection from {}", peer);
        let link = tcp::attach(stream, self.config.session.default_geometry);
        let handle = self.accept(link);
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                warn!("Connection task for {} failed: {}", peer, e);
            } else {
                debug!("Connection from {} finished", peer);
            }
        });
    }
}

/// Errors that only affect the connection being accepted
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{factory, Application, Flow};
    use crate::input::KeyEvent;
    use crate::session::Session;
    use crate::transport::{link, ConnectionEvent, TransportCommand};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Echoes each key name and exits on `q`
    struct Echo;

    impl Application for Echo {
        fn on_start(&mut self, session: &Session) -> Flow {
            let _ = session.write(format!("#{}", session.id()));
            Flow::Continue
        }

        fn on_key(&mut self, session: &Session, key: KeyEvent) -> Flow {
            if key == KeyEvent::Char('q') {
                return Flow::Exit;
            }
            let _ = session.write(key.to_string());
            Flow::Continue
        }
    }

    fn server() -> Server {
        Server::new(ServerConfig::default(), factory(|_| Echo))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_connections_are_isolated() {
        let server = server();
        let (first_link, mut first) = link(8);
        let (second_link, mut second) = link(8);
        let first_task = server.accept(first_link);
        let _second_task = server.accept(second_link);

        for (peer, greeting) in [(&mut first, b"#1"), (&mut second, b"#2")] {
            assert!(peer.send(ConnectionEvent::Ready).await);
            assert!(peer.send(ConnectionEvent::ShellRequest).await);
            assert_eq!(peer.recv().await, Some(TransportCommand::AcceptShell));
            assert_eq!(peer.recv().await, Some(TransportCommand::Write(greeting.to_vec())));
        }
        assert_eq!(server.registry().ids(), vec![1, 2]);

        assert!(first.send(ConnectionEvent::StreamClosed).await);
        assert_eq!(first.recv().await, Some(TransportCommand::Close));
        assert!(first.send(ConnectionEvent::ConnectionClosed).await);
        first_task.await.unwrap();
        assert_eq!(server.registry().ids(), vec![2]);

        assert!(second.send(ConnectionEvent::WindowChange { geometry: Geometry::new(40, 10) }).await);
        assert!(second.send(ConnectionEvent::Data(b"x".to_vec())).await);
        assert_eq!(second.recv().await, Some(TransportCommand::Write(b"CHAR('x')".to_vec())));
        let session = server.registry().get(2).unwrap();
        assert_eq!(session.geometry(), Geometry::new(40, 10));
        assert!(!session.is_destroyed());
    }

    #[tokio::test]
    async fn test_serve_tcp_end_to_end() {
        let listener = Server::bind_tcp("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(server());
        let serving = Arc::clone(&server);
        tokio::spawn(async move { serving.serve_tcp(listener).await });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 2];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"#1");

        client.write_all(b"\x1b[A").await.unwrap();
        let mut buf = [0u8; 2];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"UP");

        client.write_all(b"q").await.unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        while !server.registry().is_empty() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_bind_error_names_address() {
        let listener = Server::bind_tcp("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let err = Server::bind_tcp(addr.as_str()).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Failed to bind {}", addr));
    }
}
