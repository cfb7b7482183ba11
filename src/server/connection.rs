//! Per-connection lifecycle
//!
//! ```text
//! Connected ──Ready──▶ Authenticated ──ShellRequest──▶ SessionReady
//!                                                        │ WindowChange*
//!   StreamClosed / StreamError / ConnectionClosed / Exit ▼
//!                                                    Terminated
//! ```
//!
//! Terminated is absorbing. Teardown destroys the session before anything
//! else, so the decoder cannot emit once the session is marked destroyed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::app::{AppFactory, Application, Flow};
use crate::input::KeyEvent;
use crate::session::{Session, SessionId, SessionRegistry};
use crate::transport::{ConnectionEvent, Geometry, RequestKind, TransportCommand};

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Authenticated,
    SessionReady,
    Terminated,
}

/// Settings applied to every session a connection creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Used when the client never negotiated a PTY
    pub default_geometry: Geometry,
    pub escape_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_geometry: Geometry::default(),
            escape_timeout: crate::input::ESCAPE_TIMEOUT,
        }
    }
}

/// State machine for one transport connection
pub struct Connection {
    state: ConnectionState,
    registry: Arc<SessionRegistry>,
    settings: SessionSettings,
    factory: AppFactory,
    commands: mpsc::UnboundedSender<TransportCommand>,
    /// Geometry negotiated before the shell started
    pty: Option<Geometry>,
    session: Option<Arc<Session>>,
    app: Option<Box<dyn Application>>,
    closed: bool,
}

impl Connection {
    pub fn new(
        registry: Arc<SessionRegistry>,
        settings: SessionSettings,
        factory: AppFactory,
        commands: mpsc::UnboundedSender<TransportCommand>,
    ) -> Self {
        Self {
            state: ConnectionState::Connected,
            registry,
            settings,
            factory,
            commands,
            pty: None,
            session: None,
            app: None,
            closed: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id())
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// True once the transport reported the connection gone
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// When the session's escape timer wants servicing
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            ConnectionState::SessionReady => self.session.as_ref().and_then(|s| s.deadline()),
            _ => None,
        }
    }

    /// Drive the connection until the transport goes away
    pub async fn run(mut self, mut events: mpsc::Receiver<ConnectionEvent>) {
        while !self.closed {
            let deadline = self.deadline();
            tokio::select! {
                event = events.recv() => {
                    let event = event.unwrap_or(ConnectionEvent::ConnectionClosed);
                    self.handle(event, Instant::now());
                }
                _ = sleep_until(deadline) => self.expire(Instant::now()),
            }
        }
    }

    /// Apply one transport event
    pub fn handle(&mut self, event: ConnectionEvent, now: Instant) {
        if self.state == ConnectionState::Terminated && event != ConnectionEvent::ConnectionClosed {
            trace!("Ignoring {:?} after termination", event);
            return;
        }

        match event {
            ConnectionEvent::Ready => {
                if self.state == ConnectionState::Connected {
                    self.state = ConnectionState::Authenticated;
                }
            }
            ConnectionEvent::PtyRequest { geometry } => match self.state {
                // Only window changes resize a running session
                ConnectionState::SessionReady => {
                    debug!("Ignoring PTY request for running session {:?}", self.session_id());
                }
                _ => self.pty = Some(geometry),
            },
            ConnectionEvent::ShellRequest => self.start_shell(),
            ConnectionEvent::ExecRequest { command } => {
                warn!("Rejecting exec request: {}", command);
                self.send(TransportCommand::Reject(RequestKind::Exec));
            }
            ConnectionEvent::WindowChange { geometry } => match self.state {
                ConnectionState::SessionReady => self.resize(geometry),
                _ => self.pty = Some(geometry),
            },
            ConnectionEvent::Data(bytes) => {
                let keys = match (&self.session, self.state) {
                    (Some(session), ConnectionState::SessionReady) => session.feed(&bytes, now),
                    _ => {
                        trace!("Dropping {} bytes before shell start", bytes.len());
                        return;
                    }
                };
                self.dispatch(keys);
            }
            ConnectionEvent::StreamClosed => {
                info!("Stream closed for session {:?}", self.session_id());
                self.terminate();
            }
            ConnectionEvent::StreamError(error) => {
                warn!("Stream error for session {:?}: {}", self.session_id(), error);
                self.terminate();
            }
            ConnectionEvent::ConnectionClosed => {
                self.closed = true;
                self.close_fallback();
            }
        }
    }

    /// Service the escape timer
    pub fn expire(&mut self, now: Instant) {
        if self.state != ConnectionState::SessionReady {
            return;
        }
        let keys = match &self.session {
            Some(session) => session.expire(now),
            None => return,
        };
        self.dispatch(keys);
    }

    fn start_shell(&mut self) {
        match self.state {
            ConnectionState::Authenticated => {}
            ConnectionState::Connected => {
                warn!("Shell requested before authentication");
                self.send(TransportCommand::Reject(RequestKind::Shell));
                return;
            }
            _ => {
                warn!("Duplicate shell request for session {:?}", self.session_id());
                self.send(TransportCommand::Reject(RequestKind::Shell));
                return;
            }
        }

        let id = self.registry.next_id();
        let geometry = self.pty.take().unwrap_or(self.settings.default_geometry);
        let session = Arc::new(Session::new(
            id,
            geometry,
            self.settings.escape_timeout,
            self.commands.clone(),
        ));

        if !self.registry.insert(Arc::clone(&session)) {
            // Identifiers are never reused, so this is a registry bug
            warn!("Session {} already registered", id);
            self.send(TransportCommand::Reject(RequestKind::Shell));
            return;
        }

        info!("Session {} started ({}x{})", id, geometry.cols, geometry.rows);
        self.send(TransportCommand::AcceptShell);
        self.state = ConnectionState::SessionReady;

        let mut app = (self.factory)(session.as_ref());
        let flow = app.on_start(&session);
        self.session = Some(session);
        self.app = Some(app);

        if flow == Flow::Exit {
            self.terminate();
        }
    }

    fn resize(&mut self, geometry: Geometry) {
        let Some(session) = &self.session else {
            return;
        };
        if !session.resize(geometry) {
            return;
        }
        debug!("Session {} resized to {}x{}", session.id(), geometry.cols, geometry.rows);
        if let Some(app) = self.app.as_mut() {
            app.on_resize(session);
        }
    }

    fn dispatch(&mut self, keys: Vec<KeyEvent>) {
        let mut exit = false;
        if let (Some(session), Some(app)) = (&self.session, self.app.as_mut()) {
            for key in keys {
                trace!("Session {} key {}", session.id(), key);
                if app.on_key(session, key) == Flow::Exit {
                    exit = true;
                    break;
                }
            }
        }
        if exit {
            info!("Session {:?} exited", self.session_id());
            self.terminate();
        }
    }

    /// Destroy and deregister the session, then close the connection
    fn terminate(&mut self) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        self.teardown();
        self.state = ConnectionState::Terminated;
        self.send(TransportCommand::Close);
    }

    /// Connection gone: make sure nothing stays registered
    fn close_fallback(&mut self) {
        if self.state != ConnectionState::Terminated {
            debug!("Connection closed before stream teardown");
        }
        self.teardown();
        self.state = ConnectionState::Terminated;
    }

    fn teardown(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.destroy() {
            info!("Session {} destroyed", session.id());
            if let Some(app) = self.app.as_mut() {
                app.on_close(session);
            }
        }
        self.registry.remove(session.id());
        self.app = None;
    }

    fn send(&self, command: TransportCommand) {
        if self.commands.send(command).is_err() {
            debug!("Transport for session {:?} is gone", self.session_id());
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // A task that ends without ConnectionClosed still deregisters
        self.teardown();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::factory;
    use crate::input::ESCAPE_TIMEOUT;
    use std::sync::Mutex;

    /// Records everything it is told
    #[derive(Clone, Default)]
    struct Recorder {
        keys: Arc<Mutex<Vec<KeyEvent>>>,
        resizes: Arc<Mutex<Vec<Geometry>>>,
        closed: Arc<Mutex<u32>>,
    }

    impl Application for Recorder {
        fn on_key(&mut self, _session: &Session, key: KeyEvent) -> Flow {
            self.keys.lock().unwrap().push(key);
            if key == KeyEvent::CtrlD {
                Flow::Exit
            } else {
                Flow::Continue
            }
        }

        fn on_resize(&mut self, session: &Session) {
            self.resizes.lock().unwrap().push(session.geometry());
        }

        fn on_close(&mut self, _session: &Session) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    struct Harness {
        conn: Connection,
        registry: Arc<SessionRegistry>,
        commands: mpsc::UnboundedReceiver<TransportCommand>,
        recorder: Recorder,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_registry(Arc::new(SessionRegistry::new()))
        }

        fn with_registry(registry: Arc<SessionRegistry>) -> Self {
            let recorder = Recorder::default();
            let shared = recorder.clone();
            let (tx, rx) = mpsc::unbounded_channel();
            let conn = Connection::new(
                Arc::clone(&registry),
                SessionSettings::default(),
                factory(move |_| shared.clone()),
                tx,
            );
            Self {
                conn,
                registry,
                commands: rx,
                recorder,
            }
        }

        fn send(&mut self, event: ConnectionEvent) {
            self.conn.handle(event, Instant::now());
        }

        fn ready_shell(&mut self) -> SessionId {
            self.send(ConnectionEvent::Ready);
            self.send(ConnectionEvent::ShellRequest);
            self.conn.session_id().unwrap()
        }

        fn commands(&mut self) -> Vec<TransportCommand> {
            let mut out = Vec::new();
            while let Ok(command) = self.commands.try_recv() {
                out.push(command);
            }
            out
        }

        fn keys(&self) -> Vec<KeyEvent> {
            self.recorder.keys.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_shell_lifecycle() {
        let mut h = Harness::new();
        assert_eq!(h.conn.state(), ConnectionState::Connected);

        h.send(ConnectionEvent::Ready);
        assert_eq!(h.conn.state(), ConnectionState::Authenticated);

        h.send(ConnectionEvent::PtyRequest { geometry: Geometry::new(100, 40) });
        h.send(ConnectionEvent::ShellRequest);
        assert_eq!(h.conn.state(), ConnectionState::SessionReady);

        let id = h.conn.session_id().unwrap();
        let session = h.registry.get(id).unwrap();
        assert_eq!(session.geometry(), Geometry::new(100, 40));
        assert_eq!(h.commands(), vec![TransportCommand::AcceptShell]);

        h.send(ConnectionEvent::StreamClosed);
        assert_eq!(h.conn.state(), ConnectionState::Terminated);
        assert!(session.is_destroyed());
        assert!(!h.registry.contains(id));
        assert_eq!(h.commands(), vec![TransportCommand::Close]);
        assert_eq!(*h.recorder.closed.lock().unwrap(), 1);
    }

    #[test]
    fn test_default_geometry_without_pty() {
        let mut h = Harness::new();
        h.ready_shell();
        assert_eq!(h.conn.session().unwrap().geometry(), Geometry::new(80, 24));
    }

    #[test]
    fn test_exec_rejected_without_allocation() {
        let mut h = Harness::new();
        h.send(ConnectionEvent::Ready);
        h.send(ConnectionEvent::ExecRequest { command: "ls".into() });

        assert_eq!(h.commands(), vec![TransportCommand::Reject(RequestKind::Exec)]);
        assert!(h.registry.is_empty());
        assert!(h.conn.session_id().is_none());
        assert_eq!(h.conn.state(), ConnectionState::Authenticated);
    }

    #[test]
    fn test_shell_before_ready_rejected() {
        let mut h = Harness::new();
        h.send(ConnectionEvent::ShellRequest);
        assert_eq!(h.commands(), vec![TransportCommand::Reject(RequestKind::Shell)]);
        assert!(h.registry.is_empty());
    }

    #[test]
    fn test_duplicate_shell_rejected() {
        let mut h = Harness::new();
        let id = h.ready_shell();
        h.commands();

        h.send(ConnectionEvent::ShellRequest);
        assert_eq!(h.commands(), vec![TransportCommand::Reject(RequestKind::Shell)]);
        assert_eq!(h.registry.ids(), vec![id]);
    }

    #[test]
    fn test_data_decoded_and_dispatched() {
        let mut h = Harness::new();
        h.send(ConnectionEvent::Data(b"early".to_vec()));
        h.ready_shell();

        h.send(ConnectionEvent::Data(b"a\x1b[".to_vec()));
        h.send(ConnectionEvent::Data(b"B\r".to_vec()));
        assert_eq!(h.keys(), vec![KeyEvent::Char('a'), KeyEvent::Down, KeyEvent::Enter]);
    }

    #[test]
    fn test_escape_timer_through_connection() {
        let mut h = Harness::new();
        h.ready_shell();

        let now = Instant::now();
        h.conn.handle(ConnectionEvent::Data(vec![0x1b]), now);
        let deadline = h.conn.deadline().unwrap();
        assert_eq!(deadline, now + ESCAPE_TIMEOUT);

        h.conn.expire(deadline);
        assert_eq!(h.keys(), vec![KeyEvent::Escape]);
        assert!(h.conn.deadline().is_none());
    }

    #[test]
    fn test_resize_updates_geometry_and_notifies() {
        let mut h = Harness::new();
        h.ready_shell();

        h.send(ConnectionEvent::WindowChange { geometry: Geometry::new(132, 50) });
        assert_eq!(h.conn.session().unwrap().geometry(), Geometry::new(132, 50));
        assert_eq!(*h.recorder.resizes.lock().unwrap(), vec![Geometry::new(132, 50)]);
    }

    #[test]
    fn test_late_pty_request_ignored() {
        let mut h = Harness::new();
        h.send(ConnectionEvent::Ready);
        h.send(ConnectionEvent::PtyRequest { geometry: Geometry::new(100, 40) });
        h.send(ConnectionEvent::ShellRequest);
        h.commands();

        h.send(ConnectionEvent::PtyRequest { geometry: Geometry::new(20, 5) });
        assert_eq!(h.conn.session().unwrap().geometry(), Geometry::new(100, 40));
        assert!(h.recorder.resizes.lock().unwrap().is_empty());
        assert!(h.commands().is_empty());
    }

    #[test]
    fn test_window_change_before_shell_sets_initial_geometry() {
        let mut h = Harness::new();
        h.send(ConnectionEvent::Ready);
        h.send(ConnectionEvent::WindowChange { geometry: Geometry::new(90, 30) });
        h.send(ConnectionEvent::ShellRequest);
        assert_eq!(h.conn.session().unwrap().geometry(), Geometry::new(90, 30));
        assert!(h.recorder.resizes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_resize_after_destroy_is_noop() {
        let mut h = Harness::new();
        h.ready_shell();
        let session = Arc::clone(h.conn.session().unwrap());

        h.send(ConnectionEvent::StreamError("reset by peer".into()));
        h.send(ConnectionEvent::WindowChange { geometry: Geometry::new(10, 10) });

        assert_eq!(session.geometry(), Geometry::default());
        assert!(h.recorder.resizes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_events_after_termination_ignored() {
        let mut h = Harness::new();
        h.ready_shell();
        h.send(ConnectionEvent::StreamClosed);
        h.commands();

        h.send(ConnectionEvent::Data(b"x".to_vec()));
        h.send(ConnectionEvent::StreamError("late".into()));
        h.send(ConnectionEvent::ShellRequest);
        h.send(ConnectionEvent::ConnectionClosed);

        assert!(h.keys().is_empty());
        assert!(h.commands().is_empty());
        assert_eq!(*h.recorder.closed.lock().unwrap(), 1);
        assert!(h.conn.is_closed());
    }

    #[test]
    fn test_connection_close_fallback() {
        let mut h = Harness::new();
        let id = h.ready_shell();

        h.send(ConnectionEvent::ConnectionClosed);
        assert_eq!(h.conn.state(), ConnectionState::Terminated);
        assert!(!h.registry.contains(id));
        assert!(h.registry.get(id).is_none());
        assert_eq!(*h.recorder.closed.lock().unwrap(), 1);
    }

    #[test]
    fn test_application_exit_terminates() {
        let mut h = Harness::new();
        let id = h.ready_shell();
        h.commands();

        h.send(ConnectionEvent::Data(vec![0x04, b'z']));
        assert_eq!(h.keys(), vec![KeyEvent::CtrlD]);
        assert_eq!(h.conn.state(), ConnectionState::Terminated);
        assert!(!h.registry.contains(id));
        assert_eq!(h.commands(), vec![TransportCommand::Close]);
    }

    #[test]
    fn test_drop_deregisters() {
        let registry = Arc::new(SessionRegistry::new());
        let mut h = Harness::with_registry(Arc::clone(&registry));
        h.ready_shell();
        assert_eq!(registry.len(), 1);

        drop(h);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_two_connections_independent() {
        let registry = Arc::new(SessionRegistry::new());
        let mut first = Harness::with_registry(Arc::clone(&registry));
        let mut second = Harness::with_registry(Arc::clone(&registry));

        let a = first.ready_shell();
        let b = second.ready_shell();
        assert!(b > a);

        first.send(ConnectionEvent::StreamClosed);
        assert_eq!(registry.ids(), vec![b]);

        second.send(ConnectionEvent::Data(b"ok".to_vec()));
        second.send(ConnectionEvent::WindowChange { geometry: Geometry::new(60, 20) });
        assert_eq!(second.keys(), vec![KeyEvent::Char('o'), KeyEvent::Char('k')]);
        assert_eq!(registry.get(b).unwrap().geometry(), Geometry::new(60, 20));
        assert!(!registry.get(b).unwrap().is_destroyed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drives_escape_timer() {
        let registry = Arc::new(SessionRegistry::new());
        let recorder = Recorder::default();
        let shared = recorder.clone();
        let (link, mut peer) = crate::transport::link(8);
        let conn = Connection::new(
            Arc::clone(&registry),
            SessionSettings::default(),
            factory(move |_| shared.clone()),
            link.commands,
        );
        let task = tokio::spawn(conn.run(link.events));

        assert!(peer.send(ConnectionEvent::Ready).await);
        assert!(peer.send(ConnectionEvent::ShellRequest).await);
        assert_eq!(peer.recv().await, Some(TransportCommand::AcceptShell));

        // Split arrow key arrives as one event
        assert!(peer.send(ConnectionEvent::Data(b"\x1b[".to_vec())).await);
        assert!(peer.send(ConnectionEvent::Data(b"A".to_vec())).await);
        tokio::time::sleep(ESCAPE_TIMEOUT * 2).await;
        assert_eq!(*recorder.keys.lock().unwrap(), vec![KeyEvent::Up]);

        assert!(peer.send(ConnectionEvent::Data(vec![0x1b])).await);
        tokio::time::sleep(ESCAPE_TIMEOUT / 2).await;
        assert_eq!(recorder.keys.lock().unwrap().len(), 1);
        tokio::time::sleep(ESCAPE_TIMEOUT).await;
        assert_eq!(*recorder.keys.lock().unwrap(), vec![KeyEvent::Up, KeyEvent::Escape]);

        assert!(peer.send(ConnectionEvent::StreamClosed).await);
        assert_eq!(peer.recv().await, Some(TransportCommand::Close));
        assert!(peer.send(ConnectionEvent::ConnectionClosed).await);
        task.await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ends_when_transport_dropped() {
        let registry = Arc::new(SessionRegistry::new());
        let (link, mut peer) = crate::transport::link(8);
        let conn = Connection::new(
            Arc::clone(&registry),
            SessionSettings::default(),
            factory(|_| Recorder::default()),
            link.commands,
        );
        let task = tokio::spawn(conn.run(link.events));

        assert!(peer.send(ConnectionEvent::Ready).await);
        assert!(peer.send(ConnectionEvent::ShellRequest).await);
        assert_eq!(peer.recv().await, Some(TransportCommand::AcceptShell));
        assert_eq!(registry.len(), 1);

        drop(peer);
        task.await.unwrap();
        assert!(registry.is_empty());
    }
}
