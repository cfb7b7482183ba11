//! Host application boundary
//!
//! The screen logic living on top of this crate implements [`Application`].
//! One instance is created per session and driven from that session's
//! connection task, so implementations need no locking of their own.

use std::sync::Arc;

use crate::input::KeyEvent;
use crate::session::Session;

/// Whether the session should keep running after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Screen logic for one interactive session
pub trait Application: Send {
    /// Shell started. Usually renders the first frame.
    fn on_start(&mut self, session: &Session) -> Flow {
        let _ = session;
        Flow::Continue
    }

    /// A key was decoded
    fn on_key(&mut self, session: &Session, key: KeyEvent) -> Flow;

    /// The client window changed size; `session.geometry()` is current
    fn on_resize(&mut self, session: &Session) {
        let _ = session;
    }

    /// The session was destroyed. No output can be sent anymore.
    fn on_close(&mut self, session: &Session) {
        let _ = session;
    }
}

/// Creates the application for a new session
pub type AppFactory = Arc<dyn Fn(&Session) -> Box<dyn Application> + Send + Sync>;

/// Wrap a closure as an [`AppFactory`]
pub fn factory<F, A>(make: F) -> AppFactory
where
    F: Fn(&Session) -> A + Send + Sync + 'static,
    A: Application + 'static,
{
    Arc::new(move |session: &Session| Box::new(make(session)) as Box<dyn Application>)
}
