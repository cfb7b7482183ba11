//! Demo menu served by the `termwire` binary.
//!
//! A bordered list navigated with the arrow keys:
//!
//! ```text
//! ╭─── termwire ───╮
//! │ > Sessions     │
//! │   Geometry     │
//! │   Keys         │
//! │   Quit         │
//! ├────────────────┤
//! │ Press ENTER    │
//! ╰────────────────╯
//! ```
//!
//! - ↑/↓ move (wrapping), HOME/END jump
//! - ENTER selects, `q` / CTRL_C / CTRL_D exit
//! - ESCAPE clears the status line, any other key is echoed there

use crossterm::style::Stylize;
use tracing::{debug, warn};

use crate::app::{Application, Flow};
use crate::input::KeyEvent;
use crate::layout::{draw_box, draw_divider, BorderSpec, Frame};
use crate::session::Session;
use crate::transport::Geometry;

/// Actions behind the menu items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ShowSession,
    ShowGeometry,
    ShowKeys,
    Quit,
}

#[derive(Debug, Clone)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
}

impl MenuItem {
    pub const fn new(label: &'static str, action: MenuAction) -> Self {
        Self { label, action }
    }
}

const HINT: &str = "Press ENTER";

pub struct MenuApp {
    spec: BorderSpec,
    items: Vec<MenuItem>,
    selected: usize,
    status: String,
    keys_seen: usize,
}

impl MenuApp {
    pub fn new(spec: BorderSpec) -> Self {
        let spec = match spec.title {
            Some(_) => spec,
            None => spec.with_title("termwire"),
        };
        Self {
            spec,
            items: vec![
                MenuItem::new("Sessions", MenuAction::ShowSession),
                MenuItem::new("Geometry", MenuAction::ShowGeometry),
                MenuItem::new("Keys", MenuAction::ShowKeys),
                MenuItem::new("Quit", MenuAction::Quit),
            ],
            selected: 0,
            status: HINT.to_string(),
            keys_seen: 0,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_action(&self) -> MenuAction {
        self.items[self.selected].action
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        } else {
            self.selected = self.items.len() - 1;
        }
    }

    pub fn down(&mut self) {
        if self.selected < self.items.len() - 1 {
            self.selected += 1;
        } else {
            self.selected = 0;
        }
    }

    /// Lay the menu out for a terminal of the given size
    pub fn frame(&self, geometry: Geometry) -> Frame {
        let mut lines: Vec<String> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if i == self.selected {
                    format!("> {}", item.label.reverse())
                } else {
                    format!("  {}", item.label)
                }
            })
            .collect();
        let divider_at = lines.len() + 1;
        lines.push(self.status.clone());

        let natural = draw_box(&lines, &self.spec);
        let cols = geometry.cols as usize;
        let frame = if natural.width() > cols {
            draw_box(&lines, &self.spec.clone().with_width(cols))
        } else {
            natural
        };

        let inner = frame.width().saturating_sub(2);
        let mut rows = frame.into_lines();
        rows.insert(divider_at, draw_divider(inner, &self.spec, None));
        Frame::from(rows)
    }

    fn render(&self, session: &Session) {
        if let Err(e) = session.render(&self.frame(session.geometry())) {
            warn!("Render for session {} failed: {}", session.id(), e);
        }
    }

    fn select(&mut self, session: &Session) -> Flow {
        let action = self.selected_action();
        debug!("Session {} selected {:?}", session.id(), action);
        self.status = match action {
            MenuAction::ShowSession => format!("Session #{}", session.id()),
            MenuAction::ShowGeometry => {
                let geometry = session.geometry();
                format!("{}x{}", geometry.cols, geometry.rows)
            }
            MenuAction::ShowKeys => format!("{} keys", self.keys_seen),
            MenuAction::Quit => return Flow::Exit,
        };
        Flow::Continue
    }
}

impl Default for MenuApp {
    fn default() -> Self {
        Self::new(BorderSpec::default())
    }
}

impl Application for MenuApp {
    fn on_start(&mut self, session: &Session) -> Flow {
        self.render(session);
        Flow::Continue
    }

    fn on_key(&mut self, session: &Session, key: KeyEvent) -> Flow {
        self.keys_seen += 1;
        match key {
            KeyEvent::Up => self.up(),
            KeyEvent::Down => self.down(),
            KeyEvent::Home | KeyEvent::PageUp => self.selected = 0,
            KeyEvent::End | KeyEvent::PageDown => self.selected = self.items.len() - 1,
            KeyEvent::Enter => {
                if self.select(session) == Flow::Exit {
                    return Flow::Exit;
                }
            }
            KeyEvent::Char('q') | KeyEvent::CtrlC | KeyEvent::CtrlD => return Flow::Exit,
            KeyEvent::Escape => self.status = HINT.to_string(),
            other => self.status = other.to_string(),
        }
        self.render(session);
        Flow::Continue
    }

    fn on_resize(&mut self, session: &Session) {
        self.render(session);
    }
}
