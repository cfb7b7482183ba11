//! Key events produced by the decoder

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Modifier keys carried by a key event
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
    }
}

/// Function keys F1..=F12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionKey {
    F1 = 1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl FunctionKey {
    const ALL: [FunctionKey; 12] = [
        FunctionKey::F1,
        FunctionKey::F2,
        FunctionKey::F3,
        FunctionKey::F4,
        FunctionKey::F5,
        FunctionKey::F6,
        FunctionKey::F7,
        FunctionKey::F8,
        FunctionKey::F9,
        FunctionKey::F10,
        FunctionKey::F11,
        FunctionKey::F12,
    ];

    /// `None` outside 1..=12
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionKey::F1 => "F1",
            FunctionKey::F2 => "F2",
            FunctionKey::F3 => "F3",
            FunctionKey::F4 => "F4",
            FunctionKey::F5 => "F5",
            FunctionKey::F6 => "F6",
            FunctionKey::F7 => "F7",
            FunctionKey::F8 => "F8",
            FunctionKey::F9 => "F9",
            FunctionKey::F10 => "F10",
            FunctionKey::F11 => "F11",
            FunctionKey::F12 => "F12",
        }
    }
}

/// One logical keystroke decoded from the input stream.
///
/// The set of kinds is closed. Only `Char` carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    F(FunctionKey),
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    CtrlUp,
    CtrlDown,
    CtrlLeft,
    CtrlRight,
    Enter,
    Backspace,
    Escape,
    Tab,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlK,
    CtrlU,
    CtrlZ,
    /// A single printable character
    Char(char),
}

impl KeyEvent {
    /// Wire name of the event kind (`"PAGE_UP"`, `"F5"`, `"CHAR"`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            KeyEvent::Up => "UP",
            KeyEvent::Down => "DOWN",
            KeyEvent::Left => "LEFT",
            KeyEvent::Right => "RIGHT",
            KeyEvent::Home => "HOME",
            KeyEvent::End => "END",
            KeyEvent::Insert => "INSERT",
            KeyEvent::Delete => "DELETE",
            KeyEvent::PageUp => "PAGE_UP",
            KeyEvent::PageDown => "PAGE_DOWN",
            KeyEvent::F(key) => key.name(),
            KeyEvent::ShiftUp => "SHIFT_UP",
            KeyEvent::ShiftDown => "SHIFT_DOWN",
            KeyEvent::ShiftLeft => "SHIFT_LEFT",
            KeyEvent::ShiftRight => "SHIFT_RIGHT",
            KeyEvent::CtrlUp => "CTRL_UP",
            KeyEvent::CtrlDown => "CTRL_DOWN",
            KeyEvent::CtrlLeft => "CTRL_LEFT",
            KeyEvent::CtrlRight => "CTRL_RIGHT",
            KeyEvent::Enter => "ENTER",
            KeyEvent::Backspace => "BACKSPACE",
            KeyEvent::Escape => "ESCAPE",
            KeyEvent::Tab => "TAB",
            KeyEvent::CtrlA => "CTRL_A",
            KeyEvent::CtrlB => "CTRL_B",
            KeyEvent::CtrlC => "CTRL_C",
            KeyEvent::CtrlD => "CTRL_D",
            KeyEvent::CtrlE => "CTRL_E",
            KeyEvent::CtrlF => "CTRL_F",
            KeyEvent::CtrlK => "CTRL_K",
            KeyEvent::CtrlU => "CTRL_U",
            KeyEvent::CtrlZ => "CTRL_Z",
            KeyEvent::Char(_) => "CHAR",
        }
    }

    /// Character payload, only for `Char`
    pub fn char(&self) -> Option<char> {
        match self {
            KeyEvent::Char(ch) => Some(*ch),
            _ => None,
        }
    }

    /// Modifiers implied by the event kind
    pub fn modifiers(&self) -> Modifiers {
        match self {
            KeyEvent::ShiftUp | KeyEvent::ShiftDown | KeyEvent::ShiftLeft | KeyEvent::ShiftRight => {
                Modifiers::SHIFT
            }
            KeyEvent::CtrlUp
            | KeyEvent::CtrlDown
            | KeyEvent::CtrlLeft
            | KeyEvent::CtrlRight
            | KeyEvent::CtrlA
            | KeyEvent::CtrlB
            | KeyEvent::CtrlC
            | KeyEvent::CtrlD
            | KeyEvent::CtrlE
            | KeyEvent::CtrlF
            | KeyEvent::CtrlK
            | KeyEvent::CtrlU
            | KeyEvent::CtrlZ => Modifiers::CTRL,
            _ => Modifiers::empty(),
        }
    }

    /// Arrow direction with modifiers stripped, for arrow-like kinds
    pub fn arrow(&self) -> Option<KeyEvent> {
        match self {
            KeyEvent::Up | KeyEvent::ShiftUp | KeyEvent::CtrlUp => Some(KeyEvent::Up),
            KeyEvent::Down | KeyEvent::ShiftDown | KeyEvent::CtrlDown => Some(KeyEvent::Down),
            KeyEvent::Left | KeyEvent::ShiftLeft | KeyEvent::CtrlLeft => Some(KeyEvent::Left),
            KeyEvent::Right | KeyEvent::ShiftRight | KeyEvent::CtrlRight => Some(KeyEvent::Right),
            _ => None,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEvent::Char(ch) => write!(f, "CHAR({:?})", ch),
            other => f.write_str(other.name()),
        }
    }
}
