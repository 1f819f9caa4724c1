//! Keyboard abstraction for Type In (component F).
//!
//! The CPU borrows a keyboard for the duration of a single `step`/`step_n`
//! call rather than owning one, since unlike the tape reader it has nothing
//! to attach or detach -- there is always exactly one operator console.

use std::io::{stdin, stdout, Stdout};

use termion::event::Key;
use termion::input::TermRead;
use termion::raw::{IntoRawMode, RawTerminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Interrupt,
}

pub trait Keyboard {
    fn read_key(&mut self) -> KeyEvent;
}

/// Reads raw keypresses from the process's stdin, matching the original's
/// `readchar`-based one-key-at-a-time input (no Enter required).
pub struct StdinKeyboard {
    _raw: RawTerminal<Stdout>,
}

impl StdinKeyboard {
    pub fn new() -> std::io::Result<StdinKeyboard> {
        Ok(StdinKeyboard {
            _raw: stdout().into_raw_mode()?,
        })
    }
}

impl Keyboard for StdinKeyboard {
    fn read_key(&mut self) -> KeyEvent {
        for key in stdin().keys() {
            match key {
                Ok(Key::Ctrl('c')) => return KeyEvent::Interrupt,
                Ok(Key::Char(c)) => return KeyEvent::Char(c),
                Ok(_) => continue,
                Err(_) => return KeyEvent::Interrupt,
            }
        }
        KeyEvent::Interrupt
    }
}

/// A keyboard that never produces input, for tests and non-interactive
/// drivers where Type In should not be exercised.
pub struct NullKeyboard;

impl Keyboard for NullKeyboard {
    fn read_key(&mut self) -> KeyEvent {
        KeyEvent::Interrupt
    }
}

/// Replays a fixed sequence of characters, for tests exercising Type In.
pub struct ScriptedKeyboard {
    chars: std::vec::IntoIter<char>,
}

impl ScriptedKeyboard {
    pub fn new(input: &str) -> ScriptedKeyboard {
        ScriptedKeyboard {
            chars: input.chars().collect::<Vec<_>>().into_iter(),
        }
    }
}

impl Keyboard for ScriptedKeyboard {
    fn read_key(&mut self) -> KeyEvent {
        match self.chars.next() {
            Some(c) => KeyEvent::Char(c),
            None => KeyEvent::Interrupt,
        }
    }
}
