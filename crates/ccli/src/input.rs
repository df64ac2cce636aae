//! Terminal input decoding.
//!
//! Raw bytes from the terminal are turned into [`Key`] events by a small
//! state machine. Printable ASCII and a handful of control bytes map
//! directly; ANSI CSI sequences (`ESC [ params final`) are accumulated and
//! mapped to cursor and editing keys. Anything not understood is dropped
//! and decoding starts over, so garbage on the line never wedges the
//! editor.
//!
//! [`KeyReader`] puts a pending-byte queue in front of the console. Bytes
//! read ahead by a non-blocking poll (looking for Ctrl-C while a listing is
//! printed) are pushed back there and decoded before anything new is read.

use crate::term::Console;
use std::collections::VecDeque;

const ESC: u8 = 0x1b;
const CTRL_A: u8 = 0x01;
const CTRL_C: u8 = 0x03;
const CTRL_E: u8 = 0x05;
const CTRL_H: u8 = 0x08;
const CTRL_R: u8 = 0x12;
const CTRL_U: u8 = 0x15;
const CTRL_W: u8 = 0x17;
const DEL: u8 = 0x7f;

/// Capacity of the read-ahead queue.
pub const PENDING_CAPACITY: usize = 256;

/// A decoded editing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character (ASCII space through tilde).
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-U: delete from the start of the line to the cursor.
    DeleteToStart,
    /// Ctrl-W: delete the word before the cursor.
    DeleteWord,
    /// Ctrl-R: incremental reverse history search.
    ReverseSearch,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    WordLeft,
    WordRight,
    Insert,
    /// End of input or a read error.
    Eof,
}

/// Where the decoder is inside an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Idle,
    /// Saw ESC.
    Escape,
    /// Saw `ESC [`, optionally followed by parameter digits.
    Csi { param: u16 },
    /// Saw `ESC [ param ;`, optionally followed by modifier digits.
    CsiModifier { param: u16, modifier: u16 },
}

/// Byte-at-a-time ANSI input decoder.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    state: State,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the decoder is in the middle of an escape sequence.
    pub fn in_sequence(&self) -> bool {
        self.state != State::Idle
    }

    /// Drop any partially decoded sequence.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Feed one byte. Returns a key when the byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            State::Idle => self.idle(byte),
            State::Escape => {
                if byte == b'[' {
                    self.state = State::Csi { param: 0 };
                } else {
                    tracing::debug!("dropping unknown escape byte {byte:#04x}");
                    self.state = State::Idle;
                }
                None
            }
            State::Csi { param } => match byte {
                b'0'..=b'9' => {
                    self.state = State::Csi {
                        param: push_digit(param, byte),
                    };
                    None
                }
                b';' => {
                    self.state = State::CsiModifier { param, modifier: 0 };
                    None
                }
                _ => self.finish(param, 0, byte),
            },
            State::CsiModifier { param, modifier } => match byte {
                b'0'..=b'9' => {
                    self.state = State::CsiModifier {
                        param,
                        modifier: push_digit(modifier, byte),
                    };
                    None
                }
                _ => self.finish(param, modifier, byte),
            },
        }
    }

    fn idle(&mut self, byte: u8) -> Option<Key> {
        match byte {
            b'\n' | b'\r' => Some(Key::Enter),
            b'\t' => Some(Key::Tab),
            DEL | CTRL_H => Some(Key::Backspace),
            CTRL_C => Some(Key::Interrupt),
            CTRL_U => Some(Key::DeleteToStart),
            CTRL_W => Some(Key::DeleteWord),
            CTRL_R => Some(Key::ReverseSearch),
            CTRL_A => Some(Key::Home),
            CTRL_E => Some(Key::End),
            ESC => {
                self.state = State::Escape;
                None
            }
            0x20..=0x7e => Some(Key::Char(byte as char)),
            _ => {
                tracing::debug!("dropping unhandled byte {byte:#04x}");
                None
            }
        }
    }

    /// Map the final byte of a CSI sequence.
    fn finish(&mut self, param: u16, modifier: u16, byte: u8) -> Option<Key> {
        self.state = State::Idle;

        if byte == ESC {
            // A new sequence started before this one finished
            self.state = State::Escape;
            return None;
        }

        let key = match (byte, param, modifier) {
            (b'A', _, 0 | 1) => Some(Key::Up),
            (b'B', _, 0 | 1) => Some(Key::Down),
            (b'C', _, 0 | 1) => Some(Key::Right),
            (b'D', _, 0 | 1) => Some(Key::Left),
            (b'C', _, _) => Some(Key::WordRight),
            (b'D', _, _) => Some(Key::WordLeft),
            (b'H', _, _) => Some(Key::Home),
            (b'F', _, _) => Some(Key::End),
            (b'~', 1 | 7, _) => Some(Key::Home),
            (b'~', 2, _) => Some(Key::Insert),
            (b'~', 3, _) => Some(Key::Delete),
            (b'~', 4 | 8, _) => Some(Key::End),
            (b'~', 5, _) => Some(Key::PageUp),
            (b'~', 6, _) => Some(Key::PageDown),
            _ => None,
        };

        if key.is_none() {
            tracing::debug!(
                "dropping unknown sequence ESC [ {param} ; {modifier} {:?}",
                byte as char
            );
        }
        key
    }
}

fn push_digit(value: u16, digit: u8) -> u16 {
    value
        .saturating_mul(10)
        .saturating_add(u16::from(digit - b'0'))
}

/// Decodes keys from a console, draining the pending queue first.
#[derive(Debug, Default)]
pub struct KeyReader {
    decoder: Decoder,
    pending: VecDeque<u8>,
}

impl KeyReader {
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
            pending: VecDeque::with_capacity(PENDING_CAPACITY),
        }
    }

    /// Give back a byte that was read ahead. Returns false (and drops the
    /// byte) when the queue is full.
    pub fn push_pending(&mut self, byte: u8) -> bool {
        if self.pending.len() >= PENDING_CAPACITY {
            tracing::debug!("pending input queue full, dropping {byte:#04x}");
            return false;
        }
        self.pending.push_back(byte);
        true
    }

    /// Number of bytes waiting in the queue.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Next raw byte, from the queue or the console.
    pub fn read_byte(&mut self, console: &mut dyn Console) -> Option<u8> {
        if let Some(byte) = self.pending.pop_front() {
            return Some(byte);
        }
        match console.read_byte() {
            Ok(byte) => byte,
            Err(e) => {
                tracing::debug!("console read failed: {e}");
                None
            }
        }
    }

    /// Block until a complete key has been decoded.
    ///
    /// End of input or a read error returns [`Key::Eof`]; a partially
    /// decoded sequence is dropped at that point.
    pub fn read_key(&mut self, console: &mut dyn Console) -> Key {
        loop {
            let Some(byte) = self.read_byte(console) else {
                self.decoder.reset();
                return Key::Eof;
            };
            if let Some(key) = self.decoder.feed(byte) {
                return key;
            }
        }
    }

    /// Drain whatever input is immediately available into the queue and
    /// report whether a Ctrl-C was among it. The Ctrl-C itself is consumed;
    /// bytes after it stay unread.
    pub fn poll_interrupt(&mut self, console: &mut dyn Console) -> bool {
        while self.pending.len() < PENDING_CAPACITY {
            match console.poll_byte() {
                Ok(Some(CTRL_C)) => return true,
                Ok(Some(byte)) => self.pending.push_back(byte),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("console poll failed: {e}");
                    break;
                }
            }
        }
        false
    }
}
