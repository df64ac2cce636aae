//! Line redraw.
//!
//! The editor never moves the cursor with escape sequences. A refresh
//! returns to column zero, rewrites the prompt and the visible line, blanks
//! out whatever a longer previous draw left behind, and backs up with
//! backspaces to the cursor. All of that is assembled into a [`Frame`] and
//! written to the console in one go.

use crate::line::LineBuffer;

/// Spaces always written past the end of the line on a refresh.
const MIN_PAD: usize = 2;

const BACKSPACE: u8 = 0x08;

/// Bytes for one console write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<u8>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn carriage_return(&mut self) -> &mut Self {
        self.buf.push(b'\r');
        self
    }

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    pub fn spaces(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, b' ');
        self
    }

    pub fn backspaces(&mut self, n: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + n, BACKSPACE);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Display width of a prompt plus line, counted in characters.
pub fn width(prompt: &str, line: &LineBuffer) -> usize {
    prompt.chars().count() + line.visible().chars().count()
}

/// Build a full refresh of `line` after `prompt`, padding over `pad` extra
/// columns left by the previous draw.
pub fn refresh(prompt: &str, line: &LineBuffer, pad: usize) -> Frame {
    let pad = pad + MIN_PAD;
    let mut frame = Frame::new();
    frame
        .carriage_return()
        .text(prompt)
        .text(line.visible())
        .spaces(pad)
        .backspaces(pad)
        .backspaces(line.chars_after_cursor());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_with_cursor_at_end() {
        let line = LineBuffer::with_text("run").unwrap();
        let frame = refresh("test> ", &line, 0);
        assert_eq!(frame.as_bytes(), b"\rtest> run  \x08\x08");
    }

    #[test]
    fn test_refresh_backs_up_to_cursor() {
        let mut line = LineBuffer::with_text("abcd").unwrap();
        line.set_position(1);
        let frame = refresh("> ", &line, 3);
        assert_eq!(
            frame.as_bytes(),
            b"\r> abcd     \x08\x08\x08\x08\x08\x08\x08\x08"
        );
    }

    #[test]
    fn test_refresh_draws_only_continued_part() {
        let mut line = LineBuffer::with_text("echo one \\").unwrap();
        line.continue_line();
        line.insert_str("two").unwrap();
        let frame = refresh("> ", &line, 0);
        assert_eq!(frame.as_bytes(), b"\r> two  \x08\x08");
        assert_eq!(width("> ", &line), 5);
    }

    #[test]
    fn test_frame_builder() {
        let mut frame = Frame::new();
        assert_eq!(frame.as_bytes(), b"");
        frame.carriage_return().text("ab").spaces(1).backspaces(1);
        assert_eq!(frame.as_bytes(), b"\rab \x08");
    }
}
