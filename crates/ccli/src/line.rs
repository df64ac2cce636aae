//! The editable line.
//!
//! A [`LineBuffer`] holds the text being typed at the prompt together with
//! the cursor position. It also tracks a `start` offset: when the user ends a
//! line with a backslash and presses Enter, the line continues on the next
//! physical line and `start` marks where that physical line begins. The
//! cursor never moves before `start`, and only the text from `start` on is
//! drawn after the continuation prompt.
//!
//! Positions are byte offsets that always sit on character boundaries.

use crate::error::Result;

/// Initial capacity of a fresh line.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    pos: usize,
    start: usize,
}

impl LineBuffer {
    /// Create an empty line.
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(DEFAULT_CAPACITY),
            pos: 0,
            start: 0,
        }
    }

    /// Create a line preloaded with `text`, cursor at the end.
    pub fn with_text(text: &str) -> Result<Self> {
        let mut line = Self::new();
        line.text.try_reserve(text.len())?;
        line.text.push_str(text);
        line.pos = line.text.len();
        Ok(line)
    }

    /// The whole logical line, including any continued physical lines.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The text of the current physical line (from `start`).
    pub fn visible(&self) -> &str {
        &self.text[self.start..]
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cursor position as a byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Start of the current physical line.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of characters between the cursor and the end of the line.
    pub fn chars_after_cursor(&self) -> usize {
        self.text[self.pos..].chars().count()
    }

    /// Clear the content, keeping the allocation.
    pub fn reset(&mut self) {
        self.text.clear();
        self.pos = 0;
        self.start = 0;
    }

    /// Insert a character at the cursor and move past it.
    pub fn insert(&mut self, ch: char) -> Result<()> {
        self.text.try_reserve(ch.len_utf8())?;
        self.text.insert(self.pos, ch);
        self.pos += ch.len_utf8();
        Ok(())
    }

    /// Insert a string at the cursor and move past it.
    pub fn insert_str(&mut self, s: &str) -> Result<()> {
        self.text.try_reserve(s.len())?;
        self.text.insert_str(self.pos, s);
        self.pos += s.len();
        Ok(())
    }

    /// Move the cursor to `pos`, clamped into `[start, len]` and onto a
    /// character boundary.
    pub fn set_position(&mut self, pos: usize) {
        let mut pos = pos.clamp(self.start, self.text.len());
        while pos > self.start && !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        self.pos = pos;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.pos > self.start {
            let prev = self.prev_boundary(self.pos);
            self.text.replace_range(prev..self.pos, "");
            self.pos = prev;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.pos < self.text.len() {
            let next = self.next_boundary(self.pos);
            self.text.replace_range(self.pos..next, "");
        }
    }

    /// Delete back to the start of the previous word.
    ///
    /// Returns the number of characters removed, which is how much the
    /// redraw has to pad over.
    pub fn delete_word(&mut self) -> usize {
        let to = self.word_left_from(self.pos);
        self.remove_before_cursor(to)
    }

    /// Delete everything from the start of the physical line to the cursor.
    ///
    /// Returns the number of characters removed.
    pub fn delete_to_start(&mut self) -> usize {
        self.remove_before_cursor(self.start)
    }

    fn remove_before_cursor(&mut self, from: usize) -> usize {
        let removed = self.text[from..self.pos].chars().count();
        self.text.replace_range(from..self.pos, "");
        self.pos = from;
        removed
    }

    /// Move the cursor left by one character.
    pub fn left(&mut self) {
        if self.pos > self.start {
            self.pos = self.prev_boundary(self.pos);
        }
    }

    /// Move the cursor right by one character.
    pub fn right(&mut self) {
        if self.pos < self.text.len() {
            self.pos = self.next_boundary(self.pos);
        }
    }

    /// Move the cursor to the start of the previous word.
    pub fn left_word(&mut self) {
        self.pos = self.word_left_from(self.pos);
    }

    /// Move the cursor to the end of the next word.
    pub fn right_word(&mut self) {
        let bytes = self.text.as_bytes();
        let mut pos = self.pos;

        // Skip separators, then the word itself
        while pos < bytes.len() && !bytes[pos].is_ascii_alphanumeric() {
            pos += 1;
        }
        while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
            pos += 1;
        }

        self.set_position(pos);
    }

    /// Move the cursor to the start of the physical line.
    pub fn home(&mut self) {
        self.pos = self.start;
    }

    /// Move the cursor to the end of the line.
    pub fn end(&mut self) {
        self.pos = self.text.len();
    }

    /// Replace the whole content with `s`, cursor at the end.
    pub fn replace(&mut self, s: &str) -> Result<()> {
        if s.len() > self.text.capacity() {
            self.text.try_reserve(s.len() - self.text.len())?;
        }
        self.text.clear();
        self.text.push_str(s);
        self.start = 0;
        self.pos = self.text.len();
        Ok(())
    }

    /// Copy of the first `len` bytes of the line with the cursor at its end.
    ///
    /// Completion uses this to look at the text up to the cursor without
    /// disturbing the live line.
    pub fn copy_to(&self, len: usize) -> Result<Self> {
        let mut len = len.min(self.text.len());
        while len > 0 && !self.text.is_char_boundary(len) {
            len -= 1;
        }
        let mut copy = Self::with_text(&self.text[..len])?;
        copy.start = self.start.min(len);
        Ok(copy)
    }

    /// True when the line ends in an unescaped backslash, meaning Enter
    /// should continue the line instead of submitting it.
    pub fn is_escaped(&self) -> bool {
        let trailing = self
            .text
            .bytes()
            .rev()
            .take_while(|&b| b == b'\\')
            .count();
        trailing % 2 == 1
    }

    /// Continue an escaped line: drop the trailing backslash and begin a new
    /// physical line at the end of the current content.
    pub fn continue_line(&mut self) {
        if self.is_escaped() {
            self.text.pop();
        }
        self.start = self.text.len();
        self.pos = self.start;
    }

    fn word_left_from(&self, from: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut pos = from;

        while pos > self.start && !bytes[pos - 1].is_ascii_alphanumeric() {
            pos -= 1;
        }
        while pos > self.start && bytes[pos - 1].is_ascii_alphanumeric() {
            pos -= 1;
        }

        // Separators may be multi-byte; never stop inside one
        while pos > self.start && !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    fn prev_boundary(&self, from: usize) -> usize {
        let mut pos = from - 1;
        while pos > 0 && !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    fn next_boundary(&self, from: usize) -> usize {
        let mut pos = from + 1;
        while pos < self.text.len() && !self.text.is_char_boundary(pos) {
            pos += 1;
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> LineBuffer {
        LineBuffer::with_text(text).unwrap()
    }

    #[test]
    fn test_insert_then_backspace_is_noop() {
        let mut l = line("hello world");
        l.set_position(5);
        let before = l.clone();

        l.insert('X').unwrap();
        assert_eq!(l.as_str(), "helloX world");
        assert_eq!(l.position(), 6);

        l.backspace();
        assert_eq!(l, before);
    }

    #[test]
    fn test_insert_then_delete_at_same_position() {
        let mut l = line("abc");
        l.set_position(1);
        l.insert('z').unwrap();
        l.left();
        l.delete();
        assert_eq!(l.as_str(), "abc");
        assert_eq!(l.position(), 1);
    }

    #[test]
    fn test_grows_past_initial_capacity() {
        let mut l = LineBuffer::new();
        for _ in 0..(DEFAULT_CAPACITY * 3) {
            l.insert('a').unwrap();
        }
        assert_eq!(l.len(), DEFAULT_CAPACITY * 3);
        assert_eq!(l.position(), l.len());
    }

    #[test]
    fn test_cursor_bounds() {
        let mut l = line("ab");
        l.right();
        assert_eq!(l.position(), 2);
        l.home();
        l.left();
        assert_eq!(l.position(), 0);
        l.backspace();
        assert_eq!(l.as_str(), "ab");
        l.end();
        l.delete();
        assert_eq!(l.as_str(), "ab");
    }

    #[test]
    fn test_word_motion() {
        let mut l = line("git  remote-add origin");
        l.left_word();
        assert_eq!(l.position(), 16); // start of "origin"
        l.left_word();
        assert_eq!(l.position(), 12); // start of "add"
        l.left_word();
        assert_eq!(l.position(), 5); // start of "remote"
        l.right_word();
        assert_eq!(l.position(), 11); // end of "remote"
        l.right_word();
        assert_eq!(l.position(), 15); // end of "add"
    }

    #[test]
    fn test_delete_word_reports_removed_count() {
        let mut l = line("echo hello  ");
        let removed = l.delete_word();
        assert_eq!(removed, 7);
        assert_eq!(l.as_str(), "echo ");
        assert_eq!(l.position(), 5);
    }

    #[test]
    fn test_delete_to_start() {
        let mut l = line("one two three");
        l.set_position(8);
        assert_eq!(l.delete_to_start(), 8);
        assert_eq!(l.as_str(), "three");
        assert_eq!(l.position(), 0);
    }

    #[test]
    fn test_replace_moves_cursor_to_end() {
        let mut l = line("a much longer line than the next one");
        l.set_position(3);
        l.replace("short").unwrap();
        assert_eq!(l.as_str(), "short");
        assert_eq!(l.position(), 5);
        assert_eq!(l.start(), 0);
    }

    #[test]
    fn test_copy_to_cursor() {
        let l = line("show history");
        let copy = l.copy_to(6).unwrap();
        assert_eq!(copy.as_str(), "show h");
        assert_eq!(copy.position(), 6);
        assert_eq!(l.as_str(), "show history");

        let whole = l.copy_to(100).unwrap();
        assert_eq!(whole.as_str(), "show history");
    }

    #[test]
    fn test_escaped_continuation() {
        let mut l = line(r"echo one \");
        assert!(l.is_escaped());
        l.continue_line();
        assert_eq!(l.as_str(), "echo one ");
        assert_eq!(l.start(), 9);
        assert!(l.visible().is_empty());

        for c in "two".chars() {
            l.insert(c).unwrap();
        }
        assert_eq!(l.as_str(), "echo one two");
        assert_eq!(l.visible(), "two");

        // Home and backspace stop at the continuation point
        l.home();
        assert_eq!(l.position(), 9);
        l.backspace();
        assert_eq!(l.as_str(), "echo one two");
        assert_eq!(l.delete_to_start(), 0);
    }

    #[test]
    fn test_double_backslash_is_not_escaped() {
        assert!(!line(r"echo \\").is_escaped());
        assert!(line(r"echo \\\").is_escaped());
        assert!(!line("echo").is_escaped());
    }

    #[test]
    fn test_multibyte_text_keeps_boundaries() {
        let mut l = line("café au lait");
        l.set_position(4); // inside 'é'
        assert!(l.as_str().is_char_boundary(l.position()));
        l.end();
        l.left_word();
        l.left_word();
        l.left_word();
        assert!(l.as_str().is_char_boundary(l.position()));
        l.backspace();
        assert!(l.as_str().is_char_boundary(l.position()));
    }
}
