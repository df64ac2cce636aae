//! The interactive loop.
//!
//! [`Session::run`] reads keys until a command (or the interrupt handler)
//! returns [`Flow::Exit`] or input ends. Each key edits the line, moves
//! through history, completes, or submits. Ctrl-R enters an incremental
//! reverse search over history that runs as a nested loop with its own
//! prompt.

use crate::command::Flow;
use crate::error::Result;
use crate::input::Key;
use crate::line::LineBuffer;
use crate::session::Session;
use std::rc::Rc;

/// How the reverse search ended.
enum SearchEnd {
    /// Keep going with the main loop.
    Done,
    /// Handle this key in the main loop.
    Key(Key),
}

impl Session {
    /// Run the interactive loop.
    ///
    /// Returns `Ok(())` when a command or the interrupt handler asks to
    /// exit, and when input ends.
    pub fn run(&mut self) -> Result<()> {
        let previous = self.line.replace(LineBuffer::new());
        self.history.set_current(self.history.size());
        self.last_width = 0;
        self.refresh(0);

        let result = self.edit_loop();

        self.line = previous;
        result
    }

    /// Run `line` as if it had been typed, optionally adding it to history.
    ///
    /// Callable from inside a command: the line being edited is put aside
    /// while `line` runs and restored afterwards.
    pub fn execute(&mut self, line: &str, add_to_history: bool) -> Result<Flow> {
        let buffer = LineBuffer::with_text(line)?;
        let previous = self.line.replace(buffer);
        let flow = self.dispatch_line(line, add_to_history);
        self.line = previous;
        Ok(flow)
    }

    fn edit_loop(&mut self) -> Result<()> {
        let mut tab = 0;
        let mut replay: Option<Key> = None;

        loop {
            let key = match replay.take() {
                Some(key) => key,
                None => self.keys.read_key(&mut *self.console),
            };
            if key != Key::Tab {
                tab = 0;
            }

            let line = self.line.get_or_insert_with(LineBuffer::new);
            match key {
                Key::Eof => {
                    tracing::debug!("end of input");
                    self.write_bytes(b"\n");
                    return Ok(());
                }
                Key::Enter => {
                    if line.is_escaped() {
                        line.continue_line();
                        self.write_bytes(b"\n");
                        self.last_width = 0;
                        self.refresh(0);
                        continue;
                    }
                    if self.submit() == Flow::Exit {
                        return Ok(());
                    }
                }
                Key::Tab => {
                    if let Err(e) = self.complete(tab) {
                        tracing::debug!("completion abandoned: {e}");
                    }
                    tab += 1;
                }
                Key::Interrupt => {
                    let text = line.as_str().to_string();
                    let pos = line.position();
                    let interrupt = Rc::clone(&self.interrupt);
                    if interrupt(self, &text, pos) == Flow::Exit {
                        return Ok(());
                    }
                    // The history cursor stays put so a saved draft is
                    // still reachable with Down.
                    self.last_width = 0;
                    self.refresh(0);
                }
                Key::ReverseSearch => match self.reverse_search()? {
                    SearchEnd::Done => {}
                    SearchEnd::Key(key) => replay = Some(key),
                },
                Key::Up => self.browse_history(|h, l| h.up(l, 1))?,
                Key::Down => self.browse_history(|h, l| h.down(l, 1))?,
                Key::PageUp => {
                    let page = self.config.page_scroll;
                    self.browse_history(|h, l| h.up(l, page))?;
                }
                Key::PageDown => {
                    let page = self.config.page_scroll;
                    self.browse_history(|h, l| h.down(l, page))?;
                }
                Key::Char(ch) => {
                    if let Err(e) = line.insert(ch) {
                        tracing::debug!("dropping input: {e}");
                    }
                    self.refresh(0);
                }
                Key::Backspace => {
                    line.backspace();
                    self.refresh(0);
                }
                Key::Delete => {
                    line.delete();
                    self.refresh(0);
                }
                Key::DeleteWord => {
                    line.delete_word();
                    self.refresh(0);
                }
                Key::DeleteToStart => {
                    line.delete_to_start();
                    self.refresh(0);
                }
                Key::Left => {
                    line.left();
                    self.refresh(0);
                }
                Key::Right => {
                    line.right();
                    self.refresh(0);
                }
                Key::WordLeft => {
                    line.left_word();
                    self.refresh(0);
                }
                Key::WordRight => {
                    line.right_word();
                    self.refresh(0);
                }
                Key::Home => {
                    line.home();
                    self.refresh(0);
                }
                Key::End => {
                    line.end();
                    self.refresh(0);
                }
                Key::Insert => {}
            }
        }
    }

    /// Submit the current line and start a fresh one.
    fn submit(&mut self) -> Flow {
        self.write_bytes(b"\n");
        let text = self
            .line
            .as_mut()
            .map(|line| {
                let text = line.as_str().to_string();
                line.reset();
                text
            })
            .unwrap_or_default();

        let flow = self.dispatch_line(&text, true);
        if flow == Flow::Continue {
            self.history.set_current(self.history.size());
            self.last_width = 0;
            self.refresh(0);
        }
        flow
    }

    fn browse_history<F>(&mut self, step: F) -> Result<()>
    where
        F: FnOnce(&mut crate::history::History, &mut LineBuffer) -> Result<bool>,
    {
        let line = self.line.get_or_insert_with(LineBuffer::new);
        if step(&mut self.history, line)? {
            self.refresh(0);
        }
        Ok(())
    }

    /// Incremental reverse search through history (Ctrl-R).
    fn reverse_search(&mut self) -> Result<SearchEnd> {
        let original = self.line.clone().unwrap_or_default();
        let origin = self.history.current();
        let mut pattern = String::new();
        let mut found: Option<(usize, usize)> = None;
        let mut failed = false;

        loop {
            let prompt = if failed {
                format!("(failed reverse-i-search)`{pattern}': ")
            } else {
                format!("(reverse-i-search)`{pattern}': ")
            };
            self.refresh_with(Some(&prompt), 0);

            let key = self.keys.read_key(&mut *self.console);
            let research_from = match key {
                Key::Char(ch) => {
                    pattern.push(ch);
                    Some((found.map_or(origin, |(index, _)| index), None))
                }
                Key::Backspace => {
                    pattern.pop();
                    Some((origin, None))
                }
                Key::ReverseSearch => match found {
                    Some((index, _)) => {
                        let current = self.history.get(index).map(str::to_string);
                        Some((index, current))
                    }
                    None => None,
                },
                Key::Interrupt => {
                    self.line = Some(original);
                    self.history.set_current(origin);
                    self.refresh(0);
                    return Ok(SearchEnd::Done);
                }
                Key::Eof => return Ok(SearchEnd::Key(Key::Eof)),
                Key::Enter | Key::Tab => {
                    self.accept_search(found, origin, &original)?;
                    return Ok(SearchEnd::Done);
                }
                other => {
                    self.accept_search(found, origin, &original)?;
                    return Ok(SearchEnd::Key(other));
                }
            };

            let Some((from, skip)) = research_from else {
                continue;
            };
            if pattern.is_empty() {
                found = None;
                failed = false;
                self.line = Some(original.clone());
                continue;
            }

            match self.history.find_back(&pattern, from, skip.as_deref()) {
                Some((index, end)) => {
                    found = Some((index, end));
                    failed = false;
                    let text = self.history.get(index).unwrap_or_default();
                    let line = self.line.get_or_insert_with(LineBuffer::new);
                    line.replace(text)?;
                    line.set_position(end);
                }
                None => failed = true,
            }
        }
    }

    /// Leave the search on the matched entry, keeping the line that was
    /// being edited before the search in the history overlay.
    fn accept_search(
        &mut self,
        found: Option<(usize, usize)>,
        origin: usize,
        original: &LineBuffer,
    ) -> Result<()> {
        if let Some((index, _)) = found
            && index != origin
        {
            self.history.save_edit(origin, original.as_str())?;
            self.history.set_current(index);
        }
        self.refresh(0);
        Ok(())
    }
}
