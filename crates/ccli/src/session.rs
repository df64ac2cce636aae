//! The session handle.
//!
//! A [`Session`] owns the console and everything registered on it. Commands
//! receive `&mut Session` so they can print (it implements
//! [`std::fmt::Write`]), look at history, adjust the line being edited, or
//! run further lines with [`Session::execute`].

use crate::alias::Aliases;
use crate::command::{
    CommandFn, Commands, CompletionFn, CompletionRequest, Flow, InterruptFn, Invocation,
};
use crate::complete::Candidates;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::history::History;
use crate::input::{Key, KeyReader};
use crate::line::LineBuffer;
use crate::render;
use crate::term::Console;
use crate::words::{split_command, split_words};
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

pub struct Session {
    pub(crate) console: Box<dyn Console>,
    pub(crate) config: Config,
    pub(crate) prompt: String,
    pub(crate) commands: Commands,
    pub(crate) aliases: Aliases,
    pub(crate) history: History,
    pub(crate) keys: KeyReader,
    /// The line being edited. Present while [`Session::run`] or
    /// [`Session::execute`] is active.
    pub(crate) line: Option<LineBuffer>,
    /// Display width of the last refresh, to blank out leftovers.
    pub(crate) last_width: usize,
    pub(crate) unknown: CommandFn,
    pub(crate) empty: CommandFn,
    pub(crate) interrupt: InterruptFn,
    pub(crate) default_completion: Option<CompletionFn>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("prompt", &self.prompt)
            .field("config", &self.config)
            .field("commands", &self.commands)
            .field("aliases", &self.aliases)
            .field("history", &self.history.len())
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

fn exit_default(session: &mut Session, _: &Invocation<'_>) -> Flow {
    session.write_bytes(b"Exiting\n");
    Flow::Exit
}

fn unknown_default(session: &mut Session, inv: &Invocation<'_>) -> Flow {
    let _ = writeln!(session, "Command not found: {}", inv.name());
    Flow::Continue
}

fn empty_default(_: &mut Session, _: &Invocation<'_>) -> Flow {
    Flow::Continue
}

fn interrupt_default(session: &mut Session, _line: &str, _pos: usize) -> Flow {
    session.write_bytes(b"^C\n");
    Flow::Exit
}

impl Session {
    /// Create a session on `console` with the default configuration.
    pub fn new(console: impl Console + 'static, prompt: &str) -> Result<Self> {
        Self::with_config(console, prompt, Config::default())
    }

    /// Create a session on `console`.
    ///
    /// The console is put into raw mode. It is handed back to its original
    /// mode when the session is dropped.
    pub fn with_config(
        console: impl Console + 'static,
        prompt: &str,
        config: Config,
    ) -> Result<Self> {
        if config.history_max == 0 {
            return Err(CliError::InvalidInput("history_max must be at least 1".into()));
        }
        if config.page_scroll == 0 {
            return Err(CliError::InvalidInput("page_scroll must be at least 1".into()));
        }
        if config.command_delimiter.as_deref() == Some("") {
            return Err(CliError::InvalidInput("empty command delimiter".into()));
        }

        let mut console: Box<dyn Console> = Box::new(console);
        console.acquire()?;

        let mut commands = Commands::default();
        commands.insert("exit", Rc::new(exit_default))?;

        tracing::debug!(prompt, history_max = config.history_max, "session created");

        Ok(Self {
            console,
            history: History::new(config.history_max),
            config,
            prompt: prompt.to_string(),
            commands,
            aliases: Aliases::default(),
            keys: KeyReader::new(),
            line: None,
            last_width: 0,
            unknown: Rc::new(unknown_default),
            empty: Rc::new(empty_default),
            interrupt: Rc::new(interrupt_default),
            default_completion: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Change the prompt. Takes effect on the next redraw.
    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    /// Register `callback` as the command `name`, replacing any command of
    /// that name.
    pub fn register_command<F>(&mut self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(&mut Session, &Invocation<'_>) -> Flow + 'static,
    {
        self.commands.insert(name, Rc::new(callback))
    }

    pub fn unregister_command(&mut self, name: &str) -> Result<()> {
        self.commands.remove(name)
    }

    /// Attach a completion callback to the registered command `name`.
    pub fn register_completion<F>(&mut self, name: &str, completion: F) -> Result<()>
    where
        F: Fn(&Session, &CompletionRequest<'_>, &mut Candidates) -> Result<()> + 'static,
    {
        self.commands.set_completion(name, Rc::new(completion))
    }

    /// Completion used for the first word and for commands without their
    /// own completion. [`CompletionRequest::command`] is `None`.
    pub fn register_default_completion<F>(&mut self, completion: F)
    where
        F: Fn(&Session, &CompletionRequest<'_>, &mut Candidates) -> Result<()> + 'static,
    {
        self.default_completion = Some(Rc::new(completion));
    }

    /// Called when the first word is not a registered command.
    pub fn register_unknown<F>(&mut self, callback: F)
    where
        F: Fn(&mut Session, &Invocation<'_>) -> Flow + 'static,
    {
        self.unknown = Rc::new(callback);
    }

    /// Called when Enter is pressed on a line with no words.
    pub fn register_empty<F>(&mut self, callback: F)
    where
        F: Fn(&mut Session, &Invocation<'_>) -> Flow + 'static,
    {
        self.empty = Rc::new(callback);
    }

    /// Called on Ctrl-C with the line and cursor position at that moment.
    pub fn register_interrupt<F>(&mut self, callback: F)
    where
        F: Fn(&mut Session, &str, usize) -> Flow + 'static,
    {
        self.interrupt = Rc::new(callback);
    }

    /// Split submitted lines into several commands at `delimiter`, or stop
    /// splitting with `None`.
    pub fn register_command_delimiter(&mut self, delimiter: Option<&str>) -> Result<()> {
        if delimiter == Some("") {
            return Err(CliError::InvalidInput("empty command delimiter".into()));
        }
        self.config.command_delimiter = delimiter.map(str::to_string);
        Ok(())
    }

    pub fn register_alias(&mut self, name: &str, replacement: &str) -> Result<()> {
        self.aliases.insert(name, replacement)
    }

    pub fn unregister_alias(&mut self, name: &str) -> Result<()> {
        self.aliases.remove(name)
    }

    pub fn aliases(&self) -> &Aliases {
        &self.aliases
    }

    /// Names of the registered commands, sorted.
    pub fn command_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.names()
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    /// A line from history: 1 is the most recently entered.
    pub fn history(&self, age: usize) -> Option<&str> {
        self.history.by_age(age)
    }

    /// Number of lines retained in history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Retained history, oldest first.
    pub fn history_iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.history.iter()
    }

    pub fn history_clear(&mut self) {
        self.history.clear();
    }

    /// Add a line to history without running it.
    pub fn history_add(&mut self, line: &str) -> Result<()> {
        self.history.append(line)
    }

    /// Content of the line being edited ("" outside the loop).
    pub fn line(&self) -> &str {
        self.line.as_ref().map_or("", LineBuffer::as_str)
    }

    /// Cursor position in the line being edited.
    pub fn line_position(&self) -> usize {
        self.line.as_ref().map_or(0, LineBuffer::position)
    }

    /// Empty the line being edited. The display is left alone until the
    /// next refresh.
    pub fn line_clear(&mut self) {
        if let Some(line) = self.line.as_mut() {
            line.reset();
        }
    }

    /// Insert `text` into the line being edited, at `pos` (clamped to the
    /// line) or at the cursor when `pos` is `None`.
    pub fn line_inject(&mut self, text: &str, pos: Option<usize>) -> Result<()> {
        let Some(line) = self.line.as_mut() else {
            return Err(CliError::InvalidInput("no line is being edited".into()));
        };
        if let Some(pos) = pos {
            line.set_position(pos);
        }
        line.insert_str(text)
    }

    /// Redraw the prompt and line.
    pub fn line_refresh(&mut self) {
        self.refresh(0);
    }

    /// Read one key from the console, for commands that prompt the user.
    pub fn read_key(&mut self) -> Key {
        self.keys.read_key(&mut *self.console)
    }

    /// Give the terminal back its original mode, e.g. before running a
    /// foreground child process.
    pub fn release_console(&mut self) -> Result<()> {
        self.console.release()?;
        Ok(())
    }

    /// Take the terminal again after [`Session::release_console`].
    pub fn acquire_console(&mut self) -> Result<()> {
        self.console.acquire()?;
        Ok(())
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        if let Err(e) = self.console.write_all(bytes) {
            tracing::debug!("console write failed: {e}");
        }
    }

    pub(crate) fn refresh(&mut self, pad: usize) {
        self.refresh_with(None, pad);
    }

    /// Redraw the line after `prompt`, or after the session prompt (the
    /// continuation prompt on a continued line).
    pub(crate) fn refresh_with(&mut self, prompt: Option<&str>, pad: usize) {
        let Some(line) = self.line.as_ref() else {
            return;
        };
        let prompt = match prompt {
            Some(prompt) => prompt,
            None if line.start() > 0 => self.config.continuation_prompt.as_str(),
            None => self.prompt.as_str(),
        };

        let width = render::width(prompt, line);
        let shrink = self.last_width.saturating_sub(width);
        let frame = render::refresh(prompt, line, pad + shrink);
        self.last_width = width;
        self.write_bytes(frame.as_bytes());
    }

    /// Run a submitted line: expand aliases, split it into commands at the
    /// delimiter, and dispatch them in order until one asks to exit.
    pub(crate) fn dispatch_line(&mut self, text: &str, add_to_history: bool) -> Flow {
        let delimiter = self.config.command_delimiter.clone();
        let mut rest = text;

        let flow = loop {
            let (segment, next) = match delimiter.as_deref() {
                Some(delim) => match split_command(rest, Some(delim)) {
                    Ok(split) => match split.rest {
                        Some(after) => {
                            let end = rest.len() - after.len() - delim.len();
                            (&rest[..end], Some(after))
                        }
                        None => (rest, None),
                    },
                    Err(e) => return self.parse_failed(&e),
                },
                None => (rest, None),
            };

            let expanded = self.aliases.expand(segment);
            let words = match split_words(&expanded) {
                Ok(words) => words,
                Err(e) => return self.parse_failed(&e),
            };

            let flow = self.dispatch_words(&expanded, &words);
            match next {
                Some(after) if flow == Flow::Continue => rest = after,
                _ => break flow,
            }
        };

        if add_to_history
            && !text.trim().is_empty()
            && let Err(e) = self.history.append(text)
        {
            tracing::debug!("could not add to history: {e}");
        }
        flow
    }

    fn parse_failed(&mut self, err: &CliError) -> Flow {
        tracing::debug!("could not split line: {err}");
        self.write_bytes(b"Error parsing command\n");
        Flow::Continue
    }

    fn dispatch_words(&mut self, line: &str, words: &[String]) -> Flow {
        let callback = match words.first() {
            None => Rc::clone(&self.empty),
            Some(name) => self
                .commands
                .get(name)
                .map(|c| Rc::clone(&c.callback))
                .unwrap_or_else(|| Rc::clone(&self.unknown)),
        };

        tracing::trace!(
            command = words.first().map_or("", String::as_str),
            args = words.len(),
            "dispatch"
        );
        callback(self, &Invocation::new(line, words))
    }
}

impl fmt::Write for Session {
    /// Output goes straight to the console. Write failures are logged and
    /// otherwise ignored so a closed terminal never aborts a command.
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.console.release() {
            tracing::warn!("could not restore terminal mode: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ScriptedConsole;
    use std::cell::RefCell;

    fn session() -> (Session, crate::term::Transcript) {
        let console = ScriptedConsole::new("");
        let transcript = console.transcript();
        (Session::new(console, "test> ").unwrap(), transcript)
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = [
            Config::new().with_history_max(0),
            Config::new().with_page_scroll(0),
            Config::new().with_command_delimiter(""),
        ];
        for config in bad {
            assert!(matches!(
                Session::with_config(ScriptedConsole::new(""), "> ", config),
                Err(CliError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_defaults_registered() {
        let (mut s, out) = session();
        assert!(s.has_command("exit"));

        assert_eq!(s.dispatch_line("exit", false), Flow::Exit);
        assert_eq!(out.text(), "Exiting\n");

        out.clear();
        assert_eq!(s.dispatch_line("frobnicate now", false), Flow::Continue);
        assert_eq!(out.text(), "Command not found: frobnicate\n");

        out.clear();
        assert_eq!(s.dispatch_line("   ", false), Flow::Continue);
        assert_eq!(out.text(), "");
    }

    #[test]
    fn test_dispatch_passes_words() {
        let (mut s, _) = session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        s.register_command("run", move |_, inv| {
            sink.borrow_mut().push((inv.line.to_string(), inv.args.to_vec()));
            Flow::Continue
        })
        .unwrap();

        s.dispatch_line("run 'a b' c", false);
        assert_eq!(
            *seen.borrow(),
            [(
                "run 'a b' c".to_string(),
                vec!["run".to_string(), "a b".to_string(), "c".to_string()]
            )]
        );
    }

    #[test]
    fn test_history_skips_empty_lines() {
        let (mut s, _) = session();
        s.dispatch_line("", true);
        s.dispatch_line("  ", true);
        assert_eq!(s.history_len(), 0);
        s.dispatch_line("nope", true);
        assert_eq!(s.history(1), Some("nope"));
        s.dispatch_line("again", false);
        assert_eq!(s.history(1), Some("nope"));
    }

    #[test]
    fn test_line_helpers_outside_loop() {
        let (mut s, _) = session();
        assert_eq!(s.line(), "");
        assert!(matches!(
            s.line_inject("x", None),
            Err(CliError::InvalidInput(_))
        ));
        s.line_clear();
        s.line_refresh();
    }

    #[test]
    fn test_delimiter_registration() {
        let (mut s, _) = session();
        assert!(s.register_command_delimiter(Some("")).is_err());
        s.register_command_delimiter(Some(";")).unwrap();
        assert_eq!(s.config().command_delimiter.as_deref(), Some(";"));
        s.register_command_delimiter(None).unwrap();
        assert_eq!(s.config().command_delimiter, None);
    }

    #[test]
    fn test_console_release_and_acquire() {
        let (mut s, _) = session();
        s.release_console().unwrap();
        s.release_console().unwrap();
        s.acquire_console().unwrap();
    }
}
