//! Tab completion.
//!
//! On Tab the text up to the cursor is split into words and the word under
//! the cursor is completed. Past the first word the command's own
//! completion callback supplies candidates; the first word, or any word of a
//! command without one, goes to the default completion. The first word is
//! also matched against command and alias names.
//!
//! A unique match is inserted in full followed by the candidate list's
//! delimiter. Several matches are extended to their longest common prefix
//! and, on the second Tab in a row, listed in columns below the line.

use crate::command::CompletionRequest;
use crate::error::Result;
use crate::input::Key;
use crate::line::LineBuffer;
use crate::session::Session;
use crate::words::{split_command, split_words};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Candidates collected for one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    items: Vec<String>,
    delimiter: Option<char>,
    display_offset: usize,
}

impl Default for Candidates {
    fn default() -> Self {
        Self::new()
    }
}

impl Candidates {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            delimiter: Some(' '),
            display_offset: 0,
        }
    }

    pub fn push(&mut self, candidate: impl AsRef<str>) -> Result<()> {
        let candidate = candidate.as_ref();
        let mut owned = String::new();
        owned.try_reserve_exact(candidate.len())?;
        owned.push_str(candidate);
        self.items.try_reserve(1)?;
        self.items.push(owned);
        Ok(())
    }

    pub fn extend<I>(&mut self, candidates: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for candidate in candidates {
            self.push(candidate)?;
        }
        Ok(())
    }

    /// Character appended after a unique match. `None` appends nothing,
    /// which suits completing a directory prefix like `src/`.
    pub fn set_delimiter(&mut self, delimiter: Option<char>) {
        self.delimiter = delimiter;
    }

    pub fn delimiter(&self) -> Option<char> {
        self.delimiter
    }

    /// Hide the first `offset` characters of each candidate when listing.
    pub fn set_display_offset(&mut self, offset: usize) {
        self.display_offset = offset;
    }

    pub fn display_offset(&self) -> usize {
        self.display_offset
    }

    /// Add the directory entries completing the path `current`.
    ///
    /// Candidates keep the directory part of `current`, which is hidden
    /// when listing. Directories end in `/`, and when one is the only
    /// entry found no delimiter follows it so the path can go on. An
    /// unreadable directory adds nothing.
    pub fn files(&mut self, current: &str) -> Result<()> {
        self.files_with_extensions(current, &[])
    }

    /// Like [`Candidates::files`], but other files must end in one of
    /// `extensions`. Directories always match.
    pub fn files_with_extensions(&mut self, current: &str, extensions: &[&str]) -> Result<()> {
        let (dir, prefix) = match current.rfind('/') {
            Some(i) => current.split_at(i + 1),
            None => ("", current),
        };
        let path = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %path.display(), "no file completion: {e}");
                return Ok(());
            }
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }
            // Follows symlinks; dangling ones are skipped
            let Ok(meta) = fs::metadata(entry.path()) else {
                continue;
            };
            if meta.is_dir() {
                found.try_reserve(1)?;
                found.push(format!("{dir}{name}/"));
            } else if extensions.is_empty() || extensions.iter().any(|ext| name.ends_with(ext)) {
                found.try_reserve(1)?;
                found.push(format!("{dir}{name}"));
            }
        }

        if let [only] = found.as_slice()
            && only.ends_with('/')
        {
            self.set_delimiter(None);
        }
        self.set_display_offset(dir.chars().count());
        self.extend(found)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(String::as_str)
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.items.iter().any(|c| c == candidate)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sort_unique(&mut self) {
        self.items.sort_unstable();
        self.items.dedup();
    }
}

/// Longest prefix shared by all of `words`, on a character boundary.
fn common_prefix<'a>(words: &[&'a str]) -> &'a str {
    let Some((first, rest)) = words.split_first() else {
        return "";
    };
    let mut len = first.len();
    for word in rest {
        len = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    &first[..len]
}

/// `candidate` with its first `offset` characters hidden.
fn shown(candidate: &str, offset: usize) -> &str {
    candidate
        .char_indices()
        .nth(offset)
        .map_or("", |(i, _)| &candidate[i..])
}

enum PageAnswer {
    Next,
    Continuous,
    Quit,
}

impl Session {
    /// Complete the word under the cursor. `tab` counts the Tabs pressed
    /// immediately before this one.
    pub(crate) fn complete(&mut self, tab: usize) -> Result<()> {
        let Some(line) = self.line.as_ref() else {
            return Ok(());
        };
        let snapshot = line.copy_to(line.position())?;
        let text = self.last_segment(snapshot.as_str())?;
        let words = split_words(text)?;

        let after_space = text.chars().last().is_some_and(char::is_whitespace);
        let (word, current) = match words.last() {
            Some(last) if !after_space => (words.len() - 1, last.as_str()),
            _ => (words.len(), ""),
        };

        let mut candidates = Candidates::new();
        let command_completion = match words.first() {
            Some(name) if word > 0 => self
                .commands
                .get(name)
                .and_then(|c| c.completion.clone())
                .map(|f| (name.as_str(), f)),
            _ => None,
        };

        match command_completion {
            Some((name, completion)) => {
                let req = CompletionRequest {
                    command: Some(name),
                    line: text,
                    words: &words,
                    word,
                    current,
                };
                completion(&*self, &req, &mut candidates)?;
            }
            None => {
                if let Some(completion) = self.default_completion.clone() {
                    let req = CompletionRequest {
                        command: None,
                        line: text,
                        words: &words,
                        word,
                        current,
                    };
                    completion(&*self, &req, &mut candidates)?;
                }
            }
        }

        if word == 0 {
            candidates.extend(self.commands.names())?;
            candidates.extend(self.aliases.names())?;
        }

        candidates.sort_unique();
        let matches: Vec<&str> = candidates
            .iter()
            .filter(|c| c.starts_with(current))
            .collect();

        tracing::trace!(word, current, matches = matches.len(), "completion");

        let line = self.line.get_or_insert_with(LineBuffer::new);
        match matches.as_slice() {
            [] => return Ok(()),
            [only] => {
                line.insert_str(&only[current.len()..])?;
                if let Some(delimiter) = candidates.delimiter() {
                    line.insert(delimiter)?;
                }
            }
            several => {
                let prefix = common_prefix(several);
                if prefix.len() > current.len() {
                    line.insert_str(&prefix[current.len()..])?;
                }
            }
        }

        if tab > 0 && matches.len() > 1 {
            let offset = candidates.display_offset().min(current.chars().count());
            self.write_bytes(b"\n");
            self.list_candidates(&matches, offset);
        }
        self.refresh(0);
        Ok(())
    }

    /// The text after the last command delimiter, if one is registered.
    fn last_segment<'a>(&self, text: &'a str) -> Result<&'a str> {
        let Some(delimiter) = self.config.command_delimiter.as_deref() else {
            return Ok(text);
        };
        let mut segment = text;
        while let Some(rest) = split_command(segment, Some(delimiter))?.rest {
            segment = rest;
        }
        Ok(segment)
    }

    /// Print `matches` below the line: in columns sized to the terminal,
    /// or one per line when the console has no window size.
    fn list_candidates(&mut self, matches: &[&str], offset: usize) {
        let Some(size) = self.console.window_size() else {
            for candidate in matches {
                let _ = writeln!(self, "{}", shown(candidate, offset));
            }
            return;
        };

        let width = matches
            .iter()
            .map(|c| shown(c, offset).chars().count())
            .max()
            .unwrap_or(0);
        let cols = (usize::from(size.cols) / (width + 2)).max(1);
        let rows = matches.len().div_ceil(cols);
        let page = usize::from(size.rows).saturating_sub(1).max(1);
        let mut continuous = false;

        for row in 0..rows {
            if self.keys.poll_interrupt(&mut *self.console) {
                tracing::debug!("listing interrupted");
                break;
            }

            if !continuous && row > 0 && row % page == 0 {
                match self.page_stop() {
                    PageAnswer::Next => {}
                    PageAnswer::Continuous => continuous = true,
                    PageAnswer::Quit => break,
                }
            }

            let mut out = String::new();
            for col in 0..cols {
                let Some(candidate) = matches.get(col * rows + row) else {
                    continue;
                };
                if col > 0 {
                    out.push_str("  ");
                }
                let text = shown(candidate, offset);
                let _ = write!(out, "{text:<width$}");
            }
            let _ = writeln!(self, "{}", out.trim_end());
        }
    }

    /// Wait at the bottom of a full page: `q` quits, `c` lists the rest
    /// without stopping, anything else shows one more page.
    fn page_stop(&mut self) -> PageAnswer {
        const PROMPT: &str = "--More--";

        self.write_bytes(PROMPT.as_bytes());
        let key = self.keys.read_key(&mut *self.console);
        let mut erase = String::from("\r");
        erase.push_str(&" ".repeat(PROMPT.len()));
        erase.push('\r');
        self.write_bytes(erase.as_bytes());

        match key {
            Key::Char('q') | Key::Interrupt | Key::Eof => PageAnswer::Quit,
            Key::Char('c') => PageAnswer::Continuous,
            _ => PageAnswer::Next,
        }
    }
}
