//! Saving history and aliases between runs.
//!
//! Cache files hold any number of tagged sections, so several programs (or
//! several modes of one program) can share a file:
//!
//! ```text
//! ####---ccli---#### <tag> <count>
//! <count lines>
//! %%%%---ccli---%%%% <tag>
//! ```
//!
//! Saving a tag rewrites the file with that tag's old section removed and
//! the new one appended; everything else is kept byte for byte. The new
//! contents go to a temporary file in the same directory which is then
//! renamed over the original.

use crate::alias;
use crate::error::{CliError, Result};
use crate::session::Session;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const START_MARKER: &str = "####---ccli---####";
pub const END_MARKER: &str = "%%%%---ccli---%%%%";

/// File name of the default history cache.
pub const HISTORY_FILE: &str = "ccli";
/// File name of the default alias cache.
pub const ALIAS_FILE: &str = "ccli-alias";

/// Cache directory: `$XDG_CACHE_HOME`, else `<home>/.cache`.
pub fn cache_dir_from(xdg_cache_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    match xdg_cache_home {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => home.map(|home| home.join(".cache")),
    }
}

/// The cache directory of the current user.
pub fn cache_dir() -> Result<PathBuf> {
    cache_dir_from(std::env::var_os("XDG_CACHE_HOME"), home::home_dir()).ok_or(CliError::NoCacheDir)
}

pub fn default_history_file() -> Result<PathBuf> {
    Ok(cache_dir()?.join(HISTORY_FILE))
}

pub fn default_alias_file() -> Result<PathBuf> {
    Ok(cache_dir()?.join(ALIAS_FILE))
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return Err(CliError::InvalidInput(format!("bad cache tag {tag:?}")));
    }
    Ok(())
}

/// Split a section header into its tag and count text.
fn parse_header(line: &str) -> Option<(&str, &str)> {
    let rest = line
        .trim_end_matches(['\n', '\r'])
        .strip_prefix(START_MARKER)?
        .strip_prefix(' ')?;
    rest.rsplit_once(' ')
}

fn parse_count(tag: &str, count: &str) -> Result<usize> {
    count
        .trim()
        .parse()
        .map_err(|_| CliError::CorruptCache(format!("section {tag}: bad line count {count:?}")))
}

fn end_line(tag: &str) -> String {
    format!("{END_MARKER} {tag}")
}

/// Read the lines of the first section tagged `tag`.
///
/// Returns `None` when there is no such section. A section cut short by
/// the end of the input yields the lines that are present.
pub fn read_section(reader: impl BufRead, tag: &str) -> Result<Option<Vec<String>>> {
    validate_tag(tag)?;
    let mut lines = reader.lines();

    let count = loop {
        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line?;
        if let Some((found, count)) = parse_header(&line)
            && found == tag
        {
            break parse_count(tag, count)?;
        }
    };

    let mut section = Vec::new();
    for line in lines.take(count) {
        section.try_reserve(1)?;
        section.push(line?);
    }
    if section.len() < count {
        tracing::warn!(tag, expected = count, found = section.len(), "truncated cache section");
    }
    Ok(Some(section))
}

/// Write a section for `tag`. Nothing is written for an empty list.
pub fn write_section<W, I, S>(mut writer: W, tag: &str, lines: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    validate_tag(tag)?;
    let lines: Vec<S> = lines.into_iter().collect();
    if lines.is_empty() {
        return Ok(0);
    }
    if lines.iter().any(|l| l.as_ref().contains('\n')) {
        return Err(CliError::InvalidInput("cache line contains a newline".into()));
    }

    writeln!(writer, "{START_MARKER} {tag} {}", lines.len())?;
    for line in &lines {
        writeln!(writer, "{}", line.as_ref())?;
    }
    writeln!(writer, "{}", end_line(tag))?;
    Ok(lines.len())
}

/// `text` with the first section tagged `tag` cut out.
fn remove_section(text: &str, tag: &str) -> Result<String> {
    let mut kept = String::with_capacity(text.len());
    let mut lines = text.split_inclusive('\n');
    let mut removed = false;

    while let Some(line) = lines.next() {
        if !removed
            && let Some((found, count)) = parse_header(line)
            && found == tag
        {
            let count = parse_count(tag, count)?;
            for _ in 0..count {
                if lines.next().is_none() {
                    break;
                }
            }
            // Drop the end marker too, but only if it is really there
            let mut rest = lines.clone();
            if rest
                .next()
                .is_some_and(|l| l.trim_end_matches(['\n', '\r']) == end_line(tag))
            {
                lines = rest;
            }
            removed = true;
            continue;
        }
        kept.push_str(line);
    }
    Ok(kept)
}

/// Replace the section tagged `tag` in the file at `path` with `lines`,
/// creating the file (and its directory) if needed. An empty `lines`
/// removes the section.
pub fn save_section_file<I, S>(path: &Path, tag: &str, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    validate_tag(tag)?;
    let existing = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let mut text = remove_section(&existing, tag)?;
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    let written = write_section(&mut file, tag, lines)?;
    file.flush()?;
    file.persist(path).map_err(|e| CliError::Io(e.error))?;

    tracing::debug!(path = %path.display(), tag, lines = written, "cache saved");
    Ok(written)
}

/// Lines of the section tagged `tag` in the file at `path`. A missing file
/// reads as no section.
pub fn load_section_file(path: &Path, tag: &str) -> Result<Option<Vec<String>>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    read_section(BufReader::new(file), tag)
}

/// Drop entries a cache file cannot hold on one line.
fn single_lines<'a, I>(what: &str, entries: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    entries
        .into_iter()
        .filter(|entry| {
            let ok = !entry.contains(['\n', '\r']);
            if !ok {
                tracing::warn!(what, entry, "not saving multi-line entry");
            }
            ok
        })
        .collect()
}

impl Session {
    /// Append the history section tagged `tag` from `reader` to history.
    /// Returns the number of lines loaded.
    pub fn history_load_from(&mut self, reader: impl BufRead, tag: &str) -> Result<usize> {
        let Some(lines) = read_section(reader, tag)? else {
            return Ok(0);
        };
        self.history_extend(lines)
    }

    /// Write history as a section tagged `tag`.
    pub fn history_save_to(&self, writer: impl Write, tag: &str) -> Result<usize> {
        write_section(writer, tag, single_lines("history", self.history.iter()))
    }

    pub fn history_load_file(&mut self, tag: &str, path: &Path) -> Result<usize> {
        let Some(lines) = load_section_file(path, tag)? else {
            return Ok(0);
        };
        self.history_extend(lines)
    }

    pub fn history_save_file(&self, tag: &str, path: &Path) -> Result<usize> {
        save_section_file(path, tag, single_lines("history", self.history.iter()))
    }

    /// Load history from the default cache file.
    pub fn history_load(&mut self, tag: &str) -> Result<usize> {
        self.history_load_file(tag, &default_history_file()?)
    }

    /// Save history to the default cache file.
    pub fn history_save(&self, tag: &str) -> Result<usize> {
        self.history_save_file(tag, &default_history_file()?)
    }

    fn history_extend(&mut self, lines: Vec<String>) -> Result<usize> {
        let mut loaded = 0;
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            self.history.append(line)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Register the aliases of the section tagged `tag` from `reader`.
    pub fn alias_load_from(&mut self, reader: impl BufRead, tag: &str) -> Result<usize> {
        let Some(lines) = read_section(reader, tag)? else {
            return Ok(0);
        };
        self.alias_extend(&lines)
    }

    /// Write the aliases as `name=value` lines in a section tagged `tag`.
    pub fn alias_save_to(&self, writer: impl Write, tag: &str) -> Result<usize> {
        write_section(writer, tag, self.alias_lines())
    }

    pub fn alias_load_file(&mut self, tag: &str, path: &Path) -> Result<usize> {
        let Some(lines) = load_section_file(path, tag)? else {
            return Ok(0);
        };
        self.alias_extend(&lines)
    }

    pub fn alias_save_file(&self, tag: &str, path: &Path) -> Result<usize> {
        save_section_file(path, tag, self.alias_lines())
    }

    pub fn alias_load(&mut self, tag: &str) -> Result<usize> {
        self.alias_load_file(tag, &default_alias_file()?)
    }

    pub fn alias_save(&self, tag: &str) -> Result<usize> {
        self.alias_save_file(tag, &default_alias_file()?)
    }

    fn alias_lines(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .aliases
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        single_lines("alias", lines.iter().map(String::as_str))
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn alias_extend(&mut self, lines: &[String]) -> Result<usize> {
        let mut loaded = 0;
        for line in lines.iter().filter(|l| !l.is_empty()) {
            match alias::parse_entry(line) {
                Some((name, value)) => {
                    self.aliases.insert(name, value)?;
                    loaded += 1;
                }
                None => tracing::warn!(line = line.as_str(), "skipping bad alias line"),
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_prefers_xdg() {
        assert_eq!(
            cache_dir_from(Some("/xdg".into()), Some("/home/u".into())),
            Some(PathBuf::from("/xdg"))
        );
        assert_eq!(
            cache_dir_from(None, Some("/home/u".into())),
            Some(PathBuf::from("/home/u/.cache"))
        );
        assert_eq!(
            cache_dir_from(Some("".into()), Some("/home/u".into())),
            Some(PathBuf::from("/home/u/.cache"))
        );
        assert_eq!(cache_dir_from(None, None), None);
    }

    #[test]
    fn test_write_then_read_section() {
        let mut out = Vec::new();
        let n = write_section(&mut out, "demo", ["ls -l", "echo 'hi'"]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "####---ccli---#### demo 2\nls -l\necho 'hi'\n%%%%---ccli---%%%% demo\n"
        );

        let lines = read_section(out.as_slice(), "demo").unwrap().unwrap();
        assert_eq!(lines, ["ls -l", "echo 'hi'"]);
        assert_eq!(read_section(out.as_slice(), "other").unwrap(), None);
    }

    #[test]
    fn test_empty_section_writes_nothing() {
        let mut out = Vec::new();
        assert_eq!(write_section(&mut out, "t", Vec::<String>::new()).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_truncated_section_yields_present_lines() {
        let text = "####---ccli---#### t 3\none\ntwo\n";
        let lines = read_section(text.as_bytes(), "t").unwrap().unwrap();
        assert_eq!(lines, ["one", "two"]);
    }

    #[test]
    fn test_bad_count_is_corrupt() {
        let text = "####---ccli---#### t lots\none\n";
        assert!(matches!(
            read_section(text.as_bytes(), "t"),
            Err(CliError::CorruptCache(_))
        ));
    }

    #[test]
    fn test_tag_must_match_exactly() {
        let text = "####---ccli---#### tagged 1\nx\n%%%%---ccli---%%%% tagged\n";
        assert_eq!(read_section(text.as_bytes(), "tag").unwrap(), None);
    }

    #[test]
    fn test_bad_tags_rejected() {
        assert!(matches!(
            read_section("".as_bytes(), "two words"),
            Err(CliError::InvalidInput(_))
        ));
        assert!(matches!(
            write_section(Vec::new(), "", ["x"]),
            Err(CliError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_remove_section_keeps_the_rest() {
        let text = "header\n\
                    ####---ccli---#### a 1\nA\n%%%%---ccli---%%%% a\n\
                    ####---ccli---#### b 2\nB1\nB2\n%%%%---ccli---%%%% b\n\
                    trailer";
        let kept = remove_section(text, "b").unwrap();
        assert_eq!(
            kept,
            "header\n####---ccli---#### a 1\nA\n%%%%---ccli---%%%% a\ntrailer"
        );
        assert_eq!(remove_section(text, "zzz").unwrap(), text);
    }

    #[test]
    fn test_single_lines_skips_multi_line_entries() {
        assert_eq!(
            single_lines("history", ["ls", "a\nb", "c\r", "pwd"]),
            ["ls", "pwd"]
        );
    }

    #[test]
    fn test_newline_in_line_rejected() {
        assert!(matches!(
            write_section(Vec::new(), "t", ["a\nb"]),
            Err(CliError::InvalidInput(_))
        ));
    }
}
