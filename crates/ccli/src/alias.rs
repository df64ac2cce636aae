//! Aliases.
//!
//! An alias replaces the first word of a submitted command with a
//! replacement text before the line is split. The rest of the command is
//! kept verbatim, so quoting after the alias behaves as typed. The
//! replacement is not itself checked for aliases, which lets an alias
//! share its name with the command it wraps (`ls` -> `ls -l`).

use crate::command::validate_name;
use crate::error::{CliError, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases {
    map: BTreeMap<String, String>,
}

impl Aliases {
    /// Add or replace an alias.
    pub fn insert(&mut self, name: &str, replacement: &str) -> Result<()> {
        validate_name(name)?;
        self.map.insert(name.to_string(), replacement.to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.map
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CliError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Aliases sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Replace the first word of `command` if it names an alias.
    ///
    /// The first word is the leading run of non-whitespace; an alias only
    /// matches it exactly, so `ll` does not match `"ll2"` or `"'ll'"`.
    pub fn expand<'a>(&self, command: &'a str) -> Cow<'a, str> {
        let body = command.trim_start();
        let end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (first, rest) = body.split_at(end);

        match self.map.get(first) {
            Some(replacement) => {
                tracing::trace!(alias = first, "expanding alias");
                Cow::Owned(format!("{replacement}{rest}"))
            }
            None => Cow::Borrowed(command),
        }
    }
}

/// Parse one `name=value` line of the alias cache.
pub(crate) fn parse_entry(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once('=')?;
    if validate_name(name).is_err() {
        return None;
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases(pairs: &[(&str, &str)]) -> Aliases {
        let mut a = Aliases::default();
        for (name, value) in pairs {
            a.insert(name, value).unwrap();
        }
        a
    }

    #[test]
    fn test_expand_first_word_only() {
        let a = aliases(&[("ll", "ls -l"), ("g", "git")]);
        assert_eq!(a.expand("ll /tmp"), "ls -l /tmp");
        assert_eq!(a.expand("  g status"), "git status");
        assert_eq!(a.expand("echo ll"), "echo ll");
        assert_eq!(a.expand("ll2"), "ll2");
        assert_eq!(a.expand("ll"), "ls -l");
        assert!(matches!(a.expand("echo ll"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_expansion_is_not_recursive() {
        let a = aliases(&[("ls", "ls -l"), ("a", "b"), ("b", "a")]);
        assert_eq!(a.expand("ls"), "ls -l");
        assert_eq!(a.expand("a x"), "b x");
    }

    #[test]
    fn test_rest_keeps_quoting() {
        let a = aliases(&[("say", "echo")]);
        assert_eq!(a.expand("say 'two  words'"), "echo 'two  words'");
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut a = aliases(&[("x", "one")]);
        a.insert("x", "two").unwrap();
        assert_eq!(a.get("x"), Some("two"));
        assert_eq!(a.len(), 1);
        assert!(matches!(a.insert("bad name", "v"), Err(CliError::InvalidInput(_))));
        a.remove("x").unwrap();
        assert!(matches!(a.remove("x"), Err(CliError::NotFound(_))));
        assert!(a.is_empty());
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("ll=ls -l"), Some(("ll", "ls -l")));
        assert_eq!(parse_entry("eq=a=b"), Some(("eq", "a=b")));
        assert_eq!(parse_entry("no equals"), None);
        assert_eq!(parse_entry("=value"), None);
    }
}
